//! Height Compensation
//!
//! Models predict the Z error at a point; compensators turn a model into a
//! pass over a `Document`.
//! - `layerwise`: lookup-table blocks, applied in whole stepper increments
//! - `surface`: fitted error surfaces, applied to every XY vertex

pub mod layerwise;
pub mod surface;

pub use layerwise::{Block, LayerwiseCompensator, StepQuantizedLayerCompensator, StepQuantizer};
pub use surface::{CubicModel, PlanarModel, RapidPolicy, SurfaceCompensator};

use serde::Serialize;

use crate::core::Document;
use crate::error::{Result, SettingError};

/// Predicts the build-height error at a nominal position
///
/// Positive values mean the layer must be pushed thicker/higher.
pub trait HeightErrorModel {
    fn evaluate(&self, x: f64, y: f64, z: f64) -> f64;
}

/// A single compensation pass over a whole document
pub trait Compensator {
    fn apply(&self, document: &mut Document) -> Result<CompensationReport>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompensationMode {
    Uniform,
    Surface,
}

/// Summary of one compensation pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompensationReport {
    pub mode: CompensationMode,
    pub layers: usize,
    /// Layers that received a correction
    pub compensated_layers: usize,
    /// Commands whose Z value was rewritten
    pub adjusted_commands: usize,
    /// Whole stepper increments applied (uniform mode)
    pub steps: i64,
    /// Cumulative Z shift at the top of the part (uniform mode)
    pub total_shift: f64,
    /// Error left below stepper resolution and discarded (uniform mode)
    pub residual: f64,
    /// Largest absolute vertex correction (surface mode)
    pub max_correction: f64,
}

impl CompensationReport {
    pub fn new(mode: CompensationMode, layers: usize) -> Self {
        Self {
            mode,
            layers,
            compensated_layers: 0,
            adjusted_commands: 0,
            steps: 0,
            total_shift: 0.0,
            residual: 0.0,
            max_correction: 0.0,
        }
    }
}

pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SettingError::NotPositive { name, value }.into())
    }
}
