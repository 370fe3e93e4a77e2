//! G-code Z Compensation
//!
//! Corrects systematic build-height errors in additive-manufacturing
//! toolpaths without changing extruded volume or horizontal geometry.
//!
//! This library provides:
//! - G-code parsing with position state carry
//! - Fixed-length move splitting that conserves extrusion
//! - Layer assembly and re-serialization
//! - Layerwise (step-quantized) and surface (per-vertex) compensation
//! - Lookup table, coefficient and machine profile loading

pub mod compensation;
pub mod config;
pub mod core;
pub mod error;
pub mod parser;
pub mod profile;
pub mod split;
pub mod table;

// Re-exports for the public API
pub use compensation::{
    CompensationMode, CompensationReport, Compensator, HeightErrorModel,
    StepQuantizedLayerCompensator, SurfaceCompensator,
};
pub use config::Config;
pub use crate::core::{Document, Layer, ParseOptions};
pub use error::{Error, Result};
pub use parser::{Command, Point, parse_line};
pub use profile::{MachineProfile, ProfileRegistry};
