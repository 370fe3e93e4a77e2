//! Uniform (layerwise) compensation
//!
//! A lookup table assigns a per-layer correction to bands of build height.
//! The Z axis can only move in whole stepper increments, so corrections are
//! accumulated like a first-order quantizer and paid off in whole steps:
//! rounding every layer on its own would lose the fractional part forever.

use crate::compensation::{
    CompensationMode, CompensationReport, Compensator, HeightErrorModel, ensure_positive,
};
use crate::core::{Document, Layer};
use crate::error::{Result, TableError};

/// Z increment of one full motor step on the reference machine (mm)
pub const DEFAULT_Z_RESOLUTION: f64 = 0.0105833;

/// Height band `(start_height, end_height]` with a constant per-layer offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub start_height: f64,
    pub end_height: f64,
    pub offset: f64,
}

impl Block {
    pub fn new(start_height: f64, end_height: f64, offset: f64) -> Self {
        Self {
            start_height,
            end_height,
            offset,
        }
    }

    /// Offset for a layer whose top surface is at `build_height`, or 0 when
    /// the height is outside this block
    pub fn get_offset(&self, build_height: f64) -> f64 {
        if build_height > self.start_height && build_height <= self.end_height {
            self.offset
        } else {
            0.0
        }
    }
}

/// Ordered blocks plus a tail block extending the last band to infinity
#[derive(Debug, Clone, PartialEq)]
pub struct LayerwiseCompensator {
    blocks: Vec<Block>,
}

impl LayerwiseCompensator {
    /// Build from table blocks; the tail block is generated here
    pub fn new(mut blocks: Vec<Block>) -> std::result::Result<Self, TableError> {
        // Past the fitted range keep the last band's bias instead of dropping to zero
        let last = blocks
            .iter()
            .max_by(|a, b| a.end_height.total_cmp(&b.end_height))
            .copied()
            .ok_or(TableError::Empty)?;
        blocks.push(Block::new(last.end_height, f64::INFINITY, last.offset));

        Ok(Self { blocks })
    }

    /// Build from three aligned columns: start heights, end heights, offsets
    pub fn from_columns(
        starts: &[f64],
        ends: &[f64],
        offsets: &[f64],
    ) -> std::result::Result<Self, TableError> {
        if starts.len() != ends.len() || ends.len() != offsets.len() {
            return Err(TableError::MisalignedColumns {
                starts: starts.len(),
                ends: ends.len(),
                offsets: offsets.len(),
            });
        }

        let blocks = starts
            .iter()
            .zip(ends)
            .zip(offsets)
            .map(|((&start, &end), &offset)| Block::new(start, end, offset))
            .collect();
        Self::new(blocks)
    }

    /// All blocks, the generated tail block last
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Sum of the offsets of every block containing `build_height`
    ///
    /// Overlapping blocks add up.
    pub fn get_total_offset(&self, build_height: f64) -> f64 {
        self.blocks
            .iter()
            .map(|block| block.get_offset(build_height))
            .sum()
    }
}

impl HeightErrorModel for LayerwiseCompensator {
    fn evaluate(&self, _x: f64, _y: f64, z: f64) -> f64 {
        self.get_total_offset(z)
    }
}

/// Accumulates corrections and releases them in whole steps
#[derive(Debug, Clone, PartialEq)]
pub struct StepQuantizer {
    resolution: f64,
    carried_remainder: f64,
}

impl StepQuantizer {
    pub fn new(resolution: f64) -> Result<Self> {
        Ok(Self {
            resolution: ensure_positive("Z resolution", resolution)?,
            carried_remainder: 0.0,
        })
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn carried_remainder(&self) -> f64 {
        self.carried_remainder
    }

    /// Add one layer's correction and return the whole steps to apply now
    ///
    /// The remainder stays strictly within one resolution of zero; for
    /// non-negative corrections it stays in `[0, resolution)`.
    pub fn push(&mut self, correction: f64) -> i64 {
        self.carried_remainder += correction;
        if self.carried_remainder.abs() < self.resolution {
            return 0;
        }

        let steps = (self.carried_remainder / self.resolution).trunc();
        self.carried_remainder -= steps * self.resolution;
        steps as i64
    }
}

/// Uniform-mode compensator: table lookup per layer, whole-step shifts
#[derive(Debug, Clone, PartialEq)]
pub struct StepQuantizedLayerCompensator {
    table: LayerwiseCompensator,
    resolution: f64,
}

impl StepQuantizedLayerCompensator {
    pub fn new(table: LayerwiseCompensator, resolution: f64) -> Result<Self> {
        Ok(Self {
            table,
            resolution: ensure_positive("Z resolution", resolution)?,
        })
    }

    pub fn table(&self) -> &LayerwiseCompensator {
        &self.table
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }
}

impl Compensator for StepQuantizedLayerCompensator {
    fn apply(&self, document: &mut Document) -> Result<CompensationReport> {
        // Heights are looked up at nominal values, before any shift lands
        let heights: Vec<Option<f64>> = document.layers.iter().map(Layer::z).collect();
        let mut quantizer = StepQuantizer::new(self.resolution)?;
        let mut report = CompensationReport::new(CompensationMode::Uniform, heights.len());
        let mut first_shifted = None;

        for (index, height) in heights.into_iter().enumerate() {
            let Some(height) = height else {
                log::debug!("layer {index} has no Z value, skipping");
                continue;
            };

            let steps = quantizer.push(self.table.get_total_offset(height));
            if steps == 0 {
                continue;
            }

            let shift = steps as f64 * self.resolution;
            document.shift(index, 'Z', shift);
            log::debug!("layer {index} at Z={height}: {steps} step(s), shift {shift:+.5}");

            first_shifted.get_or_insert(index);
            report.compensated_layers += 1;
            report.steps += steps;
            report.total_shift += shift;
        }

        report.residual = quantizer.carried_remainder();
        if let Some(first) = first_shifted {
            report.adjusted_commands = document.layers[first..]
                .iter()
                .flat_map(|layer| &layer.commands)
                .filter(|command| command.args.contains('Z'))
                .count();
        }

        log::info!(
            "uniform compensation: {} steps over {} layers, residual {:.6} mm discarded",
            report.steps,
            report.compensated_layers,
            report.residual
        );
        Ok(report)
    }
}
