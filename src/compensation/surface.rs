//! Continuous 3D compensation
//!
//! Every XY vertex of every layer above the first is lowered by the error a
//! fitted surface predicts at that point. The first layer is the bed
//! reference and is never touched.

use serde::Deserialize;

use crate::compensation::{CompensationMode, CompensationReport, Compensator, HeightErrorModel};
use crate::core::{Document, Layer};
use crate::error::{Result, TableError};

/// Number of coefficients of the cubic model
pub const CUBIC_TERMS: usize = 20;
/// Number of coefficients of the planar model
pub const PLANAR_TERMS: usize = 3;

/// Offset between the model's XY frame and machine coordinates on the
/// reference fixture (mm)
pub const DEFAULT_FIXTURE_OFFSET: (f64, f64) = (4.195, 28.195);

/// Full cubic polynomial in (x, y, z)
///
/// Coefficients are in the order
/// `1, x, y, z, x², xy, y², xz, yz, z², x³, x²y, xy², y³, x²z, xyz, y²z, xz², yz², z³`.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicModel {
    coefficients: [f64; CUBIC_TERMS],
    reference_plane_offset: f64,
}

impl CubicModel {
    pub fn new(coefficients: &[f64]) -> std::result::Result<Self, TableError> {
        let coefficients: [f64; CUBIC_TERMS] = coefficients
            .try_into()
            .map_err(|_| TableError::CoefficientCount {
                expected: CUBIC_TERMS,
                found: coefficients.len(),
            })?;

        Ok(Self {
            coefficients,
            reference_plane_offset: 0.0,
        })
    }

    /// Measure z from a calibration plane instead of the bed
    pub fn with_reference_plane_offset(mut self, offset: f64) -> Self {
        self.reference_plane_offset = offset;
        self
    }

    pub fn coefficients(&self) -> &[f64; CUBIC_TERMS] {
        &self.coefficients
    }
}

impl HeightErrorModel for CubicModel {
    fn evaluate(&self, x: f64, y: f64, z: f64) -> f64 {
        let z = z - self.reference_plane_offset;
        if z < 0.0 {
            return 0.0;
        }

        let terms = [
            1.0,
            x,
            y,
            z,
            x * x,
            x * y,
            y * y,
            x * z,
            y * z,
            z * z,
            x * x * x,
            x * x * y,
            x * y * y,
            y * y * y,
            x * x * z,
            x * y * z,
            y * y * z,
            x * z * z,
            y * z * z,
            z * z * z,
        ];
        self.coefficients
            .iter()
            .zip(terms)
            .map(|(c, term)| c * term)
            .sum()
    }
}

/// Reduced model: linear in x and y, plus depth above a reference plane
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarModel {
    coefficients: [f64; PLANAR_TERMS],
    reference_plane_offset: f64,
}

impl PlanarModel {
    pub fn new(
        coefficients: &[f64],
        reference_plane_offset: f64,
    ) -> std::result::Result<Self, TableError> {
        let coefficients: [f64; PLANAR_TERMS] = coefficients
            .try_into()
            .map_err(|_| TableError::CoefficientCount {
                expected: PLANAR_TERMS,
                found: coefficients.len(),
            })?;

        Ok(Self {
            coefficients,
            reference_plane_offset,
        })
    }

    pub fn reference_plane_offset(&self) -> f64 {
        self.reference_plane_offset
    }
}

impl HeightErrorModel for PlanarModel {
    fn evaluate(&self, x: f64, y: f64, z: f64) -> f64 {
        // No correction below the calibration plane
        let depth = z - self.reference_plane_offset;
        if depth < 0.0 {
            return 0.0;
        }

        let [cx, cy, cz] = self.coefficients;
        cx * x + cy * y + cz * depth
    }
}

/// Treatment of rapid moves that carry neither X nor Y
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RapidPolicy {
    /// Leave them at their original Z
    #[default]
    Preserve,
    /// Force them to the layer's nominal height (legacy behaviour)
    ForceNominal,
}

/// Continuous-mode compensator driven by an error surface
pub struct SurfaceCompensator {
    model: Box<dyn HeightErrorModel>,
    fixture_offset: (f64, f64),
    rapid_policy: RapidPolicy,
}

impl SurfaceCompensator {
    pub fn new(model: impl HeightErrorModel + 'static) -> Self {
        Self {
            model: Box::new(model),
            fixture_offset: DEFAULT_FIXTURE_OFFSET,
            rapid_policy: RapidPolicy::default(),
        }
    }

    pub fn with_fixture_offset(mut self, x: f64, y: f64) -> Self {
        self.fixture_offset = (x, y);
        self
    }

    pub fn with_rapid_policy(mut self, rapid_policy: RapidPolicy) -> Self {
        self.rapid_policy = rapid_policy;
        self
    }

    /// Correct every vertex of one layer. Returns the number of rewritten
    /// commands and the largest absolute correction.
    pub fn compensate_layer(&self, layer: &mut Layer) -> (usize, f64) {
        let Some(nominal) = layer.z() else {
            return (0, 0.0);
        };
        let (offset_x, offset_y) = self.fixture_offset;
        let mut adjusted = 0;
        let mut max_correction: f64 = 0.0;

        for command in layer.commands.iter_mut().filter(|c| c.is_motion()) {
            let x = command.args.number('X');
            let y = command.args.number('Y');

            match (x, y) {
                (Some(x), Some(y)) => {
                    let delta = self.model.evaluate(x - offset_x, y - offset_y, nominal);
                    let z = command.args.number('Z').unwrap_or(nominal);
                    command.args.set_number('Z', z - delta);
                    max_correction = max_correction.max(delta.abs());
                }
                // A single-axis traverse is not a deposited surface point
                (Some(_), None) | (None, Some(_)) => command.args.set_number('Z', nominal),
                (None, None) => {
                    if self.rapid_policy == RapidPolicy::Preserve || command.code() != Some("G0") {
                        continue;
                    }
                    command.args.set_number('Z', nominal);
                }
            }
            adjusted += 1;
        }

        (adjusted, max_correction)
    }
}

impl Compensator for SurfaceCompensator {
    fn apply(&self, document: &mut Document) -> Result<CompensationReport> {
        let mut report = CompensationReport::new(CompensationMode::Surface, document.layers.len());

        for layer in document.layers.iter_mut().skip(1) {
            let (adjusted, max_correction) = self.compensate_layer(layer);
            if adjusted > 0 {
                report.compensated_layers += 1;
            }
            report.adjusted_commands += adjusted;
            report.max_correction = report.max_correction.max(max_correction);
        }

        log::info!(
            "surface compensation: {} commands in {} layers, max correction {:.4} mm",
            report.adjusted_commands,
            report.compensated_layers,
            report.max_correction
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LayerOptions;
    use crate::parser::Point;
    use approx::assert_abs_diff_eq;

    struct Constant(f64);

    impl HeightErrorModel for Constant {
        fn evaluate(&self, _x: f64, _y: f64, _z: f64) -> f64 {
            self.0
        }
    }

    fn unit_coefficient(index: usize) -> Vec<f64> {
        let mut coefficients = vec![0.0; CUBIC_TERMS];
        coefficients[index] = 1.0;
        coefficients
    }

    #[test]
    fn test_cubic_term_order() {
        let (x, y, z) = (2.0, 3.0, 5.0);
        let expected = [
            1.0, 2.0, 3.0, 5.0, 4.0, 6.0, 9.0, 10.0, 15.0, 25.0, 8.0, 12.0, 18.0, 27.0, 20.0,
            30.0, 45.0, 50.0, 75.0, 125.0,
        ];

        for (index, value) in expected.iter().enumerate() {
            let model = CubicModel::new(&unit_coefficient(index)).unwrap();
            assert_eq!(model.evaluate(x, y, z), *value, "term {index}");
        }
    }

    #[test]
    fn test_cubic_requires_twenty_coefficients() {
        assert_eq!(
            CubicModel::new(&[1.0; 19]),
            Err(TableError::CoefficientCount {
                expected: 20,
                found: 19
            })
        );
    }

    #[test]
    fn test_below_reference_plane_is_zero() {
        let cubic = CubicModel::new(&unit_coefficient(0))
            .unwrap()
            .with_reference_plane_offset(1.0);
        assert_eq!(cubic.evaluate(0.0, 0.0, 0.5), 0.0);
        assert_eq!(cubic.evaluate(0.0, 0.0, 1.5), 1.0);

        let planar = PlanarModel::new(&[0.0, 0.0, 0.1], 2.0).unwrap();
        assert_eq!(planar.evaluate(10.0, 10.0, 1.0), 0.0);
        assert_abs_diff_eq!(planar.evaluate(10.0, 10.0, 3.0), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_planar_model() {
        let planar = PlanarModel::new(&[0.001, -0.002, 0.01], 0.5).unwrap();
        assert_abs_diff_eq!(planar.evaluate(10.0, 5.0, 2.5), 0.01 - 0.01 + 0.02, epsilon = 1e-12);
        assert!(PlanarModel::new(&[0.1, 0.2], 0.0).is_err());
    }

    #[test]
    fn test_layer_vertices() {
        let lines = [
            "G0 Z2.0",
            "G1 X10 Y10 E0.1",
            "G1 X12 E0.1",
            "G1 E-0.5",
        ];
        let options = LayerOptions {
            segment_length: None,
            explicit: true,
        };
        let mut layer = Layer::build(1, Point::ORIGIN, &lines, &options).unwrap();
        let compensator = SurfaceCompensator::new(Constant(0.05)).with_fixture_offset(0.0, 0.0);

        let (adjusted, max) = compensator.compensate_layer(&mut layer);

        // Z-only rapid has explicit X0 Y0 so it is an XY vertex too
        assert_eq!(adjusted, 3);
        assert_eq!(max, 0.05);
        assert_abs_diff_eq!(layer.commands[1].args.number('Z').unwrap(), 1.95, epsilon = 1e-12);
        assert_abs_diff_eq!(layer.commands[2].args.number('Z').unwrap(), 1.95, epsilon = 1e-12);
        assert!(!layer.commands[3].args.contains('Z'));
    }

    #[test]
    fn test_single_axis_moves_forced_to_nominal() {
        let lines = ["G0 Z0.4", "G1 X3 Y3 Z0.45 E0.1", "G0 X5 Z0.9", "G0 Z1.0"];
        let mut layer = Layer::build(1, Point::ORIGIN, &lines, &LayerOptions::VERBATIM).unwrap();
        let compensator = SurfaceCompensator::new(Constant(0.1)).with_fixture_offset(0.0, 0.0);

        compensator.compensate_layer(&mut layer);

        assert_abs_diff_eq!(layer.commands[1].args.number('Z').unwrap(), 0.35, epsilon = 1e-12);
        assert_eq!(layer.commands[2].args.number('Z'), Some(0.4));
        // Rapid without XY keeps its own Z by default
        assert_eq!(layer.commands[3].args.number('Z'), Some(1.0));

        let legacy = SurfaceCompensator::new(Constant(0.1))
            .with_fixture_offset(0.0, 0.0)
            .with_rapid_policy(RapidPolicy::ForceNominal);
        legacy.compensate_layer(&mut layer);
        assert_eq!(layer.commands[3].args.number('Z'), Some(0.4));
    }

    #[test]
    fn test_fixture_offset_is_subtracted() {
        struct Echo;
        impl HeightErrorModel for Echo {
            fn evaluate(&self, x: f64, y: f64, _z: f64) -> f64 {
                x * 0.01 + y * 0.001
            }
        }

        let lines = ["G1 Z1.0", "G1 X14.195 Y38.195 Z1.0 E0.1"];
        let mut layer = Layer::build(1, Point::ORIGIN, &lines, &LayerOptions::VERBATIM).unwrap();
        SurfaceCompensator::new(Echo).compensate_layer(&mut layer);

        // (10, 10) in model coordinates
        assert_abs_diff_eq!(layer.commands[1].args.number('Z').unwrap(), 1.0 - 0.11, epsilon = 1e-9);
    }
}
