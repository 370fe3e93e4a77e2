//! Layer Assembler
//!
//! Groups the lines of a toolpath into a preamble and an ordered list of
//! layers. Two strategies:
//! - marked: the slicer wrote a `;LAYER:<n>` comment before every layer
//! - heuristic: a layer starts at every motion command that sets Z first
//!
//! In heuristic mode each layer starts at the final point of the previous
//! one, so layers are built strictly in order.

use regex::Regex;

use crate::core::layer::{Layer, LayerOptions};
use crate::error::Result;
use crate::parser::Point;
use crate::split::DEFAULT_SEGMENT_LENGTH;

/// Layer marker comment written by slicers that mark layers
pub const DEFAULT_LAYER_MARKER: &str = ";LAYER:";
/// Comment that closes a raft region
pub const DEFAULT_RAFT_END_MARKER: &str = "; END RAFT";

/// Pattern of a Z-setting motion command that starts a new layer
const LAYER_CHANGE_PATTERN: &str = r"^G[01]\s+Z-?\.?\d+";

/// Options controlling how a toolpath is assembled
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOptions {
    /// Split extruding moves longer than this (mm)
    pub segment_length: Option<f64>,
    /// Write all destination axes into every layer motion command
    pub explicit: bool,
    /// Prefix of the per-layer marker comment
    pub layer_marker: String,
    /// Line that closes the raft region
    pub raft_end_marker: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            segment_length: Some(DEFAULT_SEGMENT_LENGTH),
            explicit: true,
            layer_marker: DEFAULT_LAYER_MARKER.to_string(),
            raft_end_marker: DEFAULT_RAFT_END_MARKER.to_string(),
        }
    }
}

impl ParseOptions {
    /// Options that keep every command as written (no split, no explicit axes)
    pub fn verbatim() -> Self {
        Self {
            segment_length: None,
            explicit: false,
            ..Self::default()
        }
    }

    fn layer_options(&self) -> LayerOptions {
        LayerOptions {
            segment_length: self.segment_length,
            explicit: self.explicit,
        }
    }
}

/// Result of assembling a toolpath
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Assembly {
    pub preamble: Option<Layer>,
    pub layers: Vec<Layer>,
}

/// Group toolpath text into a preamble and layers
pub fn assemble(text: &str, options: &ParseOptions) -> Result<Assembly> {
    if text.is_empty() {
        return Ok(Assembly::default());
    }

    let marker = Regex::new(&format!(
        r"^{}\d+\s*$",
        regex::escape(&options.layer_marker)
    ))?;

    if text.lines().any(|line| marker.is_match(line)) {
        log::debug!("assembling layers from '{}' markers", options.layer_marker);
        assemble_marked(text, &marker, options)
    } else {
        log::debug!("no layer markers found, detecting layers from Z changes");
        assemble_heuristic(text, options)
    }
}

fn assemble_marked(text: &str, marker: &Regex, options: &ParseOptions) -> Result<Assembly> {
    let mut chunks: Vec<Vec<&str>> = vec![Vec::new()];
    for line in text.lines() {
        if marker.is_match(line) {
            chunks.push(Vec::new());
        } else if let Some(chunk) = chunks.last_mut() {
            chunk.push(line);
        }
    }

    let mut chunks = chunks.into_iter();
    let preamble_lines = chunks.next().unwrap_or_default();
    let preamble = Layer::build(0, Point::ORIGIN, &preamble_lines, &LayerOptions::VERBATIM)?;

    let layer_options = options.layer_options();
    let mut start = preamble.final_point();
    let mut layers = Vec::new();
    for (index, lines) in chunks.enumerate() {
        let layer = Layer::build(index, start, &lines, &layer_options)?;
        start = layer.final_point();
        layers.push(layer);
    }

    Ok(Assembly {
        preamble: Some(preamble),
        layers,
    })
}

fn assemble_heuristic(text: &str, options: &ParseOptions) -> Result<Assembly> {
    let layer_change = Regex::new(LAYER_CHANGE_PATTERN)?;
    let layer_options = options.layer_options();

    // Without a raft marker there is no raft to skip
    let mut in_raft = text.lines().any(|line| line == options.raft_end_marker);
    let mut preamble: Option<Layer> = None;
    let mut layers: Vec<Layer> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines().filter(|line| !line.is_empty()) {
        if !layer_change.is_match(line) {
            current.push(line);
            if line == options.raft_end_marker {
                log::debug!("raft ends after {} preamble lines", current.len());
                in_raft = false;
            }
            continue;
        }

        match preamble.as_ref().map(Layer::final_point) {
            None if in_raft => {
                current.push(line);
                continue;
            }
            None => {
                preamble = Some(Layer::build(
                    0,
                    Point::ORIGIN,
                    &current,
                    &LayerOptions::VERBATIM,
                )?);
            }
            Some(preamble_end) => {
                let start = layers.last().map_or(preamble_end, Layer::final_point);
                layers.push(Layer::build(layers.len(), start, &current, &layer_options)?);
            }
        }
        current = vec![line];
    }

    match preamble.as_ref().map(Layer::final_point) {
        None => {
            log::warn!("no layer change found; the whole toolpath is preamble");
            preamble = Some(Layer::build(
                0,
                Point::ORIGIN,
                &current,
                &LayerOptions::VERBATIM,
            )?);
        }
        Some(preamble_end) => {
            let start = layers.last().map_or(preamble_end, Layer::final_point);
            layers.push(Layer::build(layers.len(), start, &current, &layer_options)?);
        }
    }

    Ok(Assembly { preamble, layers })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marked_layers() {
        let text = "M104 S200\n;LAYER:0\nG0 Z0.2\nG1 X1 Y1 E0.1\n;LAYER:1\nG0 Z0.4\nG1 X2 Y2 E0.1\n";
        let assembly = assemble(text, &ParseOptions::default()).unwrap();

        assert_eq!(assembly.preamble.unwrap().commands.len(), 1);
        assert_eq!(assembly.layers.len(), 2);
        assert_eq!(assembly.layers[0].z(), Some(0.2));
        assert_eq!(assembly.layers[1].z(), Some(0.4));
        assert_eq!(
            assembly.layers[1].initial_point(),
            assembly.layers[0].final_point()
        );
    }

    #[test]
    fn test_heuristic_layers_without_raft() {
        let text = "G28\nM104 S200\nG1 Z0.2 F600\nG1 X5 Y5 E0.2\nG1 Z0.4\nG1 X6 Y5 E0.1\n";
        let assembly = assemble(text, &ParseOptions::default()).unwrap();

        let preamble = assembly.preamble.unwrap();
        assert_eq!(preamble.commands.len(), 2);
        assert_eq!(assembly.layers.len(), 2);
        assert_eq!(assembly.layers[0].index, 0);
        assert_eq!(assembly.layers[1].index, 1);
        assert_eq!(
            assembly.layers[1].initial_point(),
            Point::new(5.0, 5.0, 0.2)
        );
    }

    #[test]
    fn test_raft_is_collapsed_into_preamble() {
        let text = "G28\nG1 Z0.3\nG1 X5 Y5 E1\nG1 Z0.6\nG1 X6 Y6 E1\n; END RAFT\nG1 Z0.8\nG1 X7 Y7 E0.1\nG1 Z1.0\nG1 X8 Y8 E0.1\n";
        let assembly = assemble(text, &ParseOptions::default()).unwrap();

        let preamble = assembly.preamble.unwrap();
        assert_eq!(preamble.commands.len(), 6);
        assert_eq!(assembly.layers.len(), 2);
        assert_eq!(assembly.layers[0].z(), Some(0.8));
        assert_eq!(assembly.layers[0].initial_point(), Point::new(6.0, 6.0, 0.6));
    }

    #[test]
    fn test_z_must_follow_code_directly() {
        let text = "G1 X1 Z0.2\nG1 X2 Y2\n";
        let assembly = assemble(text, &ParseOptions::default()).unwrap();

        assert!(assembly.layers.is_empty());
        assert_eq!(assembly.preamble.unwrap().commands.len(), 2);
    }

    #[test]
    fn test_empty_text() {
        let assembly = assemble("", &ParseOptions::default()).unwrap();
        assert!(assembly.preamble.is_none());
        assert!(assembly.layers.is_empty());
    }
}
