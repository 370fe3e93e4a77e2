//! Toolpath Document
//!
//! Owns the preamble and the ordered layers of a toolpath. The document is
//! built once from the whole text, mutated by one compensation pass and then
//! serialized once. Layers are never reordered.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::compensation::{CompensationReport, Compensator};
use crate::core::assembler::{ParseOptions, assemble};
use crate::core::layer::Layer;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub preamble: Option<Layer>,
    pub layers: Vec<Layer>,
    layer_marker: String,
}

impl Document {
    /// Parse a whole toolpath
    pub fn parse(text: &str, options: &ParseOptions) -> Result<Self> {
        let assembly = assemble(text, options)?;
        log::info!("parsed toolpath into {} layers", assembly.layers.len());

        Ok(Self {
            preamble: assembly.preamble,
            layers: assembly.layers,
            layer_marker: options.layer_marker.clone(),
        })
    }

    /// Read and parse a toolpath file
    pub fn from_file(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        log::debug!("read {} bytes from {}", text.len(), path.as_ref().display());
        Self::parse(&text, options)
    }

    /// Shift layer `from_layer` and all following layers along `axis`
    pub fn shift(&mut self, from_layer: usize, axis: char, amount: f64) {
        for layer in self.layers.iter_mut().skip(from_layer) {
            layer.shift(axis, amount);
        }
    }

    /// Like `shift` but multiplies by `factor`
    pub fn multiply(&mut self, from_layer: usize, axis: char, factor: f64) {
        for layer in self.layers.iter_mut().skip(from_layer) {
            layer.multiply(axis, factor);
        }
    }

    /// Apply one compensation pass to the whole document
    pub fn compensate<C: Compensator + ?Sized>(
        &mut self,
        compensator: &C,
    ) -> Result<CompensationReport> {
        compensator.apply(self)
    }

    /// Serialize the document back to toolpath text
    pub fn construct(&self) -> String {
        let mut out = String::new();

        if let Some(preamble) = self.preamble.as_ref().filter(|p| !p.commands.is_empty()) {
            out.push_str(&preamble.construct());
            out.push('\n');
        }

        for (i, layer) in self.layers.iter().enumerate() {
            out.push_str(&format!("{}{}\n", self.layer_marker, i));
            out.push_str(&layer.construct());
            out.push('\n');
        }

        out
    }

    /// Write the serialized document to `path` in one go
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), self.construct())?;
        log::info!("wrote {}", path.as_ref().display());
        Ok(())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Gcode with {} layers>", self.layers.len())
    }
}
