//! Toolpath Document Model
//!
//! Layers, layer assembly and the document that owns them.

pub mod assembler;
pub mod document;
pub mod layer;

pub use assembler::{Assembly, ParseOptions, assemble};
pub use document::Document;
pub use layer::{Extents, Layer, LayerOptions};
