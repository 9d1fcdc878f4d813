//! Code generation module

mod generator;
mod writer;

pub use generator::{generate, GeneratedArtifact, GenerationTemplate};
pub use writer::{ArtifactWriter, WriteResult, UTF8_BOM};
