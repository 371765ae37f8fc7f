use crate::core::{Result, SourceFile};
use std::path::Path;

pub mod go;

pub use go::GoFrontend;

/// Turns source text into the syntax tree the step analysis consumes.
pub trait Frontend {
    fn parse(&self, content: &str, path: &Path) -> Result<SourceFile>;
}
