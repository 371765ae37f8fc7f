pub mod destinations;
pub mod plantuml;

pub use destinations::{FileDestination, MemoryDestination, OutputDestination, StdoutDestination};
pub use plantuml::{group_by_output, render_document, PlantUmlWriter};

use crate::core::errors::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::file_system("Failed to read file", path, e))
}

/// Output group of an input file: its path without the extension.
pub fn output_stem(path: &Path) -> String {
    path.with_extension("").to_string_lossy().into_owned()
}

/// Diagram file for an output group.
pub fn diagram_path(output: &str, extension: &str) -> PathBuf {
    PathBuf::from(format!("{output}{extension}"))
}
