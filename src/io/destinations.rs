//! Output destinations for rendered diagrams.
//!
//! Diagrams go either to stdout (console mode) or to one file per output
//! group. The in-memory destination captures output in tests.

use crate::core::errors::{Error, Result, ResultExt};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Something a rendered diagram can be written to.
pub trait OutputDestination {
    fn write_str(&self, content: &str) -> Result<()>;

    fn flush(&self) -> Result<()>;

    /// Used in error messages and logs.
    fn description(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct FileDestination {
    path: PathBuf,
}

impl FileDestination {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl OutputDestination for FileDestination {
    fn write_str(&self, content: &str) -> Result<()> {
        std::fs::write(&self.path, content)
            .map_err(|e| Error::file_system("Failed to create diagram file", &self.path, e))
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn description(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Captures output in a shared buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryDestination {
    buffer: Arc<Mutex<String>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_content(&self) -> String {
        self.buffer
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl OutputDestination for MemoryDestination {
    fn write_str(&self, content: &str) -> Result<()> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| Error::Output("memory buffer poisoned".to_string()))?;
        buffer.push_str(content);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn description(&self) -> String {
        "memory".to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutDestination;

impl StdoutDestination {
    pub fn new() -> Self {
        Self
    }
}

impl OutputDestination for StdoutDestination {
    fn write_str(&self, content: &str) -> Result<()> {
        io::stdout()
            .lock()
            .write_all(content.as_bytes())
            .context("Failed to write to stdout")
    }

    fn flush(&self) -> Result<()> {
        io::stdout()
            .lock()
            .flush()
            .context("Failed to flush stdout")
    }

    fn description(&self) -> String {
        "stdout".to_string()
    }
}
