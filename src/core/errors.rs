//! Error type shared by the library.
//!
//! Recognition mismatches and unresolved transition targets are not errors;
//! they show up in the diagram instead. Only unreadable input, malformed
//! source, bad configuration and failed output end a run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{message}: {}", .path.as_ref().map_or_else(String::new, |p| p.display().to_string()))]
    FileSystem {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Source that does not parse as Go.
    #[error("{file}:{line}:{column}: {message}")]
    Parse {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Diagram could not be written.
    #[error("output failed: {0}")]
    Output(String),

    #[error("{context}: {message}")]
    WithContext { context: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn file_system(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source),
        }
    }

    pub fn parse(
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// `.context(...)` for results carrying [`Error`].
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_parse_error_display() {
        let err = Error::parse("sm.go", 3, 7, "syntax error near `{`");
        assert_eq!(err.to_string(), "sm.go:3:7: syntax error near `{`");
    }

    #[test]
    fn test_file_system_error_names_path() {
        let err = Error::file_system(
            "Failed to read file",
            "pkg/sm.go",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "Failed to read file: pkg/sm.go");
    }

    #[test]
    fn test_context_wraps_io_error() {
        let result: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        let err = result.context("writing diagram").unwrap_err();
        assert_eq!(err.to_string(), "writing diagram: pipe closed");
    }
}
