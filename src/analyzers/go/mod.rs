//! Go language frontend.

pub mod lowering;
pub mod parser;

pub use parser::{has_parse_errors, parse_source, parse_tree};

use super::Frontend;
use crate::core::{Result, SourceFile};
use std::path::Path;

/// Frontend backed by the tree-sitter Go grammar.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoFrontend;

impl Frontend for GoFrontend {
    fn parse(&self, content: &str, path: &Path) -> Result<SourceFile> {
        parse_source(content, path)
    }
}
