//! Tree-sitter parser integration for Go
//!
//! Parses Go source with the tree-sitter grammar and lowers the concrete tree
//! into the analysis syntax tree.

use super::lowering::lower_file;
use crate::core::{Error, Result, SourceFile};
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// Parse Go source code into a tree-sitter tree
pub fn parse_tree(content: &str, path: &Path) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| Error::parse(path, 0, 0, format!("failed to load Go grammar: {e}")))?;

    parser
        .parse(content, None)
        .ok_or_else(|| Error::parse(path, 0, 0, "parser produced no tree"))
}

/// Parse Go source code into a [`SourceFile`].
///
/// A tree containing syntax errors is rejected; the analysis never works on a
/// partially recovered tree.
pub fn parse_source(content: &str, path: &Path) -> Result<SourceFile> {
    let tree = parse_tree(content, path)?;

    if let Some(node) = first_error(tree.root_node()) {
        let excerpt: String = node_text(&node, content).chars().take(20).collect();
        return Err(Error::parse(
            path,
            node_line(&node),
            node_column(&node),
            format!("syntax error near `{excerpt}`"),
        ));
    }

    log::debug!("Parsed {} ({} bytes)", path.display(), content.len());
    Ok(lower_file(&tree, content, path))
}

/// Check if a parse tree has errors
pub fn has_parse_errors(tree: &Tree) -> bool {
    tree.root_node().has_error()
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error).or(Some(node))
}

/// Get text for a tree-sitter node
pub fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Get the line number for a tree-sitter node (1-indexed)
pub fn node_line(node: &Node) -> usize {
    node.start_position().row + 1
}

/// Get the column number for a tree-sitter node (1-indexed)
pub fn node_column(node: &Node) -> usize {
    node.start_position().column + 1
}
