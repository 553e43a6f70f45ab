//! Source location model and helpers.
//!
//! `Span` stores *both* line and byte ranges to support robust slicing and
//! diagnostics. Lines are 1-based (as commonly reported to users), while bytes
//! are 0-based offsets into the original text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start line (1-based).
    pub start_line: usize,
    /// Inclusive end line (1-based).
    pub end_line: usize,
    /// Inclusive start byte (0-based).
    pub start_byte: usize,
    /// Exclusive end byte (0-based).
    pub end_byte: usize,
}

impl Span {
    /// Build a span from line and byte ranges.
    pub fn new(start_line: usize, end_line: usize, start_byte: usize, end_byte: usize) -> Self {
        Self {
            start_line,
            end_line,
            start_byte,
            end_byte,
        }
    }

    /// Build a span straight from a Tree-sitter node position.
    pub fn from_node(node: &tree_sitter::Node) -> Self {
        Self {
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }

    /// Lines spanned (1-based inclusive).
    pub fn line_count(&self) -> usize {
        if self.end_line >= self.start_line {
            self.end_line - self.start_line + 1
        } else {
            0
        }
    }

    /// Bytes spanned.
    pub fn byte_len(&self) -> usize {
        if self.end_byte >= self.start_byte {
            self.end_byte - self.start_byte
        } else {
            0
        }
    }

    /// Extract a snippet from `text` by byte offsets, with *safe* bounds.
    pub fn slice_text<'a>(&self, text: &'a str) -> &'a str {
        let len = text.len();
        let start = self.start_byte.min(len);
        let end = self.end_byte.min(len).max(start);
        &text[start..end]
    }
}
