//! Function records extracted from one parse of a Python module.
//!
//! A `FunctionRecord` is a snapshot: it is rebuilt from a fresh parse every
//! pass and never mutated, because each splice shifts the spans of everything
//! after it in the file.

use serde::{Deserialize, Serialize};

use crate::model::span::Span;

/// How much of a function signature already carries annotations.
///
/// - `NoArgs`: at least one parameter (excluding a leading `self`/`cls`
///   receiver) has no annotation.
/// - `NoReturn`: all parameters are annotated, the body contains a `return`
///   or `yield`, but there is no return annotation.
/// - `Fully`: everything that needs an annotation has one. A function whose
///   body never returns a value counts as fully typed without a `->` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Typedness {
    Fully,
    NoArgs,
    NoReturn,
}

/// One parameter of a function signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamRecord {
    /// Bare parameter name (splat markers stripped).
    pub name: String,
    /// Whether the parameter carries a type annotation.
    pub annotated: bool,
    /// Default value literal, verbatim from source.
    pub default: Option<String>,
    /// First parameter named `self` or `cls`.
    pub is_receiver: bool,
    /// `*args` / `**kwargs`; excluded from the typedness check.
    pub is_splat: bool,
    /// Byte offset just past the parameter name, for anchor truncation.
    pub name_end_byte: usize,
}

/// A module-level function definition with its signature geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    /// The `def …:` line(s), from the `def` keyword through the closing colon.
    pub signature_span: Span,
    /// The function body block.
    pub body_span: Span,
    /// The parenthesized parameter list, parens included.
    pub params_span: Span,
    pub params: Vec<ParamRecord>,
    pub has_return_annotation: bool,
    pub typedness: Typedness,
}

impl FunctionRecord {
    /// True when nothing in the signature remains to annotate.
    pub fn is_typed(&self) -> bool {
        self.typedness == Typedness::Fully
    }

    /// Verbatim signature text within `text`.
    pub fn signature_text<'a>(&self, text: &'a str) -> &'a str {
        self.signature_span.slice_text(text)
    }

    /// First parameter that still needs an annotation, receiver and splats
    /// excluded. `None` unless `typedness == NoArgs`.
    pub fn first_unannotated_param(&self) -> Option<&ParamRecord> {
        self.params
            .iter()
            .find(|p| !p.is_receiver && !p.is_splat && !p.annotated)
    }
}
