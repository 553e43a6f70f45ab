//! Data model shared across the typing pipeline.

pub mod function;
pub mod span;
