//! Terraform configuration documents as generic value trees.
//!
//! This crate is intentionally IO-free: callers hand it bytes and receive a [`Document`].
//! - [`coerce`]: literal expressions and JSON into [`Value`]
//! - [`builder`]: native HCL and JSON-variant files into a [`Document`]
//! - [`merge`]: per-file documents into one logical directory document
//! - [`cancel`]: the cancellation token shared by every stage of a scan

#![forbid(unsafe_code)]

pub mod builder;
pub mod cancel;
pub mod coerce;
pub mod merge;
mod value;

#[cfg(test)]
mod proptest;

pub use builder::{
    BlockCategory, Document, DocumentBuilder, DocumentError, Syntax, build_document,
};
pub use cancel::{Cancellation, Cancelled};
pub use coerce::{NotContextFree, coerce_expression, coerce_json};
pub use merge::{merge, merge_documents};
pub use value::{Map, Value};

/// Fuzz-friendly API for testing parsing robustness.
/// These functions are designed to never panic on any input.
pub mod fuzz {
    use super::*;

    /// Build arbitrary bytes as a native HCL document.
    ///
    /// Returns `Err(...)` for invalid input. **Never panics** on any input.
    pub fn build_native(data: &[u8]) -> Result<(), DocumentError> {
        let _ = build_document(data, Syntax::Native)?;
        Ok(())
    }

    /// Build arbitrary bytes as a JSON-variant document.
    ///
    /// Returns `Err(...)` for invalid input. **Never panics** on any input.
    pub fn build_json(data: &[u8]) -> Result<(), DocumentError> {
        let _ = build_document(data, Syntax::Json)?;
        Ok(())
    }

    /// Build every source that parses as native HCL and merge the results in order.
    ///
    /// Returns the number of documents merged. **Never panics** on any input.
    pub fn build_and_merge(sources: &[&[u8]]) -> usize {
        let documents: Vec<Document> = sources
            .iter()
            .filter_map(|src| build_document(src, Syntax::Native).ok())
            .collect();
        let count = documents.len();
        let _ = merge_documents(documents);
        count
    }
}
