//! Use case orchestration for tfsentry.
//!
//! This crate provides the application layer: corpus initialization, scanning, policy listing,
//! and report rendering. It coordinates the document, target, policy, and render crates.
//!
//! The CLI crate depends on this; it only handles argument parsing and I/O.

#![forbid(unsafe_code)]

mod explain;
mod render;
mod report;
mod scan;

#[cfg(test)]
mod test_support;

pub use explain::{
    ExplainOutput, PoliciesOutput, format_explanation, format_not_found, format_policies,
    run_explain, run_policies,
};
pub use render::{render_annotations, render_markdown, write_report, write_text};
pub use report::{
    Verdict, parse_reports_json, serialize_reports, to_renderable, verdict, verdict_exit_code,
};
pub use scan::{ScanInput, ScanOutput, init_corpus, run_scan};
