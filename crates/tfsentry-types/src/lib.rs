//! Stable DTOs and IDs used across the tfsentry workspace.
//!
//! This crate is intentionally boring:
//! - data types for the emitted scan report (Trivy-compatible field names)
//! - policy metadata records extracted from rule annotations
//! - stable string IDs, constants, and severity ordering

#![forbid(unsafe_code)]

pub mod ids;
pub mod policy;
pub mod report;

pub use policy::{PolicyMetadata, severity_rank};
pub use report::{
    CauseMetadata, CodeLine, CodeLines, Finding, FindingStatus, Layer, ScanReport, TargetResult,
    compare_findings,
};
