//! Conformance tests for tfsentry.
//!
//! These tests validate:
//! 1. Emitted reports conform to the JSON schema generated from the report types
//! 2. Reports are deterministic apart from their creation timestamps

use assert_cmd::Command;
use schemars::schema_for;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tfsentry_test_util::normalize_nondeterministic;
use tfsentry_types::ScanReport;

#[allow(deprecated)]
fn tfsentry_cmd() -> Command {
    Command::cargo_bin("tfsentry").unwrap()
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("tfsentry-cli should have parent")
        .parent()
        .expect("crates should have parent")
        .join("tests")
        .join("fixtures")
}

fn scan_report(target: &Path) -> Value {
    let temp = TempDir::new().expect("temp dir");
    let report_path = temp.path().join("report.json");
    tfsentry_cmd()
        .current_dir(temp.path())
        .env_remove("POLICY_DIR")
        .arg("--policy-dir")
        .arg(fixtures_dir().join("policies"))
        .arg("--library-dir")
        .arg(fixtures_dir().join("lib"))
        .arg("scan")
        .arg(target)
        .arg("--report-out")
        .arg(&report_path)
        .output()
        .expect("run tfsentry");
    let text = std::fs::read_to_string(&report_path).expect("read report");
    serde_json::from_str(&text).expect("parse report")
}

fn report_validator() -> jsonschema::Validator {
    let schema = serde_json::to_value(schema_for!(Vec<ScanReport>)).expect("schema to json");
    jsonschema::validator_for(&schema).expect("compile schema")
}

// =============================================================================
// Schema conformance
// =============================================================================

#[test]
fn fixture_reports_validate_against_schema() {
    let validator = report_validator();
    for target in ["public_bucket/main.tf", "clean/main.tf", "json/main.tf.json", "mixed"] {
        let report = scan_report(&fixtures_dir().join("terraform").join(target));
        let errors: Vec<String> = validator
            .iter_errors(&report)
            .map(|e| e.to_string())
            .collect();
        assert!(errors.is_empty(), "{target}: schema violations: {errors:#?}");
    }
}

#[test]
fn schema_rejects_missing_required_fields() {
    let validator = report_validator();
    let broken = serde_json::json!([{ "SchemaVersion": 2, "ArtifactName": "main.tf" }]);
    assert!(!validator.is_valid(&broken));
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn repeated_scans_are_identical_after_normalization() {
    let target = fixtures_dir().join("terraform").join("mixed");
    let first = normalize_nondeterministic(scan_report(&target));
    let second = normalize_nondeterministic(scan_report(&target));
    assert_eq!(first, second);
    assert_eq!(first[0]["CreatedAt"], "__TIMESTAMP__");
}
