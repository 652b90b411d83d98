//! Stable identifiers and constants shared by the report producer and consumers.
//!
//! Values in this module appear verbatim in emitted reports; changing them is a breaking change.

// Report envelope
pub const SCHEMA_VERSION: u32 = 2;
pub const ARTIFACT_TYPE_TERRAFORM: &str = "terraform";
pub const RESULT_CLASS_CONFIG: &str = "config";
pub const RESULT_TYPE_TERRAFORM: &str = "terraform";

// Findings
pub const FINDING_TYPE: &str = "Terraform Security Check";
pub const FALLBACK_TITLE: &str = "Security Check";
pub const DEFAULT_SEVERITY: &str = "MEDIUM";
pub const DEFAULT_REFERENCE_URL_BASE: &str = "https://avd.aquasec.com/misconfig/";

// Predicate families evaluated in every rule namespace.
pub const RULE_DENY: &str = "deny";
pub const RULE_VIOLATION: &str = "violation";
pub const RULE_WARN: &str = "warn";

// Raw rule output fields.
pub const FIELD_SEVERITY_TAG: &str = "_severity";
pub const FIELD_MSG: &str = "msg";
pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_RESOURCE: &str = "resource";
pub const FIELD_STARTLINE: &str = "startline";
pub const FIELD_ENDLINE: &str = "endline";

// Values of the `_severity` tag.
pub const TAG_FAIL: &str = "FAIL";
pub const TAG_WARN: &str = "WARN";

/// Prefix of every evaluable package path.
pub const DATA_ROOT_PREFIX: &str = "data.";

/// Reserved key carrying source positions inside each document block body.
pub const SOURCE_METADATA_KEY: &str = "__source";
