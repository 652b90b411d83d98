use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `tfsentry.toml` schema v1.
///
/// Every field is optional; omitted values fall back to built-in defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TfsentryConfigV1 {
    /// Optional schema string for tooling (`tfsentry.config.v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default)]
    pub policies: PoliciesConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PoliciesConfig {
    /// Required corpus root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Optional library roots. Defaults to `<dir>/../lib`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libraries: Option<Vec<String>>,

    /// Rego dialect: `v1` (default) or `v0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rego_version: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// Directory scan mode: `per-file` (default) or `merged`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Worker threads for per-file scans; 0 picks the number of CPUs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// `lexical` (default) or `listing`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_order: Option<String>,

    /// Glob patterns for files to leave out.
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_metadata: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// When the verdict fails: `fail` (default), `warn`, or `never`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_on: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_url_base: Option<String>,

    /// Attach source excerpts to findings from per-file scans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_code: Option<bool>,
}
