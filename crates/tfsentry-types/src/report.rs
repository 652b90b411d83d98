use crate::policy::severity_rank;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Outcome tag of a finding: `deny`/`violation` rules produce FAIL, `warn` rules produce WARN.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum FindingStatus {
    Fail,
    Warn,
}

/// Image layer information. Always empty for configuration scans; kept for consumers
/// that expect the field to be present.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Layer {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CodeLine {
    pub number: u32,
    pub content: String,
    pub is_cause: bool,
    pub annotation: String,
    pub truncated: bool,
    pub first_cause: bool,
    pub last_cause: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CodeLines {
    pub lines: Vec<CodeLine>,
}

/// Source position recovered from a rule output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct CauseMetadata {
    pub resource: String,
    pub provider: String,
    pub service: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeLines>,
}

/// One normalized policy finding ("misconfiguration").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Finding {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "AVDID")]
    pub avd_id: String,
    pub title: String,
    pub description: String,
    pub message: String,
    pub namespace: String,
    /// The predicate that produced this finding, e.g. `data.builtin.aws.s3.deny`.
    pub query: String,
    pub resolution: String,
    pub severity: String,
    #[serde(rename = "PrimaryURL")]
    pub primary_url: String,
    #[serde(default)]
    pub references: Vec<String>,
    pub status: FindingStatus,
    #[serde(default)]
    pub layer: Layer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause_metadata: Option<CauseMetadata>,
}

impl Finding {
    pub fn start_line(&self) -> Option<u32> {
        self.cause_metadata
            .as_ref()
            .map(|c| c.start_line)
            .filter(|line| *line > 0)
    }
}

/// Per-target block of a scan report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct TargetResult {
    pub target: String,
    pub class: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub misconfigurations: Vec<Finding>,
}

/// Report for one scanned artifact (a file, or a directory in merged mode).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct ScanReport {
    pub schema_version: u32,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub artifact_name: String,
    pub artifact_type: String,
    pub results: Vec<TargetResult>,
}

impl ScanReport {
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.results.iter().flat_map(|r| r.misconfigurations.iter())
    }
}

/// Deterministic finding order used by every producer.
///
/// Ordering priority:
/// 1) status (FAIL before WARN)
/// 2) severity (CRITICAL first)
/// 3) start line (missing last)
/// 4) id
/// 5) resource
/// 6) message
pub fn compare_findings(a: &Finding, b: &Finding) -> std::cmp::Ordering {
    let line = |f: &Finding| f.start_line().unwrap_or(u32::MAX);
    let resource = |f: &Finding| {
        f.cause_metadata
            .as_ref()
            .map(|c| c.resource.clone())
            .unwrap_or_default()
    };

    a.status
        .cmp(&b.status)
        .then(severity_rank(&b.severity).cmp(&severity_rank(&a.severity)))
        .then(line(a).cmp(&line(b)))
        .then(a.id.cmp(&b.id))
        .then(resource(a).cmp(&resource(b)))
        .then(a.message.cmp(&b.message))
}
