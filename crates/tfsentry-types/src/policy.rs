use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Descriptive record attached to a rule module through its annotations.
///
/// Records are only retained when `id` is non-empty; `avd_id` always mirrors `id`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PolicyMetadata {
    pub id: String,
    pub avd_id: String,
    pub title: String,
    #[serde(default)]
    pub short_code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub provider: String,
    pub severity: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub references: Vec<String>,
}

impl PolicyMetadata {
    /// Synthesized record used when no annotated module matches a namespace.
    pub fn fallback(namespace: &str) -> Self {
        Self {
            id: namespace.to_string(),
            avd_id: namespace.to_string(),
            title: crate::ids::FALLBACK_TITLE.to_string(),
            severity: crate::ids::DEFAULT_SEVERITY.to_string(),
            ..Self::default()
        }
    }
}

/// Ordering rank for the recognized severity levels; unknown levels rank below LOW.
pub fn severity_rank(severity: &str) -> u8 {
    match severity {
        "CRITICAL" => 4,
        "HIGH" => 3,
        "MEDIUM" => 2,
        "LOW" => 1,
        _ => 0,
    }
}
