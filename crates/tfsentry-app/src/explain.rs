//! The `policies` and `explain` use cases: describe the loaded corpus.

use tfsentry_policy::PolicyCorpus;
use tfsentry_types::PolicyMetadata;

/// Summary of the compiled corpus.
#[derive(Clone, Debug)]
pub struct PoliciesOutput {
    /// Retained policy records, sorted by ID.
    pub policies: Vec<PolicyMetadata>,
    pub modules: usize,
    pub warnings: Vec<String>,
}

pub fn run_policies(corpus: &PolicyCorpus) -> PoliciesOutput {
    PoliciesOutput {
        policies: corpus.policies().cloned().collect(),
        modules: corpus.modules().len(),
        warnings: corpus.warnings().to_vec(),
    }
}

/// One line per policy: `ID  SEVERITY  provider/service  title`.
pub fn format_policies(output: &PoliciesOutput) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} policies from {} modules\n\n",
        output.policies.len(),
        output.modules
    ));
    let width = output
        .policies
        .iter()
        .map(|p| p.id.len())
        .max()
        .unwrap_or(0);
    for p in &output.policies {
        out.push_str(&format!(
            "{:<width$}  {:<8}  {}/{}  {}\n",
            p.id,
            p.severity,
            p.provider,
            p.service,
            p.title,
            width = width
        ));
    }
    out
}

/// Output from the explain use case.
#[derive(Clone, Debug)]
pub enum ExplainOutput {
    /// Found the policy.
    Found(PolicyMetadata),
    /// Unknown identifier; includes the IDs that are available.
    NotFound {
        identifier: String,
        available_ids: Vec<String>,
    },
}

/// Look up a policy by ID (case-insensitive).
pub fn run_explain(corpus: &PolicyCorpus, identifier: &str) -> ExplainOutput {
    let found = corpus
        .policy(identifier)
        .or_else(|| corpus.policies().find(|p| p.id.eq_ignore_ascii_case(identifier)));
    match found {
        Some(meta) => ExplainOutput::Found(meta.clone()),
        None => ExplainOutput::NotFound {
            identifier: identifier.to_string(),
            available_ids: corpus.policies().map(|p| p.id.clone()).collect(),
        },
    }
}

/// Format a policy for terminal display.
pub fn format_explanation(meta: &PolicyMetadata) -> String {
    let mut out = String::new();

    let heading = format!("{}: {}", meta.id, meta.title);
    out.push_str(&heading);
    out.push('\n');
    out.push_str(&"=".repeat(heading.chars().count()));
    out.push_str("\n\n");
    out.push_str(&format!("Severity: {}\n", meta.severity));
    if !meta.provider.is_empty() || !meta.service.is_empty() {
        out.push_str(&format!("Provider: {} / {}\n", meta.provider, meta.service));
    }
    if !meta.short_code.is_empty() {
        out.push_str(&format!("Short code: {}\n", meta.short_code));
    }
    out.push('\n');

    if !meta.description.is_empty() {
        out.push_str(&meta.description);
        out.push_str("\n\n");
    }
    if !meta.resolution.is_empty() {
        out.push_str("Resolution\n");
        out.push_str("----------\n");
        out.push_str(&meta.resolution);
        out.push_str("\n\n");
    }
    if !meta.references.is_empty() {
        out.push_str("References\n");
        out.push_str("----------\n");
        for r in &meta.references {
            out.push_str(&format!("  - {}\n", r));
        }
    }

    out
}

/// Format the "not found" error message for terminal display.
pub fn format_not_found(identifier: &str, ids: &[String]) -> String {
    let mut out = String::new();

    out.push_str(&format!("Unknown policy ID: {}\n\n", identifier));
    out.push_str("Available policy IDs:\n");
    for id in ids {
        out.push_str(&format!("  - {}\n", id));
    }

    out
}
