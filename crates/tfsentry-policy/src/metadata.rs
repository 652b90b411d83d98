use crate::module::RuleModule;
use serde_json::Value;
use tfsentry_types::PolicyMetadata;
use tfsentry_types::ids::DEFAULT_SEVERITY;

/// Build the policy record for one module from its package/rule annotations.
///
/// Returns `None` for modules without annotations and for modules whose annotations
/// carry no ID. Later annotations overwrite earlier ones field by field.
pub fn extract_metadata(module: &RuleModule) -> Option<PolicyMetadata> {
    if module.annotations.is_empty() {
        return None;
    }

    let mut meta = PolicyMetadata::default();

    for annotation in module
        .annotations
        .iter()
        .filter(|a| a.scope.is_policy_scope())
    {
        if let Some(title) = annotation.str_field("title") {
            meta.title = title.to_string();
        }
        if let Some(description) = annotation.str_field("description") {
            meta.description = description.to_string();
        }

        let custom = |key: &str| annotation.custom_str(key).map(str::to_string);

        if let Some(title) = custom("title") {
            meta.title = title;
        }
        if let Some(description) = custom("description") {
            meta.description = description;
        }
        if let Some(id) = custom("id").or_else(|| custom("avd_id")) {
            meta.avd_id = id.clone();
            meta.id = id;
        }
        if let Some(severity) = custom("severity") {
            meta.severity = severity.to_uppercase();
        }
        if let Some(service) = custom("service") {
            meta.service = service;
        }
        if let Some(provider) = custom("provider") {
            meta.provider = provider;
        }
        if let Some(short_code) = custom("short_code") {
            meta.short_code = short_code;
        }
        if let Some(remediation) = custom("remediation") {
            meta.resolution = remediation;
        }
        if let Some(resolution) = custom("resolution") {
            meta.resolution = resolution;
        }

        if let Some(refs) = annotation
            .custom()
            .and_then(|c| c.get("references"))
            .and_then(Value::as_array)
        {
            meta.references
                .extend(refs.iter().filter_map(Value::as_str).map(str::to_string));
        }
        meta.references.extend(annotation.related_resources());
    }

    let segments: Vec<&str> = module.package.split('.').collect();
    if meta.provider.is_empty()
        && let Some(provider) = segments.get(2)
    {
        meta.provider = provider.to_uppercase();
    }
    if meta.service.is_empty()
        && let Some(service) = segments.get(3)
    {
        meta.service = service.to_string();
    }

    if meta.id.is_empty() || meta.avd_id.is_empty() {
        return None;
    }
    if meta.severity.is_empty() {
        meta.severity = DEFAULT_SEVERITY.to_string();
    }
    meta.references.dedup();

    Some(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::RegoVersion;
    use camino::Utf8Path;

    fn module(src: &str) -> RuleModule {
        RuleModule::parse(Utf8Path::new("policy.rego"), src, RegoVersion::V1).expect("parse")
    }

    const FULL: &str = r#"# METADATA
# title: Bucket ACL is public
# description: Public ACLs expose bucket contents.
# related_resources:
# - https://example.com/related
# custom:
#   id: AVD-AWS-0092
#   short_code: no-public-access-with-acl
#   severity: high
#   service: s3
#   provider: aws
#   remediation: Use a private ACL.
#   references:
#   - https://example.com/acl
package builtin.aws.s3.aws0092

import rego.v1

deny contains "x" if false
"#;

    #[test]
    fn extracts_all_fields() {
        let meta = extract_metadata(&module(FULL)).expect("metadata");
        assert_eq!(meta.id, "AVD-AWS-0092");
        assert_eq!(meta.avd_id, "AVD-AWS-0092");
        assert_eq!(meta.title, "Bucket ACL is public");
        assert_eq!(meta.description, "Public ACLs expose bucket contents.");
        assert_eq!(meta.short_code, "no-public-access-with-acl");
        assert_eq!(meta.severity, "HIGH");
        assert_eq!(meta.service, "s3");
        assert_eq!(meta.provider, "aws");
        assert_eq!(meta.resolution, "Use a private ACL.");
        assert_eq!(
            meta.references,
            vec!["https://example.com/acl", "https://example.com/related"]
        );
    }

    #[test]
    fn no_annotations_means_no_metadata() {
        assert!(extract_metadata(&module("package a.b\n")).is_none());
    }

    #[test]
    fn missing_id_means_no_metadata() {
        let src = "# METADATA\n# title: untitled\npackage a.b\n";
        assert!(extract_metadata(&module(src)).is_none());
    }

    #[test]
    fn avd_id_is_a_fallback_for_id() {
        let src = "# METADATA\n# custom:\n#   avd_id: AVD-X-1\npackage a.b\n";
        let meta = extract_metadata(&module(src)).expect("metadata");
        assert_eq!(meta.id, "AVD-X-1");
        assert_eq!(meta.avd_id, "AVD-X-1");
    }

    #[test]
    fn defaults_come_from_package_path() {
        let src = "# METADATA\n# custom:\n#   id: AVD-GCP-0001\npackage builtin.google.gke.gcp0001\n";
        let meta = extract_metadata(&module(src)).expect("metadata");
        assert_eq!(meta.severity, "MEDIUM");
        assert_eq!(meta.provider, "GOOGLE");
        assert_eq!(meta.service, "gke");
    }

    #[test]
    fn resolution_overrides_remediation() {
        let src = "# METADATA\n# custom:\n#   id: X\n#   remediation: old\n#   resolution: new\npackage a.b\n";
        let meta = extract_metadata(&module(src)).expect("metadata");
        assert_eq!(meta.resolution, "new");
    }

    #[test]
    fn later_annotation_wins() {
        let src = r#"# METADATA
# custom:
#   id: FIRST
#   severity: low
package a.b

import rego.v1

# METADATA
# custom:
#   id: SECOND
deny contains "x" if false
"#;
        let meta = extract_metadata(&module(src)).expect("metadata");
        assert_eq!(meta.id, "SECOND");
        assert_eq!(meta.severity, "LOW");
    }

    #[test]
    fn other_scopes_are_ignored() {
        let src = "# METADATA\n# scope: document\n# custom:\n#   id: DOC\npackage a.b\n";
        assert!(extract_metadata(&module(src)).is_none());
    }
}
