use crate::evaluate::RawRuleOutput;
use tfsentry_types::ids::{
    DEFAULT_REFERENCE_URL_BASE, FIELD_ENDLINE, FIELD_MESSAGE, FIELD_MSG, FIELD_RESOURCE,
    FIELD_SEVERITY_TAG, FIELD_STARTLINE, FINDING_TYPE, TAG_WARN,
};
use tfsentry_types::{CauseMetadata, Finding, FindingStatus, Layer, PolicyMetadata};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapOptions {
    /// Prefix of `PrimaryURL`; the lower-cased AVD ID is appended.
    pub reference_url_base: String,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            reference_url_base: DEFAULT_REFERENCE_URL_BASE.to_string(),
        }
    }
}

/// Turn one raw rule output into a report finding.
///
/// `metadata` is the record indexed for the output's namespace; without one the finding
/// is described by fallback metadata derived from the namespace.
pub fn map_output(
    raw: &RawRuleOutput,
    metadata: Option<&PolicyMetadata>,
    options: &MapOptions,
) -> Finding {
    let fallback;
    let meta = match metadata {
        Some(meta) => meta,
        None => {
            fallback = PolicyMetadata::fallback(&raw.namespace);
            &fallback
        }
    };

    let message = [FIELD_MSG, FIELD_MESSAGE]
        .into_iter()
        .filter_map(|key| raw.str_field(key))
        .find(|s| !s.is_empty())
        .unwrap_or(meta.description.as_str())
        .to_string();

    let status = if raw.str_field(FIELD_SEVERITY_TAG) == Some(TAG_WARN) {
        FindingStatus::Warn
    } else {
        FindingStatus::Fail
    };

    let resource = raw.str_field(FIELD_RESOURCE).unwrap_or_default().to_string();
    let start_line = raw.line_field(FIELD_STARTLINE);
    let end_line = raw.line_field(FIELD_ENDLINE);
    let cause_metadata = (!resource.is_empty() || start_line > 0).then(|| CauseMetadata {
        resource,
        provider: meta.provider.clone(),
        service: meta.service.clone(),
        start_line,
        end_line,
        code: None,
    });

    Finding {
        kind: FINDING_TYPE.to_string(),
        id: meta.id.clone(),
        avd_id: meta.avd_id.clone(),
        title: meta.title.clone(),
        description: meta.description.clone(),
        message,
        namespace: raw.namespace.clone(),
        query: raw.query(),
        resolution: meta.resolution.clone(),
        severity: meta.severity.clone(),
        primary_url: format!(
            "{}{}",
            options.reference_url_base,
            meta.avd_id.to_lowercase()
        ),
        references: meta.references.clone(),
        status,
        layer: Layer::default(),
        cause_metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::RuleFamily;
    use serde_json::{Map, Value, json};

    fn raw(family: RuleFamily, fields: Value) -> RawRuleOutput {
        let mut fields: Map<String, Value> = fields.as_object().cloned().unwrap_or_default();
        fields.insert(
            FIELD_SEVERITY_TAG.to_string(),
            Value::String(family.tag().to_string()),
        );
        RawRuleOutput {
            namespace: "builtin.aws.s3.aws0092".to_string(),
            family,
            fields,
        }
    }

    fn s3_meta() -> PolicyMetadata {
        PolicyMetadata {
            id: "AVD-AWS-0092".to_string(),
            avd_id: "AVD-AWS-0092".to_string(),
            title: "S3 Bucket has an ACL defined which allows public access".to_string(),
            description: "Buckets should not have ACLs that allow public access".to_string(),
            service: "s3".to_string(),
            provider: "aws".to_string(),
            severity: "HIGH".to_string(),
            resolution: "Apply a more restrictive bucket ACL".to_string(),
            references: vec!["https://example.com/acl".to_string()],
            ..PolicyMetadata::default()
        }
    }

    #[test]
    fn maps_deny_output_with_metadata() {
        let output = raw(
            RuleFamily::Deny,
            json!({"msg": "public", "resource": "aws_s3_bucket.logs", "startline": 3, "endline": 3}),
        );
        let finding = map_output(&output, Some(&s3_meta()), &MapOptions::default());

        assert_eq!(finding.kind, "Terraform Security Check");
        assert_eq!(finding.id, "AVD-AWS-0092");
        assert_eq!(finding.message, "public");
        assert_eq!(finding.severity, "HIGH");
        assert_eq!(finding.status, FindingStatus::Fail);
        assert_eq!(finding.query, "data.builtin.aws.s3.aws0092.deny");
        assert_eq!(
            finding.primary_url,
            "https://avd.aquasec.com/misconfig/avd-aws-0092"
        );
        let cause = finding.cause_metadata.expect("cause");
        assert_eq!(cause.resource, "aws_s3_bucket.logs");
        assert_eq!(cause.provider, "aws");
        assert_eq!((cause.start_line, cause.end_line), (3, 3));
    }

    #[test]
    fn warn_family_maps_to_warn_status() {
        let output = raw(RuleFamily::Warn, json!({"msg": "soft"}));
        let finding = map_output(&output, Some(&s3_meta()), &MapOptions::default());
        assert_eq!(finding.status, FindingStatus::Warn);
        assert_eq!(finding.query, "data.builtin.aws.s3.aws0092.warn");
        assert!(finding.cause_metadata.is_none());
    }

    #[test]
    fn message_falls_back_to_message_then_description() {
        let meta = s3_meta();
        let from_message = map_output(
            &raw(RuleFamily::Deny, json!({"message": "alt"})),
            Some(&meta),
            &MapOptions::default(),
        );
        assert_eq!(from_message.message, "alt");

        let from_description = map_output(
            &raw(RuleFamily::Deny, json!({})),
            Some(&meta),
            &MapOptions::default(),
        );
        assert_eq!(from_description.message, meta.description);
    }

    #[test]
    fn unknown_namespace_uses_fallback_metadata() {
        let finding = map_output(
            &raw(RuleFamily::Violation, json!({"msg": "x", "startline": 2})),
            None,
            &MapOptions {
                reference_url_base: "https://docs.example.com/".to_string(),
            },
        );
        assert_eq!(finding.id, "builtin.aws.s3.aws0092");
        assert_eq!(finding.avd_id, "builtin.aws.s3.aws0092");
        assert_eq!(finding.title, "Security Check");
        assert_eq!(finding.severity, "MEDIUM");
        assert_eq!(
            finding.primary_url,
            "https://docs.example.com/builtin.aws.s3.aws0092"
        );
        let cause = finding.cause_metadata.expect("positive start line");
        assert!(cause.resource.is_empty());
        assert_eq!(cause.start_line, 2);
    }
}
