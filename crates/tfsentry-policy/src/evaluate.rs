use crate::EvaluationError;
use crate::corpus::PolicyCorpus;
use serde_json::{Map, Value};
use tfsentry_document::{Cancellation, Document};
use tfsentry_types::ids::{
    FIELD_MSG, FIELD_SEVERITY_TAG, RULE_DENY, RULE_VIOLATION, RULE_WARN, TAG_FAIL, TAG_WARN,
};
use tracing::{debug, warn};

/// The predicate families queried in every namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleFamily {
    Deny,
    Violation,
    Warn,
}

impl RuleFamily {
    pub const ALL: [RuleFamily; 3] = [RuleFamily::Deny, RuleFamily::Violation, RuleFamily::Warn];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleFamily::Deny => RULE_DENY,
            RuleFamily::Violation => RULE_VIOLATION,
            RuleFamily::Warn => RULE_WARN,
        }
    }

    /// `FAIL` for deny/violation, `WARN` for warn.
    pub fn tag(self) -> &'static str {
        match self {
            RuleFamily::Deny | RuleFamily::Violation => TAG_FAIL,
            RuleFamily::Warn => TAG_WARN,
        }
    }

    pub fn query(self, namespace: &str) -> String {
        format!("data.{namespace}.{}", self.as_str())
    }
}

/// One object produced by a rule, tagged with where it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct RawRuleOutput {
    pub namespace: String,
    pub family: RuleFamily,
    pub fields: Map<String, Value>,
}

impl RawRuleOutput {
    pub fn query(&self) -> String {
        self.family.query(&self.namespace)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn line_field(&self, key: &str) -> u32 {
        self.fields
            .get(key)
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite() && *n > 0.0)
            .map(|n| n.min(f64::from(u32::MAX)) as u32)
            .unwrap_or(0)
    }
}

/// Evaluate every namespace of the corpus against one document.
///
/// A failing family query is logged and contributes nothing; cancellation stops the whole
/// evaluation.
pub fn evaluate_document(
    corpus: &PolicyCorpus,
    document: &Document,
    cancel: &Cancellation,
) -> Result<Vec<RawRuleOutput>, EvaluationError> {
    let json = serde_json::to_string(document)
        .map_err(|err| EvaluationError::Input { message: err.to_string() })?;
    let input = regorus::Value::from_json_str(&json)
        .map_err(|err| EvaluationError::Input { message: format!("{err:#}") })?;

    let mut engine = corpus.engine();
    engine.set_input(input);

    let mut outputs = Vec::new();
    for namespace in corpus.namespaces() {
        cancel.check()?;
        for family in RuleFamily::ALL {
            let query = family.query(namespace);
            let results = match engine.eval_query(query.clone(), false) {
                Ok(results) => results,
                Err(err) => {
                    warn!(query = %query, error = %format!("{err:#}"), "rule evaluation failed");
                    continue;
                }
            };

            let before = outputs.len();
            for result in results.result {
                for expression in result.expressions {
                    if expression.value == regorus::Value::Undefined {
                        continue;
                    }
                    match serde_json::to_value(&expression.value) {
                        Ok(value) => collect_outputs(namespace, family, value, &mut outputs),
                        Err(err) => warn!(query = %query, error = %err, "unreadable rule output"),
                    }
                }
            }
            if outputs.len() > before {
                debug!(query = %query, count = outputs.len() - before, "rule produced output");
            }
        }
    }

    Ok(outputs)
}

/// Flatten a rule value into tagged outputs: a set or array yields one output per member.
pub fn collect_outputs(
    namespace: &str,
    family: RuleFamily,
    value: Value,
    out: &mut Vec<RawRuleOutput>,
) {
    match value {
        Value::Array(items) => {
            for item in items {
                push_output(namespace, family, item, out);
            }
        }
        other => push_output(namespace, family, other, out),
    }
}

fn push_output(namespace: &str, family: RuleFamily, item: Value, out: &mut Vec<RawRuleOutput>) {
    let mut fields = match item {
        Value::Object(fields) => fields,
        Value::String(msg) => {
            let mut fields = Map::new();
            fields.insert(FIELD_MSG.to_string(), Value::String(msg));
            fields
        }
        other => {
            debug!(namespace, family = family.as_str(), value = %other, "ignoring non-object rule output");
            return;
        }
    };
    fields.insert(
        FIELD_SEVERITY_TAG.to_string(),
        Value::String(family.tag().to_string()),
    );
    out.push(RawRuleOutput {
        namespace: namespace.to_string(),
        family,
        fields,
    });
}
