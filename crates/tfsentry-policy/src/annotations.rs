//! `# METADATA` comment blocks embedded in rule modules.
//!
//! A block starts at a line that is exactly `# METADATA` and continues over the following
//! comment lines. Its body is YAML. When the block carries no `scope` key the scope is
//! inferred from what follows it: `package` for a block directly above the package clause,
//! `rule` otherwise.

use serde_json::{Map, Value};

const MARKER: &str = "# METADATA";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnotationScope {
    Package,
    Rule,
    Other(String),
}

impl AnnotationScope {
    fn parse(raw: &str) -> Self {
        match raw {
            "package" => AnnotationScope::Package,
            "rule" => AnnotationScope::Rule,
            other => AnnotationScope::Other(other.to_string()),
        }
    }

    /// Scopes that contribute policy metadata.
    pub fn is_policy_scope(&self) -> bool {
        matches!(self, AnnotationScope::Package | AnnotationScope::Rule)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub scope: AnnotationScope,
    /// 1-based line of the `# METADATA` marker.
    pub line: usize,
    pub fields: Map<String, Value>,
}

impl Annotation {
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn custom(&self) -> Option<&Map<String, Value>> {
        self.fields.get("custom").and_then(Value::as_object)
    }

    pub fn custom_str(&self, key: &str) -> Option<&str> {
        self.custom()
            .and_then(|custom| custom.get(key))
            .and_then(Value::as_str)
    }

    /// `related_resources` entries: either bare URLs or `{ref, description}` objects.
    pub fn related_resources(&self) -> Vec<String> {
        let Some(items) = self.fields.get("related_resources").and_then(Value::as_array) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj.get("ref").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("line {line}: invalid METADATA block")]
    Yaml {
        line: usize,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("line {line}: METADATA block must be a mapping, found {found}")]
    NotMapping { line: usize, found: &'static str },
}

pub fn parse_annotations(source: &str) -> Result<Vec<Annotation>, AnnotationError> {
    let lines: Vec<&str> = source.lines().collect();
    let mut out = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        if lines[idx].trim() != MARKER {
            idx += 1;
            continue;
        }

        let marker_line = idx + 1;
        let mut end = idx + 1;
        let mut body = Vec::new();
        while let Some(line) = lines.get(end) {
            let Some(comment) = line.trim_start().strip_prefix('#') else {
                break;
            };
            body.push(comment.strip_prefix(' ').unwrap_or(comment));
            end += 1;
        }

        let next_code = lines[end..].iter().find(|l| !l.trim().is_empty());
        let inferred = match next_code {
            Some(line) if line.trim_start().starts_with("package ") => AnnotationScope::Package,
            _ => AnnotationScope::Rule,
        };

        let fields = parse_block(&body.join("\n"), marker_line)?;
        let scope = fields
            .get("scope")
            .and_then(Value::as_str)
            .map(AnnotationScope::parse)
            .unwrap_or(inferred);

        out.push(Annotation {
            scope,
            line: marker_line,
            fields,
        });
        idx = end;
    }

    Ok(out)
}

fn parse_block(yaml: &str, line: usize) -> Result<Map<String, Value>, AnnotationError> {
    if yaml.trim().is_empty() {
        return Ok(Map::new());
    }
    let value: Value =
        serde_yaml::from_str(yaml).map_err(|source| AnnotationError::Yaml { line, source })?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(AnnotationError::NotMapping {
            line,
            found: json_kind(&other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
