use crate::cancel::{Cancellation, Cancelled};
use crate::coerce::{coerce_expression, coerce_json, raw_source};
use crate::value::{Map, Value};
use hcl_edit::Span;
use hcl_edit::structure::{Block, BlockLabel, Body, Structure};
use serde::Serialize;
use std::ops::Range;
use tfsentry_types::ids::SOURCE_METADATA_KEY;
use tracing::{debug, trace};

/// Surface syntax of a configuration file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Syntax {
    /// Native HCL (`.tf`).
    Native,
    /// JSON variant (`.tf.json`).
    Json,
}

impl Syntax {
    pub fn for_path(path: &str) -> Self {
        if path.ends_with(".json") {
            Syntax::Json
        } else {
            Syntax::Native
        }
    }
}

/// Top-level block categories recognized by the builder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BlockCategory {
    Resource,
    Data,
    Variable,
    Output,
    Module,
    Provider,
    Terraform,
    Locals,
}

impl BlockCategory {
    pub const ALL: [BlockCategory; 8] = [
        BlockCategory::Resource,
        BlockCategory::Data,
        BlockCategory::Variable,
        BlockCategory::Output,
        BlockCategory::Module,
        BlockCategory::Provider,
        BlockCategory::Terraform,
        BlockCategory::Locals,
    ];

    pub fn from_identifier(ident: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == ident)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockCategory::Resource => "resource",
            BlockCategory::Data => "data",
            BlockCategory::Variable => "variable",
            BlockCategory::Output => "output",
            BlockCategory::Module => "module",
            BlockCategory::Provider => "provider",
            BlockCategory::Terraform => "terraform",
            BlockCategory::Locals => "locals",
        }
    }

    /// Number of labels a block of this category must carry.
    pub fn label_count(self) -> usize {
        match self {
            BlockCategory::Resource | BlockCategory::Data => 2,
            BlockCategory::Variable
            | BlockCategory::Output
            | BlockCategory::Module
            | BlockCategory::Provider => 1,
            BlockCategory::Terraform | BlockCategory::Locals => 0,
        }
    }

    /// Terraform-style address, e.g. `aws_s3_bucket.logs` or `var.region`.
    pub fn address(self, labels: &[&str]) -> String {
        let prefix = match self {
            BlockCategory::Resource => None,
            BlockCategory::Data => Some("data"),
            BlockCategory::Variable => Some("var"),
            BlockCategory::Output => Some("output"),
            BlockCategory::Module => Some("module"),
            BlockCategory::Provider => Some("provider"),
            BlockCategory::Terraform => Some("terraform"),
            BlockCategory::Locals => Some("local"),
        };
        prefix
            .into_iter()
            .chain(labels.iter().copied())
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("source is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("syntax error: {message}")]
    Syntax { message: String },
    #[error("invalid JSON configuration")]
    Json(#[from] serde_json::Error),
    #[error("JSON configuration root must be an object, found {found}")]
    JsonRoot { found: &'static str },
    #[error("`{category}` entry {path:?} must be an object, found {found}")]
    JsonShape {
        category: &'static str,
        path: Vec<String>,
        found: &'static str,
    },
    #[error("`{category}` block on line {line} expects {expected} label(s), found {found}")]
    Labels {
        category: &'static str,
        line: u32,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Generic value tree of one configuration file (or a merged directory).
///
/// Top-level keys are [`BlockCategory`] names; `resource` and `data` nest type then name.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document {
    root: Map,
}

impl Document {
    pub fn from_map(root: Map) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Map {
        &self.root
    }

    pub fn into_map(self) -> Map {
        self.root
    }

    pub fn into_value(self) -> Value {
        Value::Map(self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn category(&self, category: BlockCategory) -> Option<&Value> {
        self.root.get(category.as_str())
    }

    /// Body of a `resource` block.
    pub fn resource(&self, kind: &str, name: &str) -> Option<&Value> {
        self.category(BlockCategory::Resource)
            .and_then(|r| r.pointer([kind, name]))
    }
}

/// Builds [`Document`]s from raw configuration bytes.
#[derive(Clone, Debug)]
pub struct DocumentBuilder {
    source_metadata: bool,
    cancel: Option<Cancellation>,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self {
            source_metadata: true,
            cancel: None,
        }
    }
}

/// Build a document with default options (source metadata on, no cancellation).
pub fn build_document(source: &[u8], syntax: Syntax) -> Result<Document, DocumentError> {
    DocumentBuilder::default().build(source, syntax)
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach block/attribute positions under the reserved source metadata key.
    pub fn with_source_metadata(mut self, enabled: bool) -> Self {
        self.source_metadata = enabled;
        self
    }

    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Parse and normalize one file. Any syntax error abandons the whole file.
    pub fn build(&self, source: &[u8], syntax: Syntax) -> Result<Document, DocumentError> {
        let text = std::str::from_utf8(source)?;
        match syntax {
            Syntax::Native => self.build_native(text),
            Syntax::Json => self.build_json(text),
        }
    }

    fn check_cancelled(&self) -> Result<(), Cancelled> {
        match &self.cancel {
            Some(cancel) => cancel.check(),
            None => Ok(()),
        }
    }

    /// Source metadata is attached to labeled blocks only; in `locals` and `terraform`
    /// bodies the key would read as a declared member.
    fn records_source(&self, category: BlockCategory) -> bool {
        self.source_metadata && category.label_count() > 0
    }

    fn build_native(&self, text: &str) -> Result<Document, DocumentError> {
        let body = hcl_edit::parser::parse_body(text).map_err(|err| DocumentError::Syntax {
            message: err.to_string(),
        })?;

        let mut root = Map::new();
        for structure in body.iter() {
            self.check_cancelled()?;

            // Top-level attributes (e.g. in variable definition files) carry no blocks.
            let Structure::Block(block) = structure else {
                continue;
            };
            let ident = block.ident.value().as_str();
            let Some(category) = BlockCategory::from_identifier(ident) else {
                debug!(block = ident, "ignoring unrecognized top-level block");
                continue;
            };

            let labels: Vec<&str> = block.labels.iter().map(label_str).collect();
            if labels.len() != category.label_count() {
                return Err(DocumentError::Labels {
                    category: category.as_str(),
                    line: block.span().map(|s| line_at(text, s.start)).unwrap_or(0),
                    expected: category.label_count(),
                    found: labels.len(),
                });
            }

            let mut body = native_body(&block.body, text);
            if self.records_source(category) {
                body.insert(
                    SOURCE_METADATA_KEY.to_string(),
                    native_source_metadata(category, &labels, block, text),
                );
            }
            insert_block(&mut root, category, &labels, body);
        }

        Ok(Document { root })
    }

    fn build_json(&self, text: &str) -> Result<Document, DocumentError> {
        let parsed: serde_json::Value = serde_json::from_str(text)?;
        let top = match parsed {
            serde_json::Value::Object(top) => top,
            other => {
                return Err(DocumentError::JsonRoot {
                    found: json_kind(&other),
                });
            }
        };

        let mut root = Map::new();
        for (key, value) in top {
            self.check_cancelled()?;
            let Some(category) = BlockCategory::from_identifier(&key) else {
                debug!(block = %key, "ignoring unrecognized top-level key");
                continue;
            };

            let mut blocks = Vec::new();
            collect_json_blocks(
                category,
                value,
                category.label_count(),
                &mut Vec::new(),
                &mut blocks,
            )?;

            for (labels, object) in blocks {
                let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
                let mut body = match coerce_json(serde_json::Value::Object(object)) {
                    Value::Map(m) => m,
                    _ => Map::new(),
                };
                if self.records_source(category) {
                    let mut meta = Map::new();
                    meta.insert(
                        "address".to_string(),
                        Value::String(category.address(&labels)),
                    );
                    body.insert(SOURCE_METADATA_KEY.to_string(), Value::Map(meta));
                }
                insert_block(&mut root, category, &labels, body);
            }
        }

        Ok(Document { root })
    }
}

fn label_str(label: &BlockLabel) -> &str {
    match label {
        BlockLabel::Ident(ident) => ident.value().as_str(),
        BlockLabel::String(s) => s.value().as_str(),
    }
}

/// Attributes first, then nested blocks keyed by type (labels ignored).
///
/// A repeated nested block type turns into a list in source order.
fn native_body(body: &Body, text: &str) -> Map {
    let mut out = Map::new();

    for structure in body.iter() {
        if let Structure::Attribute(attr) = structure {
            let key = attr.key.value().as_str();
            let value = match coerce_expression(&attr.value) {
                Ok(value) => value,
                Err(reason) => {
                    trace!(attribute = key, %reason, "keeping raw expression text");
                    Value::String(raw_source(&attr.value, text))
                }
            };
            out.insert(key.to_string(), value);
        }
    }

    for structure in body.iter() {
        if let Structure::Block(nested) = structure {
            let value = Value::Map(native_body(&nested.body, text));
            push_repeated(&mut out, nested.ident.value().as_str(), value);
        }
    }

    out
}

fn push_repeated(map: &mut Map, key: &str, value: Value) {
    match map.remove(key) {
        None => {
            map.insert(key.to_string(), value);
        }
        Some(Value::List(mut items)) => {
            items.push(value);
            map.insert(key.to_string(), Value::List(items));
        }
        Some(existing) => {
            map.insert(key.to_string(), Value::List(vec![existing, value]));
        }
    }
}

fn insert_block(root: &mut Map, category: BlockCategory, labels: &[&str], body: Map) {
    let body = Value::Map(body);
    let key = category.as_str();
    match labels {
        [] => {
            root.insert(key.to_string(), body);
        }
        [name] => {
            let mut group = take_map(root, key);
            group.insert((*name).to_string(), body);
            root.insert(key.to_string(), Value::Map(group));
        }
        [kind, name, ..] => {
            let mut group = take_map(root, key);
            let mut of_kind = take_map(&mut group, kind);
            of_kind.insert((*name).to_string(), body);
            group.insert((*kind).to_string(), Value::Map(of_kind));
            root.insert(key.to_string(), Value::Map(group));
        }
    }
}

fn take_map(map: &mut Map, key: &str) -> Map {
    match map.remove(key) {
        Some(Value::Map(m)) => m,
        _ => Map::new(),
    }
}

fn native_source_metadata(
    category: BlockCategory,
    labels: &[&str],
    block: &Block,
    text: &str,
) -> Value {
    let mut meta = Map::new();
    meta.insert(
        "address".to_string(),
        Value::String(category.address(labels)),
    );
    if let Some(span) = block.span() {
        insert_line_range(&mut meta, text, span);
    }

    let mut attributes = Map::new();
    for structure in block.body.iter() {
        if let Structure::Attribute(attr) = structure
            && let Some(span) = attr.span()
        {
            let mut range = Map::new();
            insert_line_range(&mut range, text, span);
            attributes.insert(attr.key.value().as_str().to_string(), Value::Map(range));
        }
    }
    meta.insert("attributes".to_string(), Value::Map(attributes));

    Value::Map(meta)
}

fn insert_line_range(map: &mut Map, text: &str, span: Range<usize>) {
    let start = line_at(text, span.start);
    let end = line_at(text, span.end.saturating_sub(1).max(span.start));
    map.insert("startline".to_string(), Value::from(start));
    map.insert("endline".to_string(), Value::from(end.max(start)));
}

/// 1-based line number of a byte offset.
pub(crate) fn line_at(text: &str, offset: usize) -> u32 {
    let bytes = text.as_bytes();
    let newlines = bytes[..offset.min(bytes.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count();
    (newlines + 1) as u32
}

fn collect_json_blocks(
    category: BlockCategory,
    value: serde_json::Value,
    depth: usize,
    labels: &mut Vec<String>,
    out: &mut Vec<(Vec<String>, serde_json::Map<String, serde_json::Value>)>,
) -> Result<(), DocumentError> {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_json_blocks(category, item, depth, labels, out)?;
            }
            Ok(())
        }
        serde_json::Value::Object(object) if depth == 0 => {
            out.push((labels.clone(), object));
            Ok(())
        }
        serde_json::Value::Object(object) => {
            for (label, child) in object {
                labels.push(label);
                collect_json_blocks(category, child, depth - 1, labels, out)?;
                labels.pop();
            }
            Ok(())
        }
        other => Err(DocumentError::JsonShape {
            category: category.as_str(),
            path: labels.clone(),
            found: json_kind(&other),
        }),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
