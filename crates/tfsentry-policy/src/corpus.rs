use crate::compiler::{Eviction, RegoCompiler, compile_defensively};
use crate::loader::{CorpusRoot, load_corpus};
use crate::metadata::extract_metadata;
use crate::module::{RegoVersion, RuleModule};
use crate::CorpusError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use tfsentry_types::PolicyMetadata;
use tracing::{info, warn};

/// A compiled, immutable rule corpus.
///
/// Built once per process and shared by reference (usually behind an `Arc`). Evaluation
/// never mutates the corpus: each caller gets its own clone of the compiled engine.
#[derive(Debug)]
pub struct PolicyCorpus {
    engine: Mutex<regorus::Engine>,
    modules: Vec<RuleModule>,
    namespaces: Vec<String>,
    metadata: BTreeMap<String, PolicyMetadata>,
    by_namespace: BTreeMap<String, String>,
    warnings: Vec<String>,
    evicted: Vec<Eviction>,
}

impl PolicyCorpus {
    /// Load, compile, and index every module under `roots`.
    pub fn build(roots: &[CorpusRoot], version: RegoVersion) -> Result<Self, CorpusError> {
        let loaded = load_corpus(roots, version)?;
        let mut corpus = Self::from_modules(loaded.modules, version)?;
        corpus.warnings.splice(0..0, loaded.warnings);
        Ok(corpus)
    }

    /// Compile already-parsed modules and index the metadata of those that survive.
    pub fn from_modules(modules: Vec<RuleModule>, version: RegoVersion) -> Result<Self, CorpusError> {
        let compiled = compile_defensively(&RegoCompiler::new(version), modules)?;
        let mut warnings: Vec<String> = compiled
            .evicted
            .iter()
            .map(|e| format!("evicted {}: {}", e.path, e.message))
            .collect();

        let namespaces: Vec<String> = compiled
            .modules
            .iter()
            .filter(|m| m.is_data_rooted())
            .map(|m| m.namespace().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut metadata = BTreeMap::new();
        let mut by_namespace = BTreeMap::new();
        for module in &compiled.modules {
            let Some(meta) = extract_metadata(module) else {
                continue;
            };
            by_namespace
                .entry(module.namespace().to_string())
                .or_insert_with(|| meta.id.clone());
            if metadata.contains_key(&meta.id) {
                let message = format!("duplicate policy id {} in {}", meta.id, module.path);
                warn!("{message}");
                warnings.push(message);
                continue;
            }
            metadata.insert(meta.id.clone(), meta);
        }

        info!(
            modules = compiled.modules.len(),
            evicted = compiled.evicted.len(),
            policies = metadata.len(),
            "compiled policy corpus"
        );

        Ok(Self {
            engine: Mutex::new(compiled.output),
            modules: compiled.modules,
            namespaces,
            metadata,
            by_namespace,
            warnings,
            evicted: compiled.evicted,
        })
    }

    /// A private copy of the compiled engine for one evaluation.
    pub fn engine(&self) -> regorus::Engine {
        match self.engine.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn modules(&self) -> &[RuleModule] {
        &self.modules
    }

    /// Distinct namespaces (package paths without `data.`), sorted.
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// Retained policy records, sorted by ID.
    pub fn policies(&self) -> impl Iterator<Item = &PolicyMetadata> {
        self.metadata.values()
    }

    pub fn policy(&self, id: &str) -> Option<&PolicyMetadata> {
        self.metadata.get(id)
    }

    pub fn metadata_for_namespace(&self, namespace: &str) -> Option<&PolicyMetadata> {
        self.by_namespace
            .get(namespace)
            .and_then(|id| self.metadata.get(id))
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn evicted(&self) -> &[Eviction] {
        &self.evicted
    }
}
