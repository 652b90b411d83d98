//! Defensive whole-corpus compilation.
//!
//! Compilation is all-or-nothing at the runtime level, so a single bad module would sink
//! the corpus. [`compile_defensively`] compiles, evicts the modules named by the error
//! locations, and retries over the shrinking set. Call sites naming unknown functions are
//! attributed to their modules before anything is evaluated.

use crate::CorpusError;
use crate::calls::unresolved_calls;
use crate::module::{RegoVersion, RuleModule};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// A failed compilation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileFailure {
    /// Source files named by the error locations.
    pub files: BTreeSet<String>,
    pub message: String,
}

/// Compiles a set of modules into something evaluable.
pub trait CorpusCompiler {
    type Output;

    fn compile(&self, modules: &[RuleModule]) -> Result<Self::Output, CompileFailure>;
}

/// A module dropped during compilation and the error that named it.
#[derive(Clone, Debug)]
pub struct Eviction {
    pub path: String,
    pub message: String,
}

#[derive(Debug)]
pub struct CompiledModules<O> {
    pub output: O,
    pub modules: Vec<RuleModule>,
    pub evicted: Vec<Eviction>,
}

pub fn compile_defensively<C: CorpusCompiler>(
    compiler: &C,
    mut modules: Vec<RuleModule>,
) -> Result<CompiledModules<C::Output>, CorpusError> {
    let mut evicted = Vec::new();
    let max_passes = modules.len() + 1;

    for pass in 1..=max_passes {
        if modules.is_empty() {
            return Err(CorpusError::NoPoliciesCompiled);
        }

        let failure = match compiler.compile(&modules) {
            Ok(output) => {
                debug!(pass, modules = modules.len(), "corpus compiled");
                return Ok(CompiledModules {
                    output,
                    modules,
                    evicted,
                });
            }
            Err(failure) => failure,
        };

        let (failed, kept): (Vec<RuleModule>, Vec<RuleModule>) = modules
            .into_iter()
            .partition(|m| failure.files.contains(m.path.as_str()));
        modules = kept;

        if failed.is_empty() {
            return Err(CorpusError::UnattributableCompileError {
                message: failure.message,
            });
        }

        warn!(
            pass,
            evicted = failed.len(),
            remaining = modules.len(),
            "policies failed to compile, removing them"
        );
        for module in failed {
            warn!(path = %module.path, error = %failure.message, "evicted policy module");
            evicted.push(Eviction {
                path: module.path.to_string(),
                message: failure.message.clone(),
            });
        }
    }

    Err(CorpusError::NoPoliciesCompiled)
}

/// Compiles with the `regorus` runtime into a ready-to-clone engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegoCompiler {
    pub version: RegoVersion,
}

impl RegoCompiler {
    pub fn new(version: RegoVersion) -> Self {
        Self { version }
    }
}

impl CorpusCompiler for RegoCompiler {
    type Output = regorus::Engine;

    fn compile(&self, modules: &[RuleModule]) -> Result<regorus::Engine, CompileFailure> {
        let mut engine = self.version.engine();

        for module in modules {
            if let Err(err) = engine.add_policy(module.path.to_string(), module.source.to_string())
            {
                let message = format!("{err:#}");
                let mut files = error_files(&format!("{err:?}"));
                files.insert(module.path.to_string());
                return Err(CompileFailure { files, message });
            }
        }

        // The runtime resolves calls lazily; a body guarded by `input` would hide a bad one.
        let unresolved = unresolved_calls(modules);
        if !unresolved.is_empty() {
            return Err(CompileFailure {
                files: unresolved.iter().map(|call| call.path.clone()).collect(),
                message: unresolved
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            });
        }

        // Rule resolution and imports happen on first evaluation.
        match engine.eval_query("data".to_string(), false) {
            Ok(_) => Ok(engine),
            Err(err) => Err(CompileFailure {
                files: error_files(&format!("{err:?}")),
                message: format!("{err:#}"),
            }),
        }
    }
}

/// Source files named by `--> file:line:col` location lines in a runtime error.
pub fn error_files(rendered: &str) -> BTreeSet<String> {
    rendered
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix("--> "))
        .filter_map(|location| {
            let mut parts = location.trim_end().rsplitn(3, ':');
            let col = parts.next()?;
            let line = parts.next()?;
            let file = parts.next()?;
            let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
            (numeric(col) && numeric(line)).then(|| file.to_string())
        })
        .collect()
}
