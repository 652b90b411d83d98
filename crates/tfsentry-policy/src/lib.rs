//! Rego rule corpus handling.
//!
//! - [`loader`]: walk corpus roots and parse `.rego` modules
//! - [`annotations`] and [`metadata`]: `# METADATA` blocks into [`PolicyMetadata`](tfsentry_types::PolicyMetadata)
//! - [`compiler`]: defensive compilation that evicts failing modules
//! - [`calls`]: static resolution of function call targets
//! - [`corpus`]: the immutable compiled corpus shared by scans
//! - [`evaluate`]: query the `deny` / `violation` / `warn` families per namespace
//! - [`mapper`]: raw rule outputs into report findings
//!
//! Rule evaluation itself is delegated to `regorus`.

#![forbid(unsafe_code)]

pub mod annotations;
pub mod calls;
pub mod compiler;
pub mod corpus;
pub mod evaluate;
pub mod loader;
pub mod mapper;
pub mod metadata;
pub mod module;

pub use compiler::{
    CompileFailure, CompiledModules, CorpusCompiler, Eviction, RegoCompiler, compile_defensively,
};
pub use corpus::PolicyCorpus;
pub use evaluate::{RawRuleOutput, RuleFamily, evaluate_document};
pub use loader::{CorpusRoot, LoadedCorpus, load_corpus};
pub use mapper::{MapOptions, map_output};
pub use metadata::extract_metadata;
pub use module::{ModuleError, RegoVersion, RuleModule};

use camino::Utf8PathBuf;
use tfsentry_document::Cancelled;

/// Fatal corpus construction failures.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("policy directory not found: {path}")]
    MissingRoot { path: Utf8PathBuf },

    #[error("exactly one required policy root must be configured (found {required})")]
    InvalidRoots { required: usize },

    #[error("no policy files found")]
    NoModules,

    #[error("no policies compiled successfully")]
    NoPoliciesCompiled,

    #[error("compilation failed without naming a policy module: {message}")]
    UnattributableCompileError { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("convert document to rule input: {message}")]
    Input { message: String },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Fuzz-friendly API for testing parsing robustness.
pub mod fuzz {
    /// Parse arbitrary text for `# METADATA` blocks.
    ///
    /// Returns `Err(...)` for invalid input. **Never panics** on any input.
    pub fn parse_annotations(data: &[u8]) -> Result<(), String> {
        let text = std::str::from_utf8(data).map_err(|e| e.to_string())?;
        super::annotations::parse_annotations(text)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
