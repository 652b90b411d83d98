use crate::annotations::{Annotation, AnnotationError, parse_annotations};
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use tfsentry_types::ids::DATA_ROOT_PREFIX;

/// Rego syntax dialect accepted by the runtime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegoVersion {
    /// `import rego.v1` semantics (`contains`/`if` keywords required).
    #[default]
    V1,
    /// Legacy syntax (`deny[msg] { ... }`).
    V0,
}

impl RegoVersion {
    pub fn engine(self) -> regorus::Engine {
        let mut engine = regorus::Engine::new();
        engine.set_rego_v0(self == RegoVersion::V0);
        engine
    }
}

/// A parsed rule module.
#[derive(Clone, Debug)]
pub struct RuleModule {
    pub path: Utf8PathBuf,
    pub source: Arc<str>,
    /// `data.`-prefixed package path as reported by the runtime.
    pub package: String,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("{message}")]
    Syntax { message: String },

    #[error(transparent)]
    Annotations(#[from] AnnotationError),
}

impl RuleModule {
    pub fn parse(
        path: &Utf8Path,
        source: impl Into<Arc<str>>,
        version: RegoVersion,
    ) -> Result<Self, ModuleError> {
        let source: Arc<str> = source.into();
        let mut engine = version.engine();
        let package = engine
            .add_policy(path.to_string(), source.to_string())
            .map_err(|err| ModuleError::Syntax {
                message: format!("{err:#}"),
            })?;
        let annotations = parse_annotations(&source)?;

        Ok(Self {
            path: path.to_path_buf(),
            source,
            package,
            annotations,
        })
    }

    /// Package path without the `data.` prefix, e.g. `builtin.aws.s3.aws0092`.
    pub fn namespace(&self) -> &str {
        self.package
            .strip_prefix(DATA_ROOT_PREFIX)
            .unwrap_or(&self.package)
    }

    /// Runtime-qualified package (`data.` prefix present).
    pub fn is_data_rooted(&self) -> bool {
        self.package.starts_with(DATA_ROOT_PREFIX)
    }
}
