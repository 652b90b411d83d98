use crate::CorpusError;
use crate::module::{RegoVersion, RuleModule};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const REGO_SUFFIX: &str = ".rego";
pub const REGO_TEST_SUFFIX: &str = "_test.rego";

/// One directory of rule modules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorpusRoot {
    pub path: Utf8PathBuf,
    /// A missing required root is fatal; a missing optional root is skipped.
    pub required: bool,
}

impl CorpusRoot {
    pub fn required(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: true,
        }
    }

    pub fn optional(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: false,
        }
    }
}

/// Parsed modules plus the per-file problems that were skipped over.
#[derive(Clone, Debug, Default)]
pub struct LoadedCorpus {
    pub modules: Vec<RuleModule>,
    pub warnings: Vec<String>,
    /// Modules loaded per root, in root order.
    pub counts: Vec<(Utf8PathBuf, usize)>,
}

pub fn is_rule_file(name: &str) -> bool {
    name.ends_with(REGO_SUFFIX) && !name.ends_with(REGO_TEST_SUFFIX)
}

/// Walk every root and parse the rule modules found there.
///
/// Exactly one root must be required. Files are visited in file-name order.
pub fn load_corpus(roots: &[CorpusRoot], version: RegoVersion) -> Result<LoadedCorpus, CorpusError> {
    let required = roots.iter().filter(|r| r.required).count();
    if required != 1 {
        return Err(CorpusError::InvalidRoots { required });
    }

    let mut corpus = LoadedCorpus::default();

    for root in roots {
        if !root.path.is_dir() {
            if root.required {
                return Err(CorpusError::MissingRoot {
                    path: root.path.clone(),
                });
            }
            debug!(root = %root.path, "optional policy root not found, skipping");
            continue;
        }

        let count = load_root(&root.path, version, &mut corpus);
        info!(root = %root.path, modules = count, "loaded policy modules");
        corpus.counts.push((root.path.clone(), count));
    }

    if corpus.modules.is_empty() {
        return Err(CorpusError::NoModules);
    }

    info!(modules = corpus.modules.len(), "loaded policy corpus");
    Ok(corpus)
}

fn load_root(root: &Utf8Path, version: RegoVersion, corpus: &mut LoadedCorpus) -> usize {
    let mut count = 0;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                corpus.push_warning(format!("walk {root}: {err}"));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
            continue;
        };
        if !path.file_name().is_some_and(is_rule_file) {
            continue;
        }

        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) => {
                corpus.push_warning(format!("failed to read {path}: {err}"));
                continue;
            }
        };

        match RuleModule::parse(&path, source, version) {
            Ok(module) => {
                debug!(path = %path, package = %module.package, "parsed policy module");
                corpus.modules.push(module);
                count += 1;
            }
            Err(err) => corpus.push_warning(format!("failed to parse {path}: {err}")),
        }
    }

    count
}

impl LoadedCorpus {
    fn push_warning(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8_root(tmp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8 path")
    }

    fn write_file(path: &Utf8Path, contents: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, contents).expect("write file");
    }

    #[test]
    fn selects_rule_files_recursively_in_order() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        write_file(&root.join("policies/cloud/b/b.rego"), "package b\n");
        write_file(&root.join("policies/cloud/a.rego"), "package a\n");
        write_file(&root.join("policies/cloud/a_test.rego"), "package a_test\n");
        write_file(&root.join("policies/cloud/notes.md"), "# notes\n");

        let corpus = load_corpus(
            &[CorpusRoot::required(root.join("policies"))],
            RegoVersion::V1,
        )
        .expect("load");
        let packages: Vec<&str> = corpus.modules.iter().map(|m| m.package.as_str()).collect();
        assert_eq!(packages, vec!["data.a", "data.b"]);
        assert!(corpus.warnings.is_empty());
    }

    #[test]
    fn parse_failures_are_warnings() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        write_file(&root.join("p/good.rego"), "package good\n");
        write_file(&root.join("p/broken.rego"), "package\n");

        let corpus =
            load_corpus(&[CorpusRoot::required(root.join("p"))], RegoVersion::V1).expect("load");
        assert_eq!(corpus.modules.len(), 1);
        assert_eq!(corpus.warnings.len(), 1);
        assert!(corpus.warnings[0].contains("broken.rego"));
    }

    #[test]
    fn optional_roots_may_be_missing() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        write_file(&root.join("p/a.rego"), "package a\n");

        let corpus = load_corpus(
            &[
                CorpusRoot::optional(root.join("lib")),
                CorpusRoot::required(root.join("p")),
            ],
            RegoVersion::V1,
        )
        .expect("load");
        assert_eq!(corpus.counts, vec![(root.join("p"), 1)]);
    }

    #[test]
    fn library_modules_load_before_policies() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        write_file(&root.join("lib/util.rego"), "package lib.util\n");
        write_file(&root.join("p/a.rego"), "package a\n");

        let corpus = load_corpus(
            &[
                CorpusRoot::optional(root.join("lib")),
                CorpusRoot::required(root.join("p")),
            ],
            RegoVersion::V1,
        )
        .expect("load");
        let packages: Vec<&str> = corpus.modules.iter().map(|m| m.package.as_str()).collect();
        assert_eq!(packages, vec!["data.lib.util", "data.a"]);
    }

    #[test]
    fn missing_required_root_is_fatal() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        let err = load_corpus(&[CorpusRoot::required(root.join("nope"))], RegoVersion::V1)
            .expect_err("missing");
        assert!(matches!(err, CorpusError::MissingRoot { .. }));
    }

    #[test]
    fn exactly_one_required_root() {
        let err = load_corpus(&[CorpusRoot::optional("a")], RegoVersion::V1).expect_err("none");
        assert!(matches!(err, CorpusError::InvalidRoots { required: 0 }));

        let err = load_corpus(
            &[CorpusRoot::required("a"), CorpusRoot::required("b")],
            RegoVersion::V1,
        )
        .expect_err("two");
        assert!(matches!(err, CorpusError::InvalidRoots { required: 2 }));
    }

    #[test]
    fn empty_corpus_is_fatal() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        write_file(&root.join("p/only_test.rego"), "package t\n");
        let err = load_corpus(&[CorpusRoot::required(root.join("p"))], RegoVersion::V1)
            .expect_err("no modules");
        assert!(matches!(err, CorpusError::NoModules));
    }
}
