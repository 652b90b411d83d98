//! Filesystem adapter for scan targets.
//!
//! Resolves a user-supplied path into a single file or a directory of Terraform files,
//! reads them, and hands the bytes to [`tfsentry_document`].

#![forbid(unsafe_code)]

mod discover;
mod excerpt;

pub use discover::{CONFIG_SUFFIXES, FileOrder, discover_config_files, is_config_file};
pub use excerpt::code_excerpt;

use camino::{Utf8Path, Utf8PathBuf};
use tfsentry_document::{Document, DocumentBuilder, DocumentError, Syntax, merge_documents};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("target not found: {path}")]
    NotFound {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("target is neither a file nor a directory: {path}")]
    Unsupported { path: Utf8PathBuf },

    #[error("no Terraform files found in {dir}")]
    NoConfigFiles { dir: Utf8PathBuf },

    #[error("no valid Terraform files found in {dir}")]
    NoValidFiles { dir: Utf8PathBuf },

    #[error("read {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("list {dir}")]
    List {
        dir: Utf8PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid exclude pattern: {pattern}")]
    Exclude {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("parse {path}")]
    Document {
        path: Utf8PathBuf,
        #[source]
        source: DocumentError,
    },
}

impl TargetError {
    /// True when the failure came from cancellation rather than bad input.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            TargetError::Document {
                source: DocumentError::Cancelled(_),
                ..
            }
        )
    }
}

/// What a scan path points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    File(Utf8PathBuf),
    Directory(Utf8PathBuf),
}

impl Target {
    pub fn path(&self) -> &Utf8Path {
        match self {
            Target::File(p) | Target::Directory(p) => p,
        }
    }

    /// Name used for the report's artifact: the last path component.
    pub fn artifact_name(&self) -> String {
        artifact_name(self.path())
    }
}

pub fn artifact_name(path: &Utf8Path) -> String {
    path.file_name()
        .map(str::to_string)
        .unwrap_or_else(|| path.to_string())
}

pub fn resolve_target(path: &Utf8Path) -> Result<Target, TargetError> {
    let meta = std::fs::metadata(path).map_err(|source| TargetError::NotFound {
        path: path.to_path_buf(),
        source,
    })?;
    if meta.is_file() {
        Ok(Target::File(path.to_path_buf()))
    } else if meta.is_dir() {
        Ok(Target::Directory(path.to_path_buf()))
    } else {
        Err(TargetError::Unsupported {
            path: path.to_path_buf(),
        })
    }
}

/// One parsed configuration file together with its text (for code excerpts).
#[derive(Clone, Debug)]
pub struct LoadedFile {
    pub path: Utf8PathBuf,
    pub source: String,
    pub document: Document,
}

impl LoadedFile {
    pub fn name(&self) -> String {
        artifact_name(&self.path)
    }
}

pub fn load_file(path: &Utf8Path, builder: &DocumentBuilder) -> Result<LoadedFile, TargetError> {
    let bytes = std::fs::read(path).map_err(|source| TargetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document = builder
        .build(&bytes, Syntax::for_path(path.as_str()))
        .map_err(|source| TargetError::Document {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path, "built document");
    Ok(LoadedFile {
        path: path.to_path_buf(),
        source: String::from_utf8_lossy(&bytes).into_owned(),
        document,
    })
}

/// A directory's files merged into one logical document.
#[derive(Clone, Debug)]
pub struct MergedDirectory {
    pub dir: Utf8PathBuf,
    /// Files that contributed, in merge order.
    pub files: Vec<Utf8PathBuf>,
    /// Files that were read or parsed unsuccessfully, with the reason.
    pub skipped: Vec<(Utf8PathBuf, String)>,
    pub document: Document,
}

/// Build each file and merge the results in order.
///
/// Files that fail to read or parse are skipped with a warning; a directory where every
/// file fails is an error. Cancellation aborts the whole merge.
pub fn load_merged(
    dir: &Utf8Path,
    files: &[Utf8PathBuf],
    builder: &DocumentBuilder,
) -> Result<MergedDirectory, TargetError> {
    if files.is_empty() {
        return Err(TargetError::NoConfigFiles {
            dir: dir.to_path_buf(),
        });
    }

    let mut documents = Vec::with_capacity(files.len());
    let mut merged_files = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();

    for path in files {
        match load_file(path, builder) {
            Ok(loaded) => {
                merged_files.push(loaded.path);
                documents.push(loaded.document);
            }
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                let reason = error_chain(&err);
                warn!(path = %path, error = %reason, "skipping file that failed to load");
                skipped.push((path.clone(), reason));
            }
        }
    }

    if documents.is_empty() {
        return Err(TargetError::NoValidFiles {
            dir: dir.to_path_buf(),
        });
    }

    Ok(MergedDirectory {
        dir: dir.to_path_buf(),
        files: merged_files,
        skipped,
        document: merge_documents(documents),
    })
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tfsentry_document::{Cancellation, Value};

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
    fn resolves_files_and_directories() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        write_file(&root.join("main.tf"), "");

        assert_eq!(
            resolve_target(&root.join("main.tf")).expect("file"),
            Target::File(root.join("main.tf"))
        );
        assert_eq!(
            resolve_target(&root).expect("dir"),
            Target::Directory(root.clone())
        );
        assert!(matches!(
            resolve_target(&root.join("missing.tf")),
            Err(TargetError::NotFound { .. })
        ));
    }

    #[test]
    fn artifact_name_is_last_component() {
        assert_eq!(artifact_name(Utf8Path::new("infra/prod/main.tf")), "main.tf");
        assert_eq!(
            Target::Directory(Utf8PathBuf::from("infra/prod")).artifact_name(),
            "prod"
        );
    }

    #[test]
    fn load_file_keeps_source_text() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        let path = root.join("main.tf");
        write_file(&path, "resource \"aws_s3_bucket\" \"b\" {\n  acl = \"private\"\n}\n");

        let loaded = load_file(&path, &DocumentBuilder::new()).expect("load");
        assert!(loaded.source.contains("acl"));
        assert_eq!(loaded.name(), "main.tf");
        assert!(loaded.document.resource("aws_s3_bucket", "b").is_some());
    }

    #[test]
    fn load_file_picks_json_syntax_by_suffix() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        let path = root.join("main.tf.json");
        write_file(
            &path,
            r#"{"resource": {"aws_s3_bucket": {"b": {"acl": "private"}}}}"#,
        );

        let loaded = load_file(&path, &DocumentBuilder::new()).expect("load");
        let bucket = loaded
            .document
            .resource("aws_s3_bucket", "b")
            .expect("bucket");
        assert_eq!(bucket.get("acl"), Some(&Value::from("private")));
    }

    #[test]
    fn merge_skips_broken_files() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        write_file(
            &root.join("a.tf"),
            "resource \"aws_s3_bucket\" \"a\" {\n  acl = \"private\"\n}\n",
        );
        write_file(&root.join("b.tf"), "resource \"aws_s3_bucket\" {\n");
        write_file(
            &root.join("c.tf"),
            "resource \"aws_s3_bucket\" \"c\" {\n  acl = \"private\"\n}\n",
        );

        let files = discover_config_files(&root, FileOrder::Lexical, &[]).expect("discover");
        let merged = load_merged(&root, &files, &DocumentBuilder::new()).expect("merge");

        assert_eq!(merged.files.len(), 2);
        assert_eq!(merged.skipped.len(), 1);
        assert!(merged.skipped[0].0.as_str().ends_with("b.tf"));
        assert!(merged.document.resource("aws_s3_bucket", "a").is_some());
        assert!(merged.document.resource("aws_s3_bucket", "c").is_some());
    }

    #[test]
    fn merge_with_only_broken_files_fails() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        write_file(&root.join("a.tf"), "resource {\n");

        let files = discover_config_files(&root, FileOrder::Lexical, &[]).expect("discover");
        let err = load_merged(&root, &files, &DocumentBuilder::new()).expect_err("no valid");
        assert!(matches!(err, TargetError::NoValidFiles { .. }));
    }

    #[test]
    fn merge_of_empty_listing_fails() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        let err = load_merged(&root, &[], &DocumentBuilder::new()).expect_err("empty");
        assert_eq!(
            err.to_string(),
            format!("no Terraform files found in {root}")
        );
    }

    #[test]
    fn cancelled_merge_is_not_skipped() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        write_file(
            &root.join("a.tf"),
            "resource \"aws_s3_bucket\" \"a\" {\n  acl = \"private\"\n}\n",
        );

        let cancel = Cancellation::new();
        cancel.cancel();
        let builder = DocumentBuilder::new().with_cancellation(cancel);
        let files = discover_config_files(&root, FileOrder::Lexical, &[]).expect("discover");
        let err = load_merged(&root, &files, &builder).expect_err("cancelled");
        assert!(err.is_cancelled());
    }
}
