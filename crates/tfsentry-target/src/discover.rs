use crate::TargetError;
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

/// File suffixes recognized as Terraform configuration.
pub const CONFIG_SUFFIXES: [&str; 2] = [".tf", ".tf.json"];

/// Order in which a directory's files are visited (and therefore merged).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FileOrder {
    /// Sorted by file name; reproducible across platforms.
    #[default]
    Lexical,
    /// Whatever order the directory listing returns.
    Listing,
}

pub fn is_config_file(name: &str) -> bool {
    CONFIG_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// List the configuration files directly inside `dir` (no recursion).
///
/// `exclude` globs are matched against the file name.
pub fn discover_config_files(
    dir: &Utf8Path,
    order: FileOrder,
    exclude: &[String],
) -> Result<Vec<Utf8PathBuf>, TargetError> {
    let excluded = build_globset(exclude)?;

    let mut walker = WalkDir::new(dir).min_depth(1).max_depth(1);
    if order == FileOrder::Lexical {
        walker = walker.sort_by_file_name();
    }

    let mut out = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| TargetError::List {
            dir: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(path) = Utf8PathBuf::from_path_buf(entry.into_path()).ok() else {
            continue;
        };
        let Some(name) = path.file_name() else {
            continue;
        };
        if !is_config_file(name) {
            continue;
        }
        if excluded.is_match(name) {
            debug!(path = %path, "excluded by pattern");
            continue;
        }
        out.push(path);
    }

    Ok(out)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, TargetError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| TargetError::Exclude {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| TargetError::Exclude {
        pattern: patterns.join(","),
        source,
    })
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

    fn names(paths: &[Utf8PathBuf]) -> Vec<&str> {
        paths.iter().filter_map(|p| p.file_name()).collect()
    }

    #[test]
    fn lists_only_config_files_in_lexical_order() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        write_file(&root.join("variables.tf"), "");
        write_file(&root.join("main.tf"), "");
        write_file(&root.join("override.tf.json"), "{}");
        write_file(&root.join("README.md"), "");
        write_file(&root.join("terraform.tfvars"), "");
        write_file(&root.join("modules/vpc/main.tf"), "");

        let files = discover_config_files(&root, FileOrder::Lexical, &[]).expect("discover");
        assert_eq!(names(&files), vec!["main.tf", "override.tf.json", "variables.tf"]);
    }

    #[test]
    fn exclude_patterns_apply_to_file_names() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        write_file(&root.join("main.tf"), "");
        write_file(&root.join("generated_override.tf"), "");

        let files = discover_config_files(
            &root,
            FileOrder::Lexical,
            &["*_override.tf".to_string()],
        )
        .expect("discover");
        assert_eq!(names(&files), vec!["main.tf"]);
    }

    #[test]
    fn listing_order_returns_the_same_set() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        write_file(&root.join("b.tf"), "");
        write_file(&root.join("a.tf"), "");

        let mut files = discover_config_files(&root, FileOrder::Listing, &[]).expect("discover");
        files.sort();
        assert_eq!(names(&files), vec!["a.tf", "b.tf"]);
    }

    #[test]
    fn invalid_exclude_pattern_is_rejected() {
        let tmp = TempDir::new().expect("temp dir");
        let root = utf8_root(&tmp);
        let err = discover_config_files(&root, FileOrder::Lexical, &["[".to_string()])
            .expect_err("bad glob");
        assert!(matches!(err, TargetError::Exclude { .. }));
    }

    #[test]
    fn suffix_detection() {
        assert!(is_config_file("main.tf"));
        assert!(is_config_file("main.tf.json"));
        assert!(!is_config_file("main.tfvars"));
        assert!(!is_config_file("main.json"));
    }
}
