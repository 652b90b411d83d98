use crate::scan::init_corpus;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;
use tfsentry_policy::PolicyCorpus;
use tfsentry_settings::EffectiveSettings;

pub fn fixture_dir(rel: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(rel)
}

pub fn fixture_settings() -> EffectiveSettings {
    EffectiveSettings {
        policy_dir: fixture_dir("policies"),
        libraries: vec![fixture_dir("lib")],
        ..EffectiveSettings::default()
    }
}

/// The fixture corpus, compiled once per test binary.
pub fn fixture_corpus() -> Arc<PolicyCorpus> {
    static CORPUS: OnceLock<Arc<PolicyCorpus>> = OnceLock::new();
    CORPUS
        .get_or_init(|| init_corpus(&fixture_settings()).expect("fixture corpus"))
        .clone()
}

pub fn utf8_root(tmp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8 path")
}

pub fn write_file(path: &Utf8Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, contents).expect("write file");
}
