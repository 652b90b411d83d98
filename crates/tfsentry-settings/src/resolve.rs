use crate::model::TfsentryConfigV1;
use anyhow::Context;
use camino::Utf8PathBuf;
use globset::Glob;
use std::time::Duration;
use tfsentry_policy::{CorpusRoot, RegoVersion};
use tfsentry_target::FileOrder;
use tfsentry_types::ids::DEFAULT_REFERENCE_URL_BASE;

pub const DEFAULT_POLICY_DIR: &str = "policies";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// How a directory target is scanned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScanMode {
    /// One report per file; files are independent work units.
    #[default]
    PerFile,
    /// All files merged into one document and one report.
    Merged,
}

/// Which findings fail the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailOn {
    #[default]
    Fail,
    Warn,
    Never,
}

/// Values supplied outside the config file, highest precedence first.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub policy_dir: Option<String>,
    /// `POLICY_DIR` from the environment; loses to `policy_dir`, beats the file.
    pub env_policy_dir: Option<String>,
    pub libraries: Vec<String>,
    pub mode: Option<String>,
    pub jobs: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub fail_on: Option<String>,
    pub exclude: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub policy_dir: Utf8PathBuf,
    pub libraries: Vec<Utf8PathBuf>,
    pub rego_version: RegoVersion,
    pub mode: ScanMode,
    pub jobs: usize,
    /// `None` disables the deadline.
    pub timeout: Option<Duration>,
    pub file_order: FileOrder,
    pub exclude: Vec<String>,
    pub source_metadata: bool,
    pub fail_on: FailOn,
    pub reference_url_base: String,
    pub include_code: bool,
}

impl Default for EffectiveSettings {
    fn default() -> Self {
        let policy_dir = Utf8PathBuf::from(DEFAULT_POLICY_DIR);
        Self {
            libraries: vec![default_library(&policy_dir)],
            policy_dir,
            rego_version: RegoVersion::default(),
            mode: ScanMode::default(),
            jobs: 0,
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            file_order: FileOrder::default(),
            exclude: Vec::new(),
            source_metadata: true,
            fail_on: FailOn::default(),
            reference_url_base: DEFAULT_REFERENCE_URL_BASE.to_string(),
            include_code: true,
        }
    }
}

impl EffectiveSettings {
    /// Library roots (optional) followed by the policy root (required).
    pub fn corpus_roots(&self) -> Vec<CorpusRoot> {
        self.libraries
            .iter()
            .cloned()
            .map(CorpusRoot::optional)
            .chain(std::iter::once(CorpusRoot::required(self.policy_dir.clone())))
            .collect()
    }
}

fn default_library(policy_dir: &Utf8PathBuf) -> Utf8PathBuf {
    policy_dir.join("..").join("lib")
}

pub fn resolve_config(
    cfg: TfsentryConfigV1,
    overrides: Overrides,
) -> anyhow::Result<EffectiveSettings> {
    let mut effective = EffectiveSettings::default();

    // Policy roots
    let policy_dir = overrides
        .policy_dir
        .or(overrides.env_policy_dir)
        .or(cfg.policies.dir)
        .unwrap_or_else(|| DEFAULT_POLICY_DIR.to_string());
    effective.policy_dir = Utf8PathBuf::from(policy_dir);

    effective.libraries = if !overrides.libraries.is_empty() {
        overrides.libraries.into_iter().map(Utf8PathBuf::from).collect()
    } else if let Some(libraries) = cfg.policies.libraries {
        libraries.into_iter().map(Utf8PathBuf::from).collect()
    } else {
        vec![default_library(&effective.policy_dir)]
    };

    if let Some(version) = cfg.policies.rego_version.as_deref() {
        effective.rego_version = parse_rego_version(version)?;
    }

    // Scan
    if let Some(mode) = overrides.mode.or(cfg.scan.mode) {
        effective.mode = parse_scan_mode(&mode)?;
    }
    if let Some(jobs) = overrides.jobs.or(cfg.scan.jobs) {
        effective.jobs = jobs;
    }
    if let Some(secs) = overrides.timeout_secs.or(cfg.scan.timeout_secs) {
        effective.timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if let Some(order) = cfg.scan.file_order.as_deref() {
        effective.file_order = parse_file_order(order)?;
    }
    effective.exclude = cfg.scan.exclude;
    effective.exclude.extend(overrides.exclude);
    validate_globs(&effective.exclude)?;
    if let Some(source_metadata) = cfg.scan.source_metadata {
        effective.source_metadata = source_metadata;
    }

    // Report
    if let Some(fail_on) = overrides.fail_on.or(cfg.report.fail_on) {
        effective.fail_on = parse_fail_on(&fail_on)?;
    }
    if let Some(base) = cfg.report.reference_url_base {
        effective.reference_url_base = base;
    }
    if let Some(include_code) = cfg.report.include_code {
        effective.include_code = include_code;
    }

    Ok(effective)
}

fn validate_globs(patterns: &[String]) -> anyhow::Result<()> {
    for pattern in patterns {
        Glob::new(pattern).with_context(|| format!("invalid exclude glob: {pattern}"))?;
    }
    Ok(())
}

pub fn parse_scan_mode(v: &str) -> anyhow::Result<ScanMode> {
    match v {
        "per-file" | "file" => Ok(ScanMode::PerFile),
        "merged" | "directory" => Ok(ScanMode::Merged),
        other => anyhow::bail!("unknown scan mode: {other} (expected per-file|merged)"),
    }
}

pub fn parse_fail_on(v: &str) -> anyhow::Result<FailOn> {
    match v {
        "fail" | "error" => Ok(FailOn::Fail),
        "warn" | "warning" => Ok(FailOn::Warn),
        "never" => Ok(FailOn::Never),
        other => anyhow::bail!("unknown fail_on: {other} (expected fail|warn|never)"),
    }
}

fn parse_file_order(v: &str) -> anyhow::Result<FileOrder> {
    match v {
        "lexical" => Ok(FileOrder::Lexical),
        "listing" => Ok(FileOrder::Listing),
        other => anyhow::bail!("unknown file_order: {other} (expected lexical|listing)"),
    }
}

fn parse_rego_version(v: &str) -> anyhow::Result<RegoVersion> {
    match v {
        "v1" => Ok(RegoVersion::V1),
        "v0" => Ok(RegoVersion::V0),
        other => anyhow::bail!("unknown rego_version: {other} (expected v1|v0)"),
    }
}
