//! The `scan` use case: build documents, evaluate the corpus, produce reports.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use std::sync::Arc;
use tfsentry_document::{Cancellation, Document, DocumentBuilder};
use tfsentry_policy::{MapOptions, PolicyCorpus, evaluate_document, map_output};
use tfsentry_settings::{EffectiveSettings, ScanMode};
use tfsentry_target::{
    LoadedFile, Target, TargetError, artifact_name, code_excerpt, discover_config_files,
    load_file, load_merged, resolve_target,
};
use tfsentry_types::ids::{
    ARTIFACT_TYPE_TERRAFORM, RESULT_CLASS_CONFIG, RESULT_TYPE_TERRAFORM, SCHEMA_VERSION,
};
use tfsentry_types::{Finding, ScanReport, TargetResult, compare_findings};
use time::OffsetDateTime;
use tracing::{info, warn};

/// Load, compile, and index the corpus named by the settings.
pub fn init_corpus(settings: &EffectiveSettings) -> anyhow::Result<Arc<PolicyCorpus>> {
    let corpus = PolicyCorpus::build(&settings.corpus_roots(), settings.rego_version)
        .with_context(|| format!("load policies from {}", settings.policy_dir))?;
    Ok(Arc::new(corpus))
}

/// Input for the scan use case.
#[derive(Clone, Debug)]
pub struct ScanInput<'a> {
    /// File or directory to scan.
    pub target: &'a Utf8Path,
    pub settings: &'a EffectiveSettings,
    /// Shared with the caller so it can cancel the run; a fresh token is made when absent.
    pub cancel: Option<Cancellation>,
}

/// Output from the scan use case.
#[derive(Clone, Debug)]
pub struct ScanOutput {
    /// One report per scanned file (or one for a merged directory), sorted by artifact name.
    pub reports: Vec<ScanReport>,
    /// Files that could not be scanned, with the reason.
    pub skipped: Vec<(Utf8PathBuf, String)>,
}

pub fn run_scan(corpus: &PolicyCorpus, input: ScanInput<'_>) -> anyhow::Result<ScanOutput> {
    let settings = input.settings;
    let cancel = input.cancel.unwrap_or_else(|| match settings.timeout {
        Some(timeout) => Cancellation::with_timeout(timeout),
        None => Cancellation::new(),
    });
    let scanner = Scanner {
        corpus,
        settings,
        builder: DocumentBuilder::new()
            .with_source_metadata(settings.source_metadata)
            .with_cancellation(cancel.clone()),
        options: MapOptions {
            reference_url_base: settings.reference_url_base.clone(),
        },
        cancel,
    };

    let mut output = match resolve_target(input.target)? {
        Target::File(path) => ScanOutput {
            reports: vec![scanner.scan_file(&path)?],
            skipped: Vec::new(),
        },
        Target::Directory(dir) => {
            let files =
                discover_config_files(&dir, settings.file_order, &settings.exclude)?;
            if files.is_empty() {
                return Err(TargetError::NoConfigFiles { dir }.into());
            }
            match settings.mode {
                ScanMode::PerFile => scanner.scan_each(&dir, &files)?,
                ScanMode::Merged => scanner.scan_merged(&dir, &files)?,
            }
        }
    };

    output
        .reports
        .sort_by(|a, b| a.artifact_name.cmp(&b.artifact_name));

    let findings: usize = output.reports.iter().map(|r| r.findings().count()).sum();
    info!(
        target = %input.target,
        reports = output.reports.len(),
        skipped = output.skipped.len(),
        findings,
        "scan complete"
    );
    Ok(output)
}

struct Scanner<'a> {
    corpus: &'a PolicyCorpus,
    settings: &'a EffectiveSettings,
    builder: DocumentBuilder,
    options: MapOptions,
    cancel: Cancellation,
}

impl Scanner<'_> {
    fn scan_file(&self, path: &Utf8Path) -> anyhow::Result<ScanReport> {
        self.cancel.check().context("scan cancelled")?;
        let loaded = load_file(path, &self.builder)?;
        let mut findings = self.findings_for(&loaded.document, path)?;
        if self.settings.include_code {
            attach_code(&mut findings, &loaded);
        }
        let name = loaded.name();
        Ok(build_report(name.clone(), name, findings))
    }

    fn scan_each(&self, dir: &Utf8Path, files: &[Utf8PathBuf]) -> anyhow::Result<ScanOutput> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.jobs)
            .build()
            .context("build scan thread pool")?;

        let results: Vec<(Utf8PathBuf, anyhow::Result<ScanReport>)> = pool.install(|| {
            files
                .par_iter()
                .map(|path| (path.clone(), self.scan_file(path)))
                .collect()
        });

        let mut reports = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        for (path, result) in results {
            match result {
                Ok(report) => reports.push(report),
                Err(err) => {
                    warn!(path = %path, error = %format!("{err:#}"), "failed to scan file");
                    skipped.push((path, format!("{err:#}")));
                }
            }
        }

        if !skipped.is_empty() {
            self.cancel.check().context("scan cancelled")?;
        }
        if reports.is_empty() {
            return Err(TargetError::NoValidFiles {
                dir: dir.to_path_buf(),
            }
            .into());
        }
        Ok(ScanOutput { reports, skipped })
    }

    fn scan_merged(&self, dir: &Utf8Path, files: &[Utf8PathBuf]) -> anyhow::Result<ScanOutput> {
        let merged = load_merged(dir, files, &self.builder)?;
        let findings = self.findings_for(&merged.document, dir)?;
        let name = artifact_name(dir);
        Ok(ScanOutput {
            reports: vec![build_report(name.clone(), name, findings)],
            skipped: merged.skipped,
        })
    }

    fn findings_for(&self, document: &Document, path: &Utf8Path) -> anyhow::Result<Vec<Finding>> {
        let outputs = evaluate_document(self.corpus, document, &self.cancel)
            .with_context(|| format!("evaluate {path}"))?;
        let mut findings: Vec<Finding> = outputs
            .iter()
            .map(|raw| {
                map_output(
                    raw,
                    self.corpus.metadata_for_namespace(&raw.namespace),
                    &self.options,
                )
            })
            .collect();
        findings.sort_by(compare_findings);
        Ok(findings)
    }
}

fn attach_code(findings: &mut [Finding], loaded: &LoadedFile) {
    for finding in findings {
        if let Some(cause) = finding.cause_metadata.as_mut() {
            cause.code = code_excerpt(&loaded.source, cause.start_line, cause.end_line);
        }
    }
}

fn build_report(artifact_name: String, target: String, findings: Vec<Finding>) -> ScanReport {
    ScanReport {
        schema_version: SCHEMA_VERSION,
        created_at: OffsetDateTime::now_utc(),
        artifact_name,
        artifact_type: ARTIFACT_TYPE_TERRAFORM.to_string(),
        results: vec![TargetResult {
            target,
            class: RESULT_CLASS_CONFIG.to_string(),
            kind: RESULT_TYPE_TERRAFORM.to_string(),
            misconfigurations: findings,
        }],
    }
}
