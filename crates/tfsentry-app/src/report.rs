//! Report (de)serialization, verdicts, and conversion to the render model.

use anyhow::Context;
use tfsentry_render::{
    RenderableData, RenderableFinding, RenderableLocation, RenderableReport, RenderableStatus,
    RenderableVerdictStatus,
};
use tfsentry_settings::FailOn;
use tfsentry_types::{Finding, FindingStatus, ScanReport};

/// Overall outcome of a scan run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

pub fn verdict(reports: &[ScanReport], fail_on: FailOn) -> Verdict {
    let mut findings = reports.iter().flat_map(ScanReport::findings);
    let failed = match fail_on {
        FailOn::Never => false,
        FailOn::Warn => findings.next().is_some(),
        FailOn::Fail => findings.any(|f| f.status == FindingStatus::Fail),
    };
    if failed { Verdict::Fail } else { Verdict::Pass }
}

/// Map verdict to exit code: 0 = pass, 2 = fail.
pub fn verdict_exit_code(verdict: Verdict) -> i32 {
    match verdict {
        Verdict::Pass => 0,
        Verdict::Fail => 2,
    }
}

/// Serialize reports as the pretty JSON array written to `--report-out`.
pub fn serialize_reports(reports: &[ScanReport]) -> anyhow::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(reports).context("serialize reports")?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse a report file: a JSON array of reports, or a single report object.
pub fn parse_reports_json(text: &str) -> anyhow::Result<Vec<ScanReport>> {
    let value: serde_json::Value = serde_json::from_str(text).context("parse report JSON")?;
    if value.is_array() {
        serde_json::from_value(value).context("decode report array")
    } else {
        let report: ScanReport = serde_json::from_value(value).context("decode report")?;
        Ok(vec![report])
    }
}

pub fn to_renderable(reports: &[ScanReport], fail_on: FailOn) -> RenderableReport {
    let mut findings = Vec::new();
    for report in reports {
        for result in &report.results {
            findings.extend(
                result
                    .misconfigurations
                    .iter()
                    .map(|f| renderable_finding(&result.target, f)),
            );
        }
    }

    let failures = findings
        .iter()
        .filter(|f| f.status == RenderableStatus::Fail)
        .count();
    let warnings = findings.len() - failures;

    RenderableReport {
        verdict: match verdict(reports, fail_on) {
            Verdict::Pass => RenderableVerdictStatus::Pass,
            Verdict::Fail => RenderableVerdictStatus::Fail,
        },
        findings,
        data: RenderableData {
            artifacts: reports.len() as u32,
            failures: failures as u32,
            warnings: warnings as u32,
        },
    }
}

fn renderable_finding(target: &str, f: &Finding) -> RenderableFinding {
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
    let cause = f.cause_metadata.as_ref();
    RenderableFinding {
        status: match f.status {
            FindingStatus::Fail => RenderableStatus::Fail,
            FindingStatus::Warn => RenderableStatus::Warn,
        },
        severity: f.severity.clone(),
        id: f.id.clone(),
        title: f.title.clone(),
        message: f.message.clone(),
        resource: cause.and_then(|c| non_empty(&c.resource)),
        location: Some(RenderableLocation {
            path: target.to_string(),
            line: cause.map(|c| c.start_line).filter(|n| *n > 0),
            end_line: cause.map(|c| c.end_line).filter(|n| *n > 0),
        }),
        resolution: non_empty(&f.resolution),
        url: non_empty(&f.primary_url),
    }
}
