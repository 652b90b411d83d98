//! Render use cases: markdown and GitHub annotations, plus output file writing.

use anyhow::Context;
use camino::Utf8Path;
use tfsentry_render::RenderableReport;
use tfsentry_types::ScanReport;

use crate::report::serialize_reports;

pub fn render_markdown(report: &RenderableReport) -> String {
    tfsentry_render::render_markdown(report)
}

pub fn render_annotations(report: &RenderableReport, max: usize) -> Vec<String> {
    tfsentry_render::render_github_annotations(report)
        .into_iter()
        .take(max)
        .collect()
}

/// Write the JSON report array, creating parent directories as needed.
pub fn write_report(path: &Utf8Path, reports: &[ScanReport]) -> anyhow::Result<()> {
    let bytes = serialize_reports(reports)?;
    create_parent(path)?;
    std::fs::write(path, bytes).with_context(|| format!("write report: {}", path))?;
    Ok(())
}

pub fn write_text(path: &Utf8Path, text: &str) -> anyhow::Result<()> {
    create_parent(path)?;
    std::fs::write(path, text).with_context(|| format!("write {}", path))?;
    Ok(())
}

fn create_parent(path: &Utf8Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| format!("create dir: {}", parent))?;
    }
    Ok(())
}
