use crate::{RenderableReport, RenderableStatus};

/// Render findings as GitHub Actions workflow command annotations.
///
/// Format:
/// `::{level} file={path},line={line},endLine={end}::{message}`
pub fn render_github_annotations(report: &RenderableReport) -> Vec<String> {
    let mut out = Vec::new();

    for f in &report.findings {
        let level = match f.status {
            RenderableStatus::Fail => "error",
            RenderableStatus::Warn => "warning",
        };

        let mut meta = String::new();
        if let Some(loc) = &f.location {
            meta.push_str(&format!("file={}", escape_property(&loc.path)));
            if let Some(line) = loc.line {
                meta.push_str(&format!(",line={}", line));
            }
            if let Some(end) = loc.end_line {
                meta.push_str(&format!(",endLine={}", end));
            }
        }
        if !meta.is_empty() {
            meta.push(',');
        }
        meta.push_str(&format!("title={}", escape_property(&f.id)));

        let message = escape_data(&format!("[{}] {}: {}", f.severity, f.title, f.message));
        out.push(format!("::{} {}::{}", level, meta, message));
    }

    out
}

fn escape_data(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}
