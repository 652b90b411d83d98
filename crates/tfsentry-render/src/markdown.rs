use crate::{RenderableReport, RenderableStatus, RenderableVerdictStatus};

pub fn render_markdown(report: &RenderableReport) -> String {
    let mut out = String::new();

    out.push_str("# tfsentry report\n\n");
    let verdict = match report.verdict {
        RenderableVerdictStatus::Pass => "PASS",
        RenderableVerdictStatus::Fail => "FAIL",
    };
    out.push_str(&format!(
        "- Verdict: **{}**\n- Artifacts: {}\n- Findings: {} FAIL / {} WARN\n\n",
        verdict, report.data.artifacts, report.data.failures, report.data.warnings
    ));

    if report.findings.is_empty() {
        out.push_str("No misconfigurations found.\n");
        return out;
    }

    out.push_str("## Findings\n\n");

    for f in &report.findings {
        let status = match f.status {
            RenderableStatus::Fail => "FAIL",
            RenderableStatus::Warn => "WARN",
        };

        out.push_str(&format!(
            "- [{}] {} `{}` {}: {}",
            status, f.severity, f.id, f.title, f.message
        ));
        if let Some(loc) = &f.location {
            match (loc.line, loc.end_line) {
                (Some(start), Some(end)) if end > start => {
                    out.push_str(&format!(" (`{}`:{}-{})", loc.path, start, end))
                }
                (Some(start), _) => out.push_str(&format!(" (`{}`:{})", loc.path, start)),
                (None, _) => out.push_str(&format!(" (`{}`)", loc.path)),
            }
        }
        out.push('\n');

        if let Some(resource) = &f.resource {
            out.push_str(&format!("  - resource: `{}`\n", resource));
        }
        if let Some(resolution) = &f.resolution {
            out.push_str(&format!("  - resolution: {}\n", resolution));
        }
        if let Some(url) = &f.url {
            out.push_str(&format!("  - url: {}\n", url));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RenderableData, RenderableFinding, RenderableLocation};

    fn finding(status: RenderableStatus, location: Option<RenderableLocation>) -> RenderableFinding {
        RenderableFinding {
            status,
            severity: "HIGH".to_string(),
            id: "AVD-AWS-0092".to_string(),
            title: "S3 bucket ACL allows public access".to_string(),
            message: "Bucket logs has a public ACL".to_string(),
            resource: Some("aws_s3_bucket.logs".to_string()),
            location,
            resolution: Some("Use a private ACL".to_string()),
            url: Some("https://avd.aquasec.com/misconfig/avd-aws-0092".to_string()),
        }
    }

    #[test]
    fn renders_empty_report() {
        let report = RenderableReport {
            verdict: RenderableVerdictStatus::Pass,
            findings: Vec::new(),
            data: RenderableData {
                artifacts: 2,
                failures: 0,
                warnings: 0,
            },
        };
        let md = render_markdown(&report);
        assert!(md.contains("Verdict: **PASS**"));
        assert!(md.contains("Artifacts: 2"));
        assert!(md.contains("No misconfigurations found"));
    }

    #[test]
    fn renders_findings_with_location_resource_and_url() {
        let report = RenderableReport {
            verdict: RenderableVerdictStatus::Fail,
            findings: vec![finding(
                RenderableStatus::Fail,
                Some(RenderableLocation {
                    path: "main.tf".to_string(),
                    line: Some(3),
                    end_line: Some(5),
                }),
            )],
            data: RenderableData {
                artifacts: 1,
                failures: 1,
                warnings: 0,
            },
        };

        let md = render_markdown(&report);
        assert!(md.contains("Verdict: **FAIL**"));
        assert!(md.contains("Findings: 1 FAIL / 0 WARN"));
        assert!(md.contains("## Findings"));
        assert!(md.contains("[FAIL] HIGH `AVD-AWS-0092`"));
        assert!(md.contains("(`main.tf`:3-5)"));
        assert!(md.contains("resource: `aws_s3_bucket.logs`"));
        assert!(md.contains("resolution: Use a private ACL"));
        assert!(md.contains("url: https://avd.aquasec.com/misconfig/avd-aws-0092"));
    }

    #[test]
    fn renders_warn_with_file_only_location() {
        let report = RenderableReport {
            verdict: RenderableVerdictStatus::Pass,
            findings: vec![finding(
                RenderableStatus::Warn,
                Some(RenderableLocation {
                    path: "main.tf".to_string(),
                    line: None,
                    end_line: None,
                }),
            )],
            data: RenderableData {
                artifacts: 1,
                failures: 0,
                warnings: 1,
            },
        };

        let md = render_markdown(&report);
        assert!(md.contains("[WARN]"));
        assert!(md.contains("(`main.tf`)"));
    }
}
