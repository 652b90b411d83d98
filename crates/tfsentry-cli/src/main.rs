//! CLI entry point for tfsentry.
//!
//! This module is intentionally thin: it handles argument parsing, I/O, logging setup, and exit
//! codes. All business logic lives in the `tfsentry-app` crate.

#![forbid(unsafe_code)]

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use tfsentry_app::{
    ExplainOutput, ScanInput, format_explanation, format_not_found, format_policies, init_corpus,
    parse_reports_json, render_annotations, render_markdown, run_explain, run_policies, run_scan,
    to_renderable, verdict, verdict_exit_code, write_report, write_text,
};
use tfsentry_settings::{EffectiveSettings, FailOn, Overrides, TfsentryConfigV1};
use tfsentry_types::ScanReport;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "tfsentry",
    version,
    about = "Policy-as-code scanner for Terraform configuration"
)]
struct Cli {
    /// Path to tfsentry config TOML (a missing file means defaults).
    #[arg(long, global = true, default_value = "tfsentry.toml")]
    config: Utf8PathBuf,

    /// Override the policy directory (mandatory corpus root). Beats `POLICY_DIR`.
    #[arg(long, global = true)]
    policy_dir: Option<String>,

    /// Optional library directory; repeatable. Replaces the configured libraries.
    #[arg(long = "library-dir", global = true)]
    library_dirs: Vec<String>,

    /// Emit logs as JSON lines (also enabled by `TFSENTRY_LOG_JSON=1`).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a Terraform file or directory and write the JSON report.
    Scan {
        /// File (`.tf` / `.tf.json`) or directory to scan.
        target: Utf8PathBuf,

        /// Where to write the JSON report array.
        #[arg(long, default_value = "artifacts/tfsentry/report.json")]
        report_out: Utf8PathBuf,

        /// Directory mode: per-file or merged.
        #[arg(long)]
        mode: Option<String>,

        /// Worker threads for per-file scans (0 = one per core).
        #[arg(long)]
        jobs: Option<usize>,

        /// Whole-run timeout in seconds (0 disables it).
        #[arg(long)]
        timeout: Option<u64>,

        /// Which findings fail the run: fail, warn, or never.
        #[arg(long)]
        fail_on: Option<String>,

        /// File name glob to skip during directory discovery; repeatable.
        #[arg(long)]
        exclude: Vec<String>,

        /// Write a Markdown report alongside the JSON.
        #[arg(long)]
        write_markdown: bool,

        /// Where to write the Markdown report (if enabled).
        #[arg(long, default_value = "artifacts/tfsentry/comment.md")]
        markdown_out: Utf8PathBuf,
    },

    /// List the policies that survived compilation.
    Policies,

    /// Show the metadata of one policy.
    Explain {
        /// Policy ID, e.g. "AVD-AWS-0092" (case-insensitive).
        identifier: String,
    },

    /// Render markdown from an existing JSON report.
    Md {
        /// Path to the JSON report file.
        #[arg(long, default_value = "artifacts/tfsentry/report.json")]
        report: Utf8PathBuf,

        /// Where to write the Markdown output (if not specified, prints to stdout).
        #[arg(long, short)]
        output: Option<Utf8PathBuf>,

        /// Verdict policy for the summary line: fail, warn, or never.
        #[arg(long)]
        fail_on: Option<String>,
    },

    /// Render GitHub Actions annotations from an existing JSON report.
    Annotations {
        /// Path to the JSON report file.
        #[arg(long, default_value = "artifacts/tfsentry/report.json")]
        report: Utf8PathBuf,

        /// Maximum number of annotations to emit.
        #[arg(long, default_value = "10")]
        max: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_json || env_flag("TFSENTRY_LOG_JSON"));

    let result = match &cli.cmd {
        Commands::Scan { .. } => cmd_scan(&cli),
        Commands::Policies => cmd_policies(&cli),
        Commands::Explain { identifier } => cmd_explain(&cli, identifier),
        Commands::Md {
            report,
            output,
            fail_on,
        } => cmd_md(&cli, report, output.as_deref(), fail_on.clone()),
        Commands::Annotations { report, max } => cmd_annotations(report, *max),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("tfsentry error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false)
}

/// Load the config file (missing file means defaults) and resolve it against the flags.
fn load_settings(cli: &Cli, mut overrides: Overrides) -> anyhow::Result<EffectiveSettings> {
    let cfg = if cli.config.exists() {
        let text = std::fs::read_to_string(&cli.config)
            .with_context(|| format!("read config: {}", cli.config))?;
        tfsentry_settings::parse_config_toml(&text)
            .with_context(|| format!("parse config: {}", cli.config))?
    } else {
        TfsentryConfigV1::default()
    };

    overrides.policy_dir = cli.policy_dir.clone();
    overrides.env_policy_dir = std::env::var("POLICY_DIR").ok().filter(|v| !v.is_empty());
    overrides.libraries = cli.library_dirs.clone();

    tfsentry_settings::resolve_config(cfg, overrides).context("resolve config")
}

fn cmd_scan(cli: &Cli) -> anyhow::Result<i32> {
    let Commands::Scan {
        target,
        report_out,
        mode,
        jobs,
        timeout,
        fail_on,
        exclude,
        write_markdown,
        markdown_out,
    } = &cli.cmd
    else {
        anyhow::bail!("scan invoked without scan arguments");
    };

    let settings = load_settings(
        cli,
        Overrides {
            mode: mode.clone(),
            jobs: *jobs,
            timeout_secs: *timeout,
            fail_on: fail_on.clone(),
            exclude: exclude.clone(),
            ..Overrides::default()
        },
    )?;

    let corpus = init_corpus(&settings)?;
    let output = run_scan(
        &corpus,
        ScanInput {
            target,
            settings: &settings,
            cancel: None,
        },
    )?;

    write_report(report_out, &output.reports).context("write report json")?;
    if *write_markdown {
        let md = render_markdown(&to_renderable(&output.reports, settings.fail_on));
        write_text(markdown_out, &md).context("write markdown")?;
    }

    for (path, reason) in &output.skipped {
        warn!(path = %path, reason = %reason, "file skipped");
    }
    let verdict = verdict(&output.reports, settings.fail_on);
    info!(report = %report_out, ?verdict, "scan finished");
    Ok(verdict_exit_code(verdict))
}

fn cmd_policies(cli: &Cli) -> anyhow::Result<i32> {
    let settings = load_settings(cli, Overrides::default())?;
    let corpus = init_corpus(&settings)?;
    print!("{}", format_policies(&run_policies(&corpus)));
    Ok(0)
}

fn cmd_explain(cli: &Cli, identifier: &str) -> anyhow::Result<i32> {
    let settings = load_settings(cli, Overrides::default())?;
    let corpus = init_corpus(&settings)?;
    match run_explain(&corpus, identifier) {
        ExplainOutput::Found(meta) => {
            print!("{}", format_explanation(&meta));
            Ok(0)
        }
        ExplainOutput::NotFound {
            identifier,
            available_ids,
        } => {
            eprint!("{}", format_not_found(&identifier, &available_ids));
            Ok(1)
        }
    }
}

fn cmd_md(
    cli: &Cli,
    report_path: &Utf8Path,
    output: Option<&Utf8Path>,
    fail_on: Option<String>,
) -> anyhow::Result<i32> {
    let settings = load_settings(
        cli,
        Overrides {
            fail_on,
            ..Overrides::default()
        },
    )?;
    let reports = read_reports(report_path)?;
    let md = render_markdown(&to_renderable(&reports, settings.fail_on));

    if let Some(out_path) = output {
        write_text(out_path, &md).context("write markdown output")?;
    } else {
        print!("{}", md);
    }

    Ok(0)
}

fn cmd_annotations(report_path: &Utf8Path, max: usize) -> anyhow::Result<i32> {
    let reports = read_reports(report_path)?;
    let renderable = to_renderable(&reports, FailOn::default());
    for annotation in render_annotations(&renderable, max) {
        println!("{}", annotation);
    }
    Ok(0)
}

fn read_reports(path: &Utf8Path) -> anyhow::Result<Vec<ScanReport>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read report: {}", path))?;
    parse_reports_json(&text)
}
