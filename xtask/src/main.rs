//! Developer tasks (schema generation, conformance runs).
//!
//! Keeping this separate avoids bloating the end-user CLI.

use anyhow::{Context, bail};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};
use tfsentry_test_util::normalize_nondeterministic;

/// Get the project root (parent of xtask directory).
fn project_root() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if manifest_dir.ends_with("xtask") {
        manifest_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(manifest_dir)
    } else {
        manifest_dir
    }
}

/// Get the schemas directory path.
fn schemas_dir() -> PathBuf {
    project_root().join("schemas")
}

fn fixtures_dir() -> PathBuf {
    project_root().join("tests").join("fixtures")
}

/// Schema definition with its target filename.
struct SchemaEntry {
    filename: &'static str,
    generate: fn() -> schemars::Schema,
}

/// The `--report-out` document: an array of per-artifact reports.
fn generate_report_schema() -> schemars::Schema {
    schema_for!(Vec<tfsentry_types::ScanReport>)
}

fn generate_config_schema() -> schemars::Schema {
    schema_for!(tfsentry_settings::TfsentryConfigV1)
}

fn generate_policy_schema() -> schemars::Schema {
    schema_for!(tfsentry_types::PolicyMetadata)
}

/// List of schemas to generate.
fn schema_entries() -> Vec<SchemaEntry> {
    vec![
        SchemaEntry {
            filename: "tfsentry.report.v2.json",
            generate: generate_report_schema,
        },
        SchemaEntry {
            filename: "tfsentry.config.v1.json",
            generate: generate_config_schema,
        },
        SchemaEntry {
            filename: "tfsentry.policy-metadata.v1.json",
            generate: generate_policy_schema,
        },
    ]
}

/// Serialize a schema to pretty-printed JSON with trailing newline.
fn serialize_schema(schema: &schemars::Schema) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(schema).context("Failed to serialize schema")?;
    json.push('\n');
    Ok(json)
}

/// Emit schemas to the schemas/ directory.
fn emit_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir();
    fs::create_dir_all(&dir).context("Failed to create schemas directory")?;

    for entry in schema_entries() {
        let json = serialize_schema(&(entry.generate)())?;
        let path = dir.join(entry.filename);
        fs::write(&path, &json)
            .with_context(|| format!("Failed to write schema to {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    println!("\nSchemas emitted successfully.");
    Ok(())
}

/// Validate that schemas in the repo match what would be generated.
fn validate_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir();
    let mut missing = Vec::new();
    let mut mismatched = Vec::new();

    for entry in schema_entries() {
        let path = dir.join(entry.filename);
        if !path.exists() {
            missing.push(entry.filename);
            continue;
        }

        let expected = serialize_schema(&(entry.generate)())?;
        let actual = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if expected != actual {
            mismatched.push(entry.filename);
        }
    }

    if missing.is_empty() && mismatched.is_empty() {
        println!("All schemas are up to date.");
        return Ok(());
    }

    if !missing.is_empty() {
        eprintln!("Missing schemas:");
        for name in &missing {
            eprintln!("  - {}", name);
        }
    }
    if !mismatched.is_empty() {
        eprintln!("Schemas out of date:");
        for name in &mismatched {
            eprintln!("  - {}", name);
        }
    }
    eprintln!("\nRun `cargo xtask emit-schemas` to regenerate.");
    bail!("Schema validation failed")
}

fn print_help() {
    eprintln!("xtask commands:");
    eprintln!("  help              Show this message");
    eprintln!("  emit-schemas      Generate JSON schemas from Rust types to schemas/");
    eprintln!("  validate-schemas  Check if schemas/ matches generated output (for CI)");
    eprintln!("  print-schema-ids  Print known schema IDs");
    eprintln!("  conform           Scan every Terraform fixture and validate the reports");
}

/// Reports must not leak absolute paths: targets are file or directory names.
fn is_clean_target(target: &str) -> bool {
    !(target.is_empty() || target.contains('/') || target.contains('\\'))
}

/// Run the built binary over `tests/fixtures/terraform/*` and validate each report.
///
/// This checks:
/// 1. Schema validation against the generated report schema
/// 2. Target hygiene: artifact names and result targets are bare names
/// 3. Golden comparison (timestamp-normalized) when `expected.report.json` exists
fn conform() -> anyhow::Result<()> {
    let schema = serde_json::to_value(generate_report_schema())?;
    let compiled = jsonschema::validator_for(&schema)
        .map_err(|e| anyhow::anyhow!("Failed to compile schema: {}", e))?;

    let bin = project_root().join("target").join("debug").join("tfsentry");
    #[cfg(target_os = "windows")]
    let bin = bin.with_extension("exe");

    if !bin.exists() {
        bail!(
            "tfsentry binary not found at {}.\n\
            Run `cargo build -p tfsentry-cli` first.",
            bin.display()
        );
    }

    let mut errors = Vec::new();
    let mut count = 0;
    let terraform_dir = fixtures_dir().join("terraform");

    let mut entries: Vec<PathBuf> = fs::read_dir(&terraform_dir)
        .with_context(|| format!("Failed to read {}", terraform_dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    entries.sort();

    for fixture in entries {
        let name = fixture
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let temp_dir = tempfile::tempdir().context("Failed to create temp dir")?;
        let report_out = temp_dir.path().join("report.json");

        let output = std::process::Command::new(&bin)
            .current_dir(temp_dir.path())
            .arg("--policy-dir")
            .arg(fixtures_dir().join("policies"))
            .arg("--library-dir")
            .arg(fixtures_dir().join("lib"))
            .arg("scan")
            .arg(&fixture)
            .arg("--report-out")
            .arg(&report_out)
            .output()
            .with_context(|| format!("Failed to run tfsentry on fixture '{}'", name))?;

        if !report_out.exists() {
            println!(
                "  - fixture '{}' produced no report (exit {:?})",
                name,
                output.status.code()
            );
            continue;
        }

        let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_out)?)
            .with_context(|| format!("Failed to parse report for fixture '{}'", name))?;

        for err in compiled.iter_errors(&report) {
            errors.push(format!("fixture '{}': schema validation: {}", name, err));
        }

        for artifact in report.as_array().into_iter().flatten() {
            let targets = std::iter::once(&artifact["ArtifactName"]).chain(
                artifact["Results"]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .map(|r| &r["Target"]),
            );
            for target in targets.filter_map(|t| t.as_str()) {
                if !is_clean_target(target) {
                    errors.push(format!("fixture '{}': target '{}' is not a bare name", name, target));
                }
            }
        }

        let golden_path = fixture.join("expected.report.json");
        if golden_path.exists() {
            let golden: serde_json::Value =
                serde_json::from_str(&fs::read_to_string(&golden_path)?)?;
            if normalize_nondeterministic(report) != normalize_nondeterministic(golden) {
                errors.push(format!(
                    "fixture '{}': output differs from expected.report.json",
                    name
                ));
            } else {
                println!("  ✓ fixture '{}' matches golden report", name);
            }
        } else {
            println!("  ✓ fixture '{}' produces a valid report", name);
        }
        count += 1;
    }

    if !errors.is_empty() {
        eprintln!("\nConformance errors:");
        for err in &errors {
            eprintln!("  - {}", err);
        }
        bail!("Conformance validation failed with {} errors", errors.len());
    }

    println!("\n✓ {} fixtures pass conformance checks!", count);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match cmd {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "emit-schemas" => emit_schemas(),
        "validate-schemas" => validate_schemas(),
        "conform" => conform(),
        "print-schema-ids" => {
            for entry in schema_entries() {
                println!("{}", entry.filename.trim_end_matches(".json"));
            }
            Ok(())
        }
        other => bail!("unknown xtask command: {other}\n\nRun `cargo xtask help` for usage."),
    }
    .context("xtask failed")
}
