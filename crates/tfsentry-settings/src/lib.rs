//! Config parsing and resolution.
//!
//! This crate is intentionally IO-free: it parses configuration provided as strings and
//! resolves it against caller-supplied overrides (CLI flags and environment values).

#![forbid(unsafe_code)]

mod model;
mod resolve;

pub use model::{PoliciesConfig, ReportConfig, ScanConfig, TfsentryConfigV1};
pub use resolve::{
    DEFAULT_POLICY_DIR, DEFAULT_TIMEOUT_SECS, EffectiveSettings, FailOn, Overrides, ScanMode,
    parse_fail_on, parse_scan_mode,
};

/// Parse `tfsentry.toml` into a typed model.
pub fn parse_config_toml(input: &str) -> anyhow::Result<TfsentryConfigV1> {
    let cfg: TfsentryConfigV1 = toml::from_str(input)?;
    Ok(cfg)
}

/// Resolve the effective settings (defaults, then file, then environment, then flags).
pub fn resolve_config(
    cfg: TfsentryConfigV1,
    overrides: Overrides,
) -> anyhow::Result<EffectiveSettings> {
    resolve::resolve_config(cfg, overrides)
}
