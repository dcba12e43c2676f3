//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use hostfetch_core::DuplicatePolicy;

/// TOML-style file configuration for hostfetch defaults.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    /// Default output directory for fetched files.
    pub output_dir: Option<PathBuf>,
    /// Default per-host ceiling (same range as CLI).
    pub per_host_limit: Option<u8>,
    /// Default admission poll interval in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Verify TLS certificates.
    pub verify_tls: Option<bool>,
    /// Re-scan on every completion, not just on the poll interval.
    pub wake_on_release: Option<bool>,
    /// Duplicate URL handling.
    pub duplicate_policy: Option<DuplicatePolicy>,
    /// HTTP client connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP client read timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Deadline for a single fetch in seconds.
    pub fetch_timeout_secs: Option<u64>,
    /// Cap on concurrent fetches across all hosts.
    pub max_total_in_flight: Option<u64>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(limit) = self.per_host_limit
            && !(1..=100).contains(&limit)
        {
            bail!("Invalid config value for `per_host_limit`: {limit}. Expected range: 1..=100");
        }

        if let Some(interval) = self.poll_interval_ms
            && !(10..=60_000).contains(&interval)
        {
            bail!(
                "Invalid config value for `poll_interval_ms`: {interval}. Expected range: 10..=60000"
            );
        }

        if let Some(cap) = self.max_total_in_flight
            && !(1..=10_000).contains(&cap)
        {
            bail!(
                "Invalid config value for `max_total_in_flight`: {cap}. Expected range: 1..=10000"
            );
        }

        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        validate_timeout_secs("fetch_timeout_secs", self.fetch_timeout_secs)?;

        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Trace,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/hostfetch/config.toml`
/// 2. `$HOME/.config/hostfetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("hostfetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("hostfetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the file config.
///
/// An explicit path must exist. The default path is optional: a missing file
/// yields `None`.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return read_file_config(path).map(Some);
    }

    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    read_file_config(&path).map(Some)
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_no = line_index + 1;
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(unquote(value).with_context(invalid)?));
            }
            "per_host_limit" => {
                cfg.per_host_limit = Some(parse_number(value).with_context(invalid)?);
            }
            "poll_interval_ms" => {
                cfg.poll_interval_ms = Some(parse_number(value).with_context(invalid)?);
            }
            "verify_tls" => {
                cfg.verify_tls = Some(parse_flag(value).with_context(invalid)?);
            }
            "wake_on_release" => {
                cfg.wake_on_release = Some(parse_flag(value).with_context(invalid)?);
            }
            "duplicate_policy" => {
                let parsed = unquote(value).with_context(invalid)?;
                cfg.duplicate_policy = Some(parse_duplicate_policy(parsed).with_context(|| {
                    format!("Invalid `duplicate_policy` value '{parsed}' on line {line_no}")
                })?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_number(value).with_context(invalid)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_number(value).with_context(invalid)?);
            }
            "fetch_timeout_secs" => {
                cfg.fetch_timeout_secs = Some(parse_number(value).with_context(invalid)?);
            }
            "max_total_in_flight" => {
                cfg.max_total_in_flight = Some(parse_number(value).with_context(invalid)?);
            }
            "verbosity" => {
                let parsed = unquote(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Cuts a trailing `# comment`, ignoring `#` inside double quotes.
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    let end = line
        .char_indices()
        .find(|&(_, ch)| {
            if ch == '"' {
                quoted = !quoted;
            }
            ch == '#' && !quoted
        })
        .map_or(line.len(), |(index, _)| index);
    &line[..end]
}

fn unquote(value: &str) -> Result<&str> {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .context("Expected double-quoted string")
}

fn parse_number<T>(value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Expected an unsigned integer, got '{value}'"))
}

fn parse_flag(value: &str) -> Result<bool> {
    value
        .parse()
        .with_context(|| format!("Expected 'true' or 'false', got '{value}'"))
}

fn parse_duplicate_policy(value: &str) -> Result<DuplicatePolicy> {
    match value {
        "await_owner" => Ok(DuplicatePolicy::AwaitOwner),
        "eager" => Ok(DuplicatePolicy::Eager),
        _ => bail!("Expected one of: await_owner, eager"),
    }
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "trace" => Ok(VerbositySetting::Trace),
        _ => bail!("Expected one of: default, verbose, quiet, trace"),
    }
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
