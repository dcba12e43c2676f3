//! Terminal detection and tracing setup.

use std::env;

use tracing_subscriber::EnvFilter;

/// ANSI colour is off when `NO_COLOR` is set to anything non-empty or the
/// terminal reports itself as `dumb`.
fn colour_disabled(no_color: Option<&str>, term: Option<&str>) -> bool {
    no_color.is_some_and(|value| !value.is_empty())
        || term.is_some_and(|value| value.eq_ignore_ascii_case("dumb"))
}

pub(crate) fn ansi_enabled() -> bool {
    let no_color = env::var("NO_COLOR").ok();
    let term = env::var("TERM").ok();
    !colour_disabled(no_color.as_deref(), term.as_deref())
}

/// Installs the global subscriber, logging to stderr so stdout carries only
/// the run summary.
///
/// `RUST_LOG` wins unless a verbosity flag was passed explicitly.
pub(crate) fn init_tracing(default_level: &str, force_cli_level: bool, ansi: bool) {
    let from_env = (!force_cli_level)
        .then(|| EnvFilter::try_from_default_env().ok())
        .flatten();
    let filter = from_env.unwrap_or_else(|| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_env_filter(filter)
        .try_init();
}
