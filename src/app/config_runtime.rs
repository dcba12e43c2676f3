use std::time::Duration;

use anyhow::{Result, bail};
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use hostfetch_core::fetch::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use hostfetch_core::{DuplicatePolicy, FetchClientOptions, SchedulerConfig};

use crate::app_config::{FileConfig, VerbositySetting};
use crate::cli::{Args, DuplicateMode};

/// Which arguments were given explicitly on the command line.
///
/// Explicit flags always win over the config file.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) output_dir: bool,
    pub(crate) per_host_limit: bool,
    pub(crate) poll_interval: bool,
    pub(crate) poll_only: bool,
    pub(crate) verify_tls: bool,
    pub(crate) duplicates: bool,
    pub(crate) fetch_timeout: bool,
    pub(crate) max_in_flight: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

/// Effective settings for one run.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedConfig {
    pub(crate) args: Args,
    pub(crate) scheduler: SchedulerConfig,
    pub(crate) client: FetchClientOptions,
}

pub(crate) fn parse_cli_with_sources() -> (Args, CliValueSources) {
    let command = Args::command();
    let matches = command.get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    let sources = sources_from_matches(&matches);
    (args, sources)
}

fn sources_from_matches(matches: &ArgMatches) -> CliValueSources {
    CliValueSources {
        output_dir: is_commandline_value(matches, "output_dir"),
        per_host_limit: is_commandline_value(matches, "per_host_limit"),
        poll_interval: is_commandline_value(matches, "poll_interval"),
        poll_only: is_commandline_value(matches, "poll_only")
            || is_commandline_value(matches, "wake_on_release"),
        verify_tls: is_commandline_value(matches, "verify_tls")
            || is_commandline_value(matches, "no_verify_tls"),
        duplicates: is_commandline_value(matches, "duplicates"),
        fetch_timeout: is_commandline_value(matches, "fetch_timeout"),
        max_in_flight: is_commandline_value(matches, "max_in_flight"),
        verbose: is_commandline_value(matches, "verbose"),
        quiet: is_commandline_value(matches, "quiet"),
    }
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Fills in values the user did not pass explicitly from the config file.
pub(crate) fn apply_config_defaults(
    mut args: Args,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Result<Args> {
    if let Some(file_config) = file_config {
        if !cli_sources.output_dir
            && let Some(output_dir) = &file_config.output_dir
        {
            args.output_dir.clone_from(output_dir);
        }

        if !cli_sources.per_host_limit
            && let Some(limit) = file_config.per_host_limit
        {
            args.per_host_limit = limit;
        }

        if !cli_sources.poll_interval
            && let Some(interval) = file_config.poll_interval_ms
        {
            args.poll_interval = interval;
        }

        if !cli_sources.poll_only
            && let Some(wake_on_release) = file_config.wake_on_release
        {
            args.poll_only = !wake_on_release;
        }

        if !cli_sources.verify_tls
            && let Some(verify_tls) = file_config.verify_tls
        {
            args.verify_tls = verify_tls;
        }

        if !cli_sources.duplicates
            && let Some(policy) = file_config.duplicate_policy
        {
            args.duplicates = match policy {
                DuplicatePolicy::AwaitOwner => DuplicateMode::AwaitOwner,
                DuplicatePolicy::Eager => DuplicateMode::Eager,
            };
        }

        if !cli_sources.fetch_timeout
            && let Some(secs) = file_config.fetch_timeout_secs
        {
            args.fetch_timeout = Some(secs);
        }

        if !cli_sources.max_in_flight
            && let Some(cap) = file_config.max_total_in_flight
        {
            args.max_in_flight = Some(cap);
        }

        if !cli_sources.verbose
            && !cli_sources.quiet
            && let Some(verbosity) = file_config.verbosity
        {
            apply_config_verbosity(&mut args, verbosity);
        }
    }

    if !(1..=100).contains(&args.per_host_limit) {
        bail!(
            "Invalid effective per_host_limit value: {}. Expected range: 1..=100",
            args.per_host_limit
        );
    }
    if !(10..=60_000).contains(&args.poll_interval) {
        bail!(
            "Invalid effective poll_interval value: {}. Expected range: 10..=60000",
            args.poll_interval
        );
    }

    Ok(args)
}

fn apply_config_verbosity(args: &mut Args, verbosity: VerbositySetting) {
    match verbosity {
        VerbositySetting::Default => {
            args.quiet = false;
            args.verbose = 0;
        }
        VerbositySetting::Verbose => {
            args.quiet = false;
            args.verbose = 1;
        }
        VerbositySetting::Quiet => {
            args.quiet = true;
            args.verbose = 0;
        }
        VerbositySetting::Trace => {
            args.quiet = false;
            args.verbose = 2;
        }
    }
}

/// Merges CLI and config file into the settings handed to the library.
pub(crate) fn resolve_config(
    args: Args,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Result<ResolvedConfig> {
    let args = apply_config_defaults(args, cli_sources, file_config)?;
    let scheduler = build_scheduler_config(&args);
    let client = resolve_client_options(&args, file_config);
    Ok(ResolvedConfig {
        args,
        scheduler,
        client,
    })
}

pub(crate) fn build_scheduler_config(args: &Args) -> SchedulerConfig {
    SchedulerConfig {
        per_host_limit: usize::from(args.per_host_limit),
        poll_interval: Duration::from_millis(args.poll_interval),
        wake_on_release: args.wake_on_release || !args.poll_only,
        duplicate_policy: args.duplicates.into(),
        output_dir: args.output_dir.clone(),
        fetch_timeout: args.fetch_timeout.map(Duration::from_secs),
        max_total_in_flight: args
            .max_in_flight
            .and_then(|cap| usize::try_from(cap).ok()),
    }
}

pub(crate) fn resolve_client_options(
    args: &Args,
    file_config: Option<&FileConfig>,
) -> FetchClientOptions {
    let connect_secs = file_config
        .and_then(|cfg| cfg.connect_timeout_secs)
        .unwrap_or(CONNECT_TIMEOUT_SECS);
    let read_secs = file_config
        .and_then(|cfg| cfg.read_timeout_secs)
        .unwrap_or(READ_TIMEOUT_SECS);
    FetchClientOptions {
        connect_timeout: Duration::from_secs(connect_secs),
        read_timeout: Duration::from_secs(read_secs),
        verify_tls: args.verify_tls && !args.no_verify_tls,
    }
}

pub(crate) fn resolve_default_log_level(args: &Args) -> &'static str {
    if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

pub(crate) fn should_force_cli_log_level(cli_sources: &CliValueSources) -> bool {
    cli_sources.verbose || cli_sources.quiet
}
