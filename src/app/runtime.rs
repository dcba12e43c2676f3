use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use hostfetch_core::{HttpFetcher, Scheduler, SummaryFormat, read_requests, write_summary};
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::{config_runtime, exit_handler, input_source, terminal};
use crate::app_config;

/// Message when no input was provided at all.
const NO_INPUT_GUIDANCE: &str =
    "No input provided. Pass URLs as arguments, use --file, or pipe them via stdin.";

/// Example for piping input.
const INPUT_PIPE_EXAMPLE: &str = "Example: printf 'https://example.com/\\n' | hostfetch -o pages";

pub(crate) async fn run_hostfetch() -> Result<ProcessExit> {
    let (args, cli_sources) = config_runtime::parse_cli_with_sources();

    let file_config = app_config::load_file_config(args.config.as_deref())?;
    let resolved = config_runtime::resolve_config(args, &cli_sources, file_config.as_ref())?;

    let default_level = config_runtime::resolve_default_log_level(&resolved.args);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(&cli_sources);
    terminal::init_tracing(
        default_level,
        force_cli_log_level,
        terminal::ansi_enabled(),
    );

    debug!(args = ?resolved.args, config_file = file_config.is_some(), "CLI arguments resolved");
    info!("hostfetch starting");

    let Some(source) = input_source::select_input_source(&resolved.args, io::stdin().is_terminal())
    else {
        println!("{NO_INPUT_GUIDANCE}");
        println!("{INPUT_PIPE_EXAMPLE}");
        return Ok(ProcessExit::Success);
    };

    let requests = read_requests(&source).context("Failed to read URL list")?;
    if requests.is_empty() {
        info!("No URLs found in input");
        return Ok(ProcessExit::Success);
    }
    info!(urls = requests.len(), "Parsed input");

    let fetcher = HttpFetcher::new(resolved.client).context("Failed to build HTTP client")?;
    let scheduler = Scheduler::new(resolved.scheduler, Arc::new(fetcher))
        .context("Invalid scheduler configuration")?;

    let report = scheduler
        .run_requests(requests)
        .await
        .context("Fetch run failed")?;

    let format = if resolved.args.json {
        SummaryFormat::JsonLines
    } else {
        SummaryFormat::Text
    };
    let stdout = io::stdout();
    write_summary(&mut stdout.lock(), &report, format).context("Failed to write run summary")?;

    if report.failed() > 0 {
        warn!(
            failed = report.failed(),
            total = report.total(),
            "Some URLs could not be fetched"
        );
    }
    info!(
        total = report.total(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        duplicates = report.duplicates(),
        fetched = report.fetched(),
        elapsed_ms = report.elapsed().as_millis(),
        "Run complete"
    );

    Ok(exit_handler::determine_exit_outcome(
        report.succeeded(),
        report.failed(),
    ))
}
