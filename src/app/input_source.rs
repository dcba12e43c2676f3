//! Picks where the URL list comes from.

use std::path::Path;

use hostfetch_core::InputSource;

use crate::cli::Args;

/// `--file` wins, then positional URLs, then piped stdin. Returns `None` when
/// there is nothing to read (no arguments and an interactive stdin).
pub(crate) fn select_input_source(args: &Args, stdin_is_terminal: bool) -> Option<InputSource> {
    if let Some(path) = &args.file {
        if path == Path::new("-") {
            return Some(InputSource::Stdin);
        }
        return Some(InputSource::File(path.clone()));
    }
    if !args.urls.is_empty() {
        return Some(InputSource::Inline(args.urls.clone()));
    }
    if stdin_is_terminal {
        None
    } else {
        Some(InputSource::Stdin)
    }
}
