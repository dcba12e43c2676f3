//! URL list input.
//!
//! One URL per line. Lines are trimmed; blank lines and lines starting with
//! `#` are skipped. Every remaining line becomes a [`Request`] whose index is
//! its position among the kept lines, starting at 0.

use std::io::Read;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::scheduler::Request;

/// Errors reading the URL list. These abort a run before anything is fetched.
#[derive(Debug, Error)]
pub enum InputError {
    /// The input file could not be read.
    #[error("cannot read URL list {path}: {source}")]
    Read {
        /// The file that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Standard input could not be read.
    #[error("cannot read URL list from stdin: {source}")]
    Stdin {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Where the URL list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A file with one URL per line.
    File(PathBuf),
    /// Standard input, read to EOF.
    Stdin,
    /// URLs given directly, for example as command-line arguments.
    Inline(Vec<String>),
}

/// Parses URL lines into indexed requests.
///
/// ```
/// use hostfetch_core::input::parse_url_lines;
///
/// let requests = parse_url_lines("http://a.com/1\n\n# comment\n  http://b.com/1  \n");
/// assert_eq!(requests.len(), 2);
/// assert_eq!(requests[1].idx, 1);
/// assert_eq!(requests[1].url, "http://b.com/1");
/// ```
#[must_use]
pub fn parse_url_lines(text: &str) -> Vec<Request> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .enumerate()
        .map(|(idx, url)| Request::new(idx, url))
        .collect()
}

/// Reads and parses the URL list from `source`.
///
/// # Errors
///
/// Returns [`InputError`] if the file or stdin cannot be read.
#[instrument(level = "debug", skip(source))]
pub fn read_requests(source: &InputSource) -> Result<Vec<Request>, InputError> {
    let requests = match source {
        InputSource::File(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| InputError::Read {
                path: path.clone(),
                source,
            })?;
            parse_url_lines(&text)
        }
        InputSource::Stdin => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|source| InputError::Stdin { source })?;
            parse_url_lines(&text)
        }
        InputSource::Inline(urls) => parse_url_lines(&urls.join("\n")),
    };
    debug!(requests = requests.len(), "URL list read");
    Ok(requests)
}
