//! Run summary rendering.
//!
//! One record per request, ordered by request index, either as plain text:
//!
//! ```text
//! ok 0 http://a.com/1 out/url_0.html
//! err 1 http://b.com/1 HTTP 404 fetching http://b.com/1
//! dup 2 http://a.com/1 out/url_0.html (of 0)
//! ```
//!
//! or as JSON lines (one [`SummaryRecord`] object per line).

use std::io::{self, Write};
use std::path::PathBuf;

use serde::Serialize;

use crate::scheduler::{FetchResult, RunReport};

/// Placeholder for a missing output path in text summaries.
const NO_PATH: &str = "-";

/// Summary output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryFormat {
    /// Space-separated lines for humans and `grep`.
    #[default]
    Text,
    /// One JSON object per line.
    JsonLines,
}

/// Coarse outcome label for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    /// Fetched by this request.
    Ok,
    /// Resolved from another request's fetch.
    Duplicate,
    /// Failed, either directly or through its owner.
    Error,
}

impl SummaryStatus {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Duplicate => "dup",
            Self::Error => "err",
        }
    }
}

/// Serializable view of one [`FetchResult`].
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRecord {
    /// Request index.
    pub idx: usize,
    /// Requested URL.
    pub url: String,
    /// Outcome label.
    pub status: SummaryStatus,
    /// Output file, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    /// Owner index for duplicates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<usize>,
    /// Error message for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stable error category for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl From<&FetchResult> for SummaryRecord {
    fn from(result: &FetchResult) -> Self {
        let status = match (&result.error, result.duplicate_of) {
            (Some(_), _) => SummaryStatus::Error,
            (None, Some(_)) => SummaryStatus::Duplicate,
            (None, None) => SummaryStatus::Ok,
        };
        Self {
            idx: result.idx,
            url: result.url.clone(),
            status,
            output_file: result.output_file.clone(),
            duplicate_of: result.duplicate_of,
            error: result.error.as_ref().map(ToString::to_string),
            error_kind: result.error.as_ref().map(|error| error.kind()),
        }
    }
}

impl SummaryRecord {
    /// Renders the record as one text summary line (without newline).
    #[must_use]
    pub fn to_text_line(&self) -> String {
        let mut line = format!("{} {} {}", self.status.label(), self.idx, self.url);
        match (&self.error, &self.output_file) {
            (Some(error), _) => {
                line.push(' ');
                line.push_str(error);
            }
            (None, Some(path)) => {
                line.push(' ');
                line.push_str(&path.display().to_string());
            }
            (None, None) => {
                line.push(' ');
                line.push_str(NO_PATH);
            }
        }
        if let Some(owner) = self.duplicate_of {
            line.push_str(&format!(" (of {owner})"));
        }
        line
    }
}

/// Writes one summary record per result, ordered by request index.
///
/// # Errors
///
/// Returns any error from `out`, or a serialization failure in JSON mode.
pub fn write_summary<W: Write>(
    out: &mut W,
    report: &RunReport,
    format: SummaryFormat,
) -> io::Result<()> {
    for result in report.sorted_by_idx() {
        let record = SummaryRecord::from(result);
        match format {
            SummaryFormat::Text => writeln!(out, "{}", record.to_text_line())?,
            SummaryFormat::JsonLines => {
                serde_json::to_writer(&mut *out, &record)?;
                out.write_all(b"\n")?;
            }
        }
    }
    out.flush()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::fetch::FetchError;
    use crate::scheduler::{FetchOutcome, ResultAggregator};

    fn sample_report() -> RunReport {
        let owner = FetchResult::fetched(0, "http://a.com/1", Some(PathBuf::from("out/url_0.html")));
        let dup = FetchResult::duplicate(2, "http://a.com/1", 0, FetchOutcome::from(&owner));
        let failed = FetchResult::failed(1, "http://b.com/1", FetchError::http_status("http://b.com/1", 404));

        let mut aggregator = ResultAggregator::new();
        aggregator.set_expected(3);
        aggregator.accept(dup);
        aggregator.accept(failed);
        aggregator.accept(owner);
        aggregator.into_report(Duration::from_millis(1))
    }

    #[test]
    fn test_text_summary_is_sorted_by_idx() {
        let mut out = Vec::new();
        write_summary(&mut out, &sample_report(), SummaryFormat::Text).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ok 0 http://a.com/1 out/url_0.html");
        assert!(lines[1].starts_with("err 1 http://b.com/1 "));
        assert!(lines[1].contains("404"));
        assert_eq!(lines[2], "dup 2 http://a.com/1 out/url_0.html (of 0)");
    }

    #[test]
    fn test_json_lines_summary_fields() {
        let mut out = Vec::new();
        write_summary(&mut out, &sample_report(), SummaryFormat::JsonLines).unwrap();
        let text = String::from_utf8(out).unwrap();
        let records: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["status"], "ok");
        assert_eq!(records[0]["output_file"], "out/url_0.html");
        assert!(records[0].get("error").is_none());
        assert_eq!(records[1]["status"], "error");
        assert_eq!(records[1]["error_kind"], "http_status");
        assert_eq!(records[2]["status"], "duplicate");
        assert_eq!(records[2]["duplicate_of"], 0);
    }

    #[test]
    fn test_success_without_file_renders_placeholder() {
        let record = SummaryRecord::from(&FetchResult::fetched(5, "http://a.com/", None));
        assert_eq!(record.to_text_line(), "ok 5 http://a.com/ -");
    }

    #[test]
    fn test_failed_duplicate_is_reported_as_error_with_owner() {
        let outcome = FetchOutcome {
            output_file: None,
            error: Some(std::sync::Arc::new(FetchError::http_status("http://a.com/", 500))),
        };
        let record = SummaryRecord::from(&FetchResult::duplicate(3, "http://a.com/", 1, outcome));
        assert_eq!(record.status, SummaryStatus::Error);
        let line = record.to_text_line();
        assert!(line.starts_with("err 3 http://a.com/ "));
        assert!(line.ends_with("(of 1)"));
    }
}
