//! Per-pass error report returned alongside the aggregated container.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use doaskit_series::SeriesKey;

use crate::error::ImportError;

/// One file whose contribution was dropped during a build pass.
#[derive(Debug)]
pub struct FileFailure {
    /// Path of the failed file.
    pub path: PathBuf,
    /// Scenario the file had been matched to, when matching succeeded.
    pub scenario: Option<String>,
    /// What went wrong.
    pub error: ImportError,
}

/// A duplicate timestamp found while finalizing one series.
///
/// The first-deposited value is kept; the conflicting one is recorded here
/// rather than silently picking a winner.
#[derive(Debug, Clone)]
pub struct DuplicateRecord {
    /// Series the duplicate occurred in.
    pub key: SeriesKey,
    /// The shared timestamp.
    pub timestamp: NaiveDateTime,
    /// Value kept in the container.
    pub kept: f64,
    /// Value dropped from the container.
    pub dropped: f64,
}

/// Accumulated diagnostics of one build pass.
///
/// A pass that reads at least one file returns a usable (possibly partial)
/// container together with this report; per-file problems never abort the
/// scan.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Candidate files matching no registered scenario (not an error).
    pub unmatched: Vec<PathBuf>,
    /// Files whose contribution was dropped, with the cause.
    pub failures: Vec<FileFailure>,
    /// Conflicting duplicate timestamps resolved by keeping the first value.
    pub duplicates: Vec<DuplicateRecord>,
    /// Number of files read and extracted successfully.
    pub n_imported: usize,
}

impl ImportReport {
    /// True when every candidate file was matched and imported cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unmatched.is_empty() && self.failures.is_empty() && self.duplicates.is_empty()
    }
}
