//! Import error taxonomy: configuration, scenario matching, and parse errors.

use std::path::PathBuf;

use doaskit_series::SeriesError;

/// Errors from import specifications, file reading, and dataset building.
///
/// Configuration-level variants ([`ImportError::InvalidSpecification`],
/// [`ImportError::MissingHeader`], [`ImportError::AmbiguousScenarioMatch`])
/// abort a whole build pass; the remaining per-file variants are recorded in
/// the [`ImportReport`](crate::ImportReport) and only drop that file's
/// contribution.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Returned when a result file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the delimited-text parser encounters a malformed record.
    #[error("parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the result file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a data row has a different field count than the header.
    #[error("malformed row in {path} at line {line}: {got} fields, expected {expected}")]
    MalformedRow {
        /// Path to the result file.
        path: PathBuf,
        /// One-based line number of the offending row.
        line: u64,
        /// Expected field count (from the header).
        expected: usize,
        /// Actual field count of this row.
        got: usize,
    },

    /// Returned when an explicit column index exceeds the row width.
    #[error("column index {index} out of range for row width {width}")]
    ColumnOutOfRange {
        /// The configured zero-based column index.
        index: usize,
        /// Width of the row the index was checked against.
        width: usize,
    },

    /// Returned when a header substring matches more than one header cell.
    #[error("substring \"{substring}\" matches header columns {first} and {second}")]
    AmbiguousColumn {
        /// The configured search substring.
        substring: String,
        /// Index of the first matching header cell.
        first: usize,
        /// Index of the second matching header cell.
        second: usize,
    },

    /// Returned when a header substring matches no header cell.
    #[error("substring \"{substring}\" not found in header")]
    ColumnNotFound {
        /// The configured search substring.
        substring: String,
    },

    /// Returned when a substring rule is used on a file without a header.
    /// A caller configuration error, not a data error.
    #[error("substring rule \"{substring}\" requires a header line")]
    MissingHeader {
        /// The configured search substring.
        substring: String,
    },

    /// Returned when a timestamp cell matches none of the configured formats.
    #[error("unparseable timestamp \"{raw}\" in {path} at line {line}")]
    BadTimestamp {
        /// Path to the result file.
        path: PathBuf,
        /// One-based line number of the offending row.
        line: u64,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when an import specification is internally inconsistent.
    #[error("invalid specification for scenario \"{scenario}\": {reason}")]
    InvalidSpecification {
        /// Scenario ID of the offending specification.
        scenario: String,
        /// Why the specification was rejected.
        reason: String,
    },

    /// Returned when two scenario IDs of equal length both match a filename.
    #[error("filename \"{filename}\" matches scenarios \"{first}\" and \"{second}\" equally")]
    AmbiguousScenarioMatch {
        /// The ambiguous file name.
        filename: String,
        /// First matching scenario ID.
        first: String,
        /// Second matching scenario ID.
        second: String,
    },

    /// Returned when a format name is not present in the catalog.
    #[error("unknown result file format \"{name}\"")]
    UnknownFormat {
        /// The requested format name.
        name: String,
    },

    /// Returned when the catalog resource cannot be deserialized.
    #[error("catalog is not valid JSON")]
    CatalogParse {
        /// Underlying deserialization error.
        source: serde_json::Error,
    },

    /// Returned when a build pass matched and read zero files successfully.
    #[error("no usable result files among {n_candidates} candidates")]
    NoUsableFiles {
        /// Number of candidate files considered.
        n_candidates: usize,
    },

    /// Wraps a series construction error from the aggregation step.
    #[error("series error during aggregation: {0}")]
    Series(#[from] SeriesError),
}

impl ImportError {
    /// True for configuration-level errors that abort a whole build pass
    /// rather than dropping a single file's contribution.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ImportError::InvalidSpecification { .. }
                | ImportError::MissingHeader { .. }
                | ImportError::AmbiguousScenarioMatch { .. }
        )
    }
}
