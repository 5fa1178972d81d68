//! Error types for series validation and container operations.

use chrono::NaiveDateTime;

/// Errors from series construction and aggregated-container queries.
#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    /// Returned when timestamp and value vectors have different lengths.
    #[error("series has {timestamps} timestamps but {values} values")]
    LengthMismatch {
        /// Number of timestamps provided.
        timestamps: usize,
        /// Number of values provided.
        values: usize,
    },

    /// Returned when timestamps are not strictly increasing.
    #[error("timestamps not strictly increasing at index {index}")]
    UnsortedTimestamps {
        /// Position of the first out-of-order timestamp.
        index: usize,
    },

    /// Returned when a value is NaN or infinite.
    #[error("series contains non-finite value at index {index}")]
    NonFiniteValue {
        /// Position of the first non-finite value found.
        index: usize,
    },

    /// Returned when an acquisition stop time precedes its start time.
    #[error("acquisition stop precedes start at index {index}")]
    StopBeforeStart {
        /// Position of the offending point.
        index: usize,
    },

    /// Returned when a (scenario, parameter) key is not in the container.
    #[error("no series for scenario \"{scenario}\", parameter \"{parameter}\"")]
    NotFound {
        /// Requested fit scenario ID.
        scenario: String,
        /// Requested parameter name.
        parameter: String,
    },

    /// Returned when a parameter is queried without a scenario but has no
    /// registered default and is not held by exactly one scenario.
    #[error("no default scenario for parameter \"{parameter}\" ({candidates} candidate scenarios)")]
    NoDefaultScenario {
        /// Parameter name that was queried.
        parameter: String,
        /// How many scenarios hold the parameter.
        candidates: usize,
    },

    /// Returned when a merge finds two points at the same timestamp with
    /// values that disagree beyond the configured tolerance.
    #[error("conflicting values for {scenario}/{parameter} at {timestamp}: {left} vs {right}")]
    ConflictingDuplicate {
        /// Fit scenario ID of the conflicting series.
        scenario: String,
        /// Parameter name of the conflicting series.
        parameter: String,
        /// Shared timestamp of the two points.
        timestamp: NaiveDateTime,
        /// Value held by the left merge operand.
        left: f64,
        /// Value held by the right merge operand.
        right: f64,
    },
}
