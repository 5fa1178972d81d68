//! Validated time-stamped result series.

use chrono::{Duration, NaiveDateTime};

use crate::error::SeriesError;

/// Owned, validated result series: parallel timestamp and value vectors.
///
/// Guaranteed strictly increasing in time with all values finite. An empty
/// series is valid — the aggregated container keeps empty series so callers
/// can distinguish "no data in window" from "parameter never imported".
///
/// Optionally carries per-point acquisition stop times when the source file
/// records a (start, stop) pair per spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSeries {
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
    stop_times: Option<Vec<NaiveDateTime>>,
}

impl ResultSeries {
    /// Create a new series, validating lengths, ordering, and finiteness.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::LengthMismatch`] | `timestamps.len() != values.len()` |
    /// | [`SeriesError::UnsortedTimestamps`] | Timestamps not strictly increasing |
    /// | [`SeriesError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn new(timestamps: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self, SeriesError> {
        Self::validate(&timestamps, &values)?;
        Ok(Self {
            timestamps,
            values,
            stop_times: None,
        })
    }

    /// Create a series carrying per-point acquisition stop times.
    ///
    /// # Errors
    ///
    /// All of [`ResultSeries::new`], plus:
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::LengthMismatch`] | `stop_times.len() != timestamps.len()` |
    /// | [`SeriesError::StopBeforeStart`] | Any stop time precedes its start |
    pub fn with_stop_times(
        timestamps: Vec<NaiveDateTime>,
        values: Vec<f64>,
        stop_times: Vec<NaiveDateTime>,
    ) -> Result<Self, SeriesError> {
        Self::validate(&timestamps, &values)?;
        if stop_times.len() != timestamps.len() {
            return Err(SeriesError::LengthMismatch {
                timestamps: timestamps.len(),
                values: stop_times.len(),
            });
        }
        if let Some(index) = timestamps
            .iter()
            .zip(stop_times.iter())
            .position(|(start, stop)| stop < start)
        {
            return Err(SeriesError::StopBeforeStart { index });
        }
        Ok(Self {
            timestamps,
            values,
            stop_times: Some(stop_times),
        })
    }

    /// Create an empty series (no points, no stop times).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            timestamps: Vec::new(),
            values: Vec::new(),
            stop_times: None,
        }
    }

    fn validate(timestamps: &[NaiveDateTime], values: &[f64]) -> Result<(), SeriesError> {
        if timestamps.len() != values.len() {
            return Err(SeriesError::LengthMismatch {
                timestamps: timestamps.len(),
                values: values.len(),
            });
        }
        if let Some(index) = timestamps.windows(2).position(|w| w[0] >= w[1]) {
            return Err(SeriesError::UnsortedTimestamps { index: index + 1 });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(SeriesError::NonFiniteValue { index });
        }
        Ok(())
    }

    /// Return the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Return true if the series has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Return the timestamps in ascending order.
    #[must_use]
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Return the values, aligned with [`ResultSeries::timestamps`].
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Return the acquisition stop times, if the source format recorded them.
    #[must_use]
    pub fn stop_times(&self) -> Option<&[NaiveDateTime]> {
        self.stop_times.as_deref()
    }

    /// Iterate over (timestamp, value) pairs in time order.
    pub fn points(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// Return the first timestamp, or `None` if empty.
    #[must_use]
    pub fn first_time(&self) -> Option<NaiveDateTime> {
        self.timestamps.first().copied()
    }

    /// Return the last timestamp, or `None` if empty.
    #[must_use]
    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.timestamps.last().copied()
    }

    /// Return the value at an exact timestamp, if present.
    #[must_use]
    pub fn get(&self, timestamp: NaiveDateTime) -> Option<f64> {
        self.timestamps
            .binary_search(&timestamp)
            .ok()
            .map(|i| self.values[i])
    }

    /// Return a new series clipped to `[start, stop]` inclusive.
    ///
    /// Clipping an already-clipped series to the same bounds is a no-op.
    #[must_use]
    pub fn subset(&self, start: NaiveDateTime, stop: NaiveDateTime) -> Self {
        let lo = self.timestamps.partition_point(|t| *t < start);
        let hi = self.timestamps.partition_point(|t| *t <= stop);
        Self {
            timestamps: self.timestamps[lo..hi].to_vec(),
            values: self.values[lo..hi].to_vec(),
            stop_times: self.stop_times.as_ref().map(|s| s[lo..hi].to_vec()),
        }
    }

    /// Return a copy with all timestamps (and stop times) shifted by `delta`.
    #[must_use]
    pub fn shift(&self, delta: Duration) -> Self {
        Self {
            timestamps: self.timestamps.iter().map(|t| *t + delta).collect(),
            values: self.values.clone(),
            stop_times: self
                .stop_times
                .as_ref()
                .map(|s| s.iter().map(|t| *t + delta).collect()),
        }
    }
}
