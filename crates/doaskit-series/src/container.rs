//! Aggregated result container: one series per (scenario, parameter) key.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::{debug, instrument};

use crate::error::SeriesError;
use crate::key::SeriesKey;
use crate::series::ResultSeries;

/// In-memory, queryable collection of extracted result series.
///
/// Holds one [`ResultSeries`] per (scenario, parameter) key. Built once by
/// the dataset builder, then treated as read-only by downstream consumers;
/// [`ResultContainer::merge`] returns a new container rather than mutating
/// in place.
///
/// A parameter measured under several fit scenarios can be given a default
/// scenario via [`ResultContainer::set_default_scenario`], letting
/// downstream consumers query by parameter name alone through
/// [`ResultContainer::get_default`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultContainer {
    series: BTreeMap<SeriesKey, ResultSeries>,
    /// Parameter name -> default scenario ID for scenario-less queries.
    defaults: BTreeMap<String, String>,
}

impl ResultContainer {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a series under a key, replacing and returning any previous one.
    pub fn insert(&mut self, key: SeriesKey, series: ResultSeries) -> Option<ResultSeries> {
        self.series.insert(key, series)
    }

    /// Look up the series for a scenario/parameter pair.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::NotFound`] | No series imported under this key |
    pub fn get(&self, scenario: &str, parameter: &str) -> Result<&ResultSeries, SeriesError> {
        self.series
            .get(&SeriesKey::new(scenario, parameter))
            .ok_or_else(|| SeriesError::NotFound {
                scenario: scenario.to_string(),
                parameter: parameter.to_string(),
            })
    }

    /// Register `scenario` as the default for queries on `parameter`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::NotFound`] | No series imported under (scenario, parameter) |
    pub fn set_default_scenario(
        &mut self,
        parameter: &str,
        scenario: &str,
    ) -> Result<(), SeriesError> {
        if !self.contains(scenario, parameter) {
            return Err(SeriesError::NotFound {
                scenario: scenario.to_string(),
                parameter: parameter.to_string(),
            });
        }
        self.defaults
            .insert(parameter.to_string(), scenario.to_string());
        Ok(())
    }

    /// Return the default scenario for a parameter: the registered one, or
    /// the only scenario holding the parameter when that is unambiguous.
    #[must_use]
    pub fn default_scenario(&self, parameter: &str) -> Option<&str> {
        if let Some(scenario) = self.defaults.get(parameter) {
            return Some(scenario.as_str());
        }
        let mut holders = self
            .series
            .keys()
            .filter(|k| k.parameter() == parameter)
            .map(SeriesKey::scenario);
        match (holders.next(), holders.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    /// Look up a parameter's series under its default scenario.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::NoDefaultScenario`] | No default registered and the parameter is absent or held by several scenarios |
    pub fn get_default(&self, parameter: &str) -> Result<&ResultSeries, SeriesError> {
        match self.default_scenario(parameter) {
            Some(scenario) => self.get(scenario, parameter),
            None => Err(SeriesError::NoDefaultScenario {
                parameter: parameter.to_string(),
                candidates: self
                    .series
                    .keys()
                    .filter(|k| k.parameter() == parameter)
                    .count(),
            }),
        }
    }

    /// Return true if a series exists under this scenario/parameter pair.
    #[must_use]
    pub fn contains(&self, scenario: &str, parameter: &str) -> bool {
        self.series
            .contains_key(&SeriesKey::new(scenario, parameter))
    }

    /// Return the number of series held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Return true if the container holds no series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Iterate over keys in deterministic (scenario, parameter) order.
    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.series.keys()
    }

    /// Iterate over (key, series) pairs in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (&SeriesKey, &ResultSeries)> {
        self.series.iter()
    }

    /// Return the distinct scenario IDs present, sorted.
    #[must_use]
    pub fn scenarios(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.series.keys().map(SeriesKey::scenario).collect();
        ids.dedup();
        ids
    }

    /// Return the parameter names imported for one scenario, sorted.
    #[must_use]
    pub fn parameters(&self, scenario: &str) -> Vec<&str> {
        self.series
            .keys()
            .filter(|k| k.scenario() == scenario)
            .map(SeriesKey::parameter)
            .collect()
    }

    /// Return the sorted union of all timestamps observed across all series.
    #[must_use]
    pub fn time_index(&self) -> Vec<NaiveDateTime> {
        let mut index: Vec<NaiveDateTime> = self
            .series
            .values()
            .flat_map(|s| s.timestamps().iter().copied())
            .collect();
        index.sort_unstable();
        index.dedup();
        index
    }

    /// Return the earliest observed timestamp, or `None` if no data.
    #[must_use]
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.series.values().filter_map(ResultSeries::first_time).min()
    }

    /// Return the latest observed timestamp, or `None` if no data.
    #[must_use]
    pub fn stop(&self) -> Option<NaiveDateTime> {
        self.series.values().filter_map(ResultSeries::last_time).max()
    }

    /// Return a new container with every series clipped to `[start, stop]`
    /// inclusive.
    ///
    /// Series left empty by the clip are retained, so callers can tell "no
    /// data in window" apart from "parameter never imported". Registered
    /// default scenarios carry over.
    #[must_use]
    pub fn subset(&self, start: NaiveDateTime, stop: NaiveDateTime) -> Self {
        Self {
            series: self
                .series
                .iter()
                .map(|(k, s)| (k.clone(), s.subset(start, stop)))
                .collect(),
            defaults: self.defaults.clone(),
        }
    }

    /// Merge two containers into a new one, requiring exact value equality
    /// at any shared timestamp. Equivalent to
    /// [`ResultContainer::merge_with_tolerance`] with a tolerance of zero.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::ConflictingDuplicate`] | Shared timestamp with differing values |
    pub fn merge(&self, other: &ResultContainer) -> Result<Self, SeriesError> {
        self.merge_with_tolerance(other, 0.0)
    }

    /// Merge two containers into a new one.
    ///
    /// Keys present in only one operand are copied as-is. Keys present in
    /// both are concatenated and re-sorted by timestamp; points sharing an
    /// identical timestamp are deduplicated when their values agree within
    /// `tolerance` (the left operand's value is kept).
    ///
    /// Commutative up to ordering when no conflict exists.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::ConflictingDuplicate`] | Shared timestamp with values differing beyond `tolerance` |
    #[instrument(skip_all, fields(left = self.len(), right = other.len()))]
    pub fn merge_with_tolerance(
        &self,
        other: &ResultContainer,
        tolerance: f64,
    ) -> Result<Self, SeriesError> {
        let mut merged = BTreeMap::new();
        for (key, series) in &self.series {
            let combined = match other.series.get(key) {
                Some(theirs) => merge_series(key, series, theirs, tolerance)?,
                None => series.clone(),
            };
            merged.insert(key.clone(), combined);
        }
        for (key, series) in &other.series {
            if !merged.contains_key(key) {
                merged.insert(key.clone(), series.clone());
            }
        }
        // Left operand's default scenarios take precedence.
        let mut defaults = self.defaults.clone();
        for (parameter, scenario) in &other.defaults {
            defaults
                .entry(parameter.clone())
                .or_insert_with(|| scenario.clone());
        }
        debug!(n_series = merged.len(), "containers merged");
        Ok(Self {
            series: merged,
            defaults,
        })
    }

    /// Inner-join two series on exact timestamp and apply `op` pointwise.
    ///
    /// Timestamps present in only one series are dropped. Two series with
    /// no shared timestamps yield an empty series, not an error. Points
    /// where `op` produces a non-finite value (e.g. a ratio against zero)
    /// are dropped as well.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::NotFound`] | Either key is absent from the container |
    pub fn combine<F>(
        &self,
        key_a: &SeriesKey,
        key_b: &SeriesKey,
        op: F,
    ) -> Result<ResultSeries, SeriesError>
    where
        F: Fn(f64, f64) -> f64,
    {
        let a = self.require(key_a)?;
        let b = self.require(key_b)?;

        let mut timestamps = Vec::new();
        let mut values = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let (ta, tb) = (a.timestamps()[i], b.timestamps()[j]);
            match ta.cmp(&tb) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    let v = op(a.values()[i], b.values()[j]);
                    if v.is_finite() {
                        timestamps.push(ta);
                        values.push(v);
                    } else {
                        debug!(timestamp = %ta, "dropped non-finite combined value");
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        ResultSeries::new(timestamps, values)
    }

    fn require(&self, key: &SeriesKey) -> Result<&ResultSeries, SeriesError> {
        self.series.get(key).ok_or_else(|| SeriesError::NotFound {
            scenario: key.scenario().to_string(),
            parameter: key.parameter().to_string(),
        })
    }
}

/// Concatenate, re-sort, and deduplicate two series under one key.
fn merge_series(
    key: &SeriesKey,
    left: &ResultSeries,
    right: &ResultSeries,
    tolerance: f64,
) -> Result<ResultSeries, SeriesError> {
    let mut points: Vec<(NaiveDateTime, f64)> = left.points().chain(right.points()).collect();
    // Stable sort keeps left-operand points first at equal timestamps.
    points.sort_by_key(|(t, _)| *t);

    let mut timestamps: Vec<NaiveDateTime> = Vec::with_capacity(points.len());
    let mut values: Vec<f64> = Vec::with_capacity(points.len());
    for (t, v) in points {
        if timestamps.last() == Some(&t) {
            let kept = *values
                .last()
                .unwrap_or(&f64::NAN);
            if (kept - v).abs() <= tolerance {
                continue;
            }
            return Err(SeriesError::ConflictingDuplicate {
                scenario: key.scenario().to_string(),
                parameter: key.parameter().to_string(),
                timestamp: t,
                left: kept,
                right: v,
            });
        }
        timestamps.push(t);
        values.push(v);
    }
    ResultSeries::new(timestamps, values)
}
