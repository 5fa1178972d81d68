//! Series keys: (fit scenario, parameter) pairs.

use std::fmt;

/// Key identifying one extracted series: a fit scenario ID paired with a
/// parameter name.
///
/// Ordered so that container iteration is deterministic (scenario first,
/// then parameter).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesKey {
    scenario: String,
    parameter: String,
}

impl SeriesKey {
    /// Create a new key from a scenario ID and a parameter name.
    pub fn new(scenario: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            parameter: parameter.into(),
        }
    }

    /// Return the fit scenario ID.
    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Return the parameter name.
    #[must_use]
    pub fn parameter(&self) -> &str {
        &self.parameter
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scenario, self.parameter)
    }
}
