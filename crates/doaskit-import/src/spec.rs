//! Fit scenario import specifications and scenario-to-file matching.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use crate::error::ImportError;
use crate::locator::ColumnRule;
use crate::reader::FileType;

/// Anchor date for time-only timestamp formats (e.g. `%H:%M`). Result files
/// that only record a clock time are pinned to this date so the values stay
/// ordered and comparable.
const TIME_ONLY_ANCHOR: (i32, u32, u32) = (1900, 1, 1);

/// Which column(s) hold the acquisition timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TimestampColumns {
    /// One combined start timestamp column.
    Single(ColumnRule),
    /// Separate start and stop timestamp columns.
    StartStop {
        /// Column holding the acquisition start.
        start: ColumnRule,
        /// Column holding the acquisition stop.
        stop: ColumnRule,
    },
}

/// Rule for locating and parsing acquisition timestamps.
///
/// Carries a list of candidate `chrono` format strings; the first format
/// that parses a given cell wins. Formats lacking a date part are anchored
/// to a fixed date, formats lacking a time part default to midnight.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimestampRule {
    columns: TimestampColumns,
    formats: Vec<String>,
}

impl TimestampRule {
    /// Rule with a single combined start timestamp column.
    pub fn single(column: ColumnRule, formats: Vec<String>) -> Self {
        Self {
            columns: TimestampColumns::Single(column),
            formats,
        }
    }

    /// Rule with separate start and stop columns.
    pub fn start_stop(start: ColumnRule, stop: ColumnRule, formats: Vec<String>) -> Self {
        Self {
            columns: TimestampColumns::StartStop { start, stop },
            formats,
        }
    }

    /// Return the column layout.
    #[must_use]
    pub fn columns(&self) -> &TimestampColumns {
        &self.columns
    }

    /// Return the candidate format strings.
    #[must_use]
    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Parse a raw timestamp cell, trying each candidate format in order.
    #[must_use]
    pub fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        self.formats.iter().find_map(|fmt| parse_with(raw, fmt))
    }
}

fn parse_with(raw: &str, fmt: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
        return Some(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
        return d.and_hms_opt(0, 0, 0);
    }
    if let Ok(t) = NaiveTime::parse_from_str(raw, fmt) {
        let (y, m, d) = TIME_ONLY_ANCHOR;
        return NaiveDate::from_ymd_opt(y, m, d).map(|date| date.and_time(t));
    }
    None
}

/// Declarative binding of a fit scenario to its result files and columns.
///
/// The scenario ID is a short token expected to occur as a case-sensitive
/// substring of each of the scenario's result file names, e.g. `f01so2` in
/// `D130909_S0628_f01so2.dat`. Parameters map logical names to column
/// rules; an optional fit error offset additionally imports each
/// parameter's fit error from `column + offset` as `<parameter>_err`,
/// scaled by a correction factor since raw DOAS fit errors are typically
/// underestimated.
///
/// Construct via [`ImportSpec::new`], chain `with_*` methods, and let the
/// dataset builder run [`ImportSpec::validate`] before any file is read.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    scenario_id: String,
    file_type: FileType,
    delimiter: u8,
    comment_prefix: Option<u8>,
    timestamp_rule: TimestampRule,
    parameters: Vec<(String, ColumnRule)>,
    fit_err_offset: Option<usize>,
    fit_err_corr: f64,
}

impl ImportSpec {
    /// Create a specification with no parameters. Defaults to tab-delimited
    /// with no comment prefix.
    pub fn new(
        scenario_id: impl Into<String>,
        file_type: FileType,
        timestamp_rule: TimestampRule,
    ) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            file_type,
            delimiter: b'\t',
            comment_prefix: None,
            timestamp_rule,
            parameters: Vec::new(),
            fit_err_offset: None,
            fit_err_corr: 1.0,
        }
    }

    /// Set the field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set a comment prefix; lines starting with it are ignored.
    #[must_use]
    pub fn with_comment_prefix(mut self, prefix: u8) -> Self {
        self.comment_prefix = Some(prefix);
        self
    }

    /// Declare a parameter to extract, mapping its logical name to a
    /// column rule. Order of declaration is preserved.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, rule: ColumnRule) -> Self {
        self.parameters.push((name.into(), rule));
        self
    }

    /// Also import each parameter's fit error from `column + offset` under
    /// the derived name `<parameter>_err`.
    #[must_use]
    pub fn with_fit_err_offset(mut self, offset: usize) -> Self {
        self.fit_err_offset = Some(offset);
        self
    }

    /// Scale imported fit errors by this factor. Defaults to 1.0.
    #[must_use]
    pub fn with_fit_err_corr(mut self, factor: f64) -> Self {
        self.fit_err_corr = factor;
        self
    }

    /// Return the scenario ID.
    #[must_use]
    pub fn scenario_id(&self) -> &str {
        &self.scenario_id
    }

    /// Return the declared file layout.
    #[must_use]
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Return the field delimiter.
    #[must_use]
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Return the comment prefix, if any.
    #[must_use]
    pub fn comment_prefix(&self) -> Option<u8> {
        self.comment_prefix
    }

    /// Return the timestamp rule.
    #[must_use]
    pub fn timestamp_rule(&self) -> &TimestampRule {
        &self.timestamp_rule
    }

    /// Return the declared parameters in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[(String, ColumnRule)] {
        &self.parameters
    }

    /// Return the fit error column offset, if configured.
    #[must_use]
    pub fn fit_err_offset(&self) -> Option<usize> {
        self.fit_err_offset
    }

    /// Return the fit error correction factor.
    #[must_use]
    pub fn fit_err_corr(&self) -> f64 {
        self.fit_err_corr
    }

    /// True iff the scenario ID occurs as a substring of the file name.
    #[must_use]
    pub fn matches(&self, filename: &str) -> bool {
        filename.contains(self.scenario_id.as_str())
    }

    /// Check internal consistency before any file is read.
    ///
    /// # Errors
    ///
    /// [`ImportError::InvalidSpecification`] when the scenario ID is empty,
    /// a parameter name is duplicated, or a substring rule (parameter or
    /// timestamp) is declared for a header-less file type. Two parameters
    /// reading the same explicit column index are allowed.
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.scenario_id.is_empty() {
            return Err(self.invalid("scenario ID must not be empty"));
        }
        for (i, (name, rule)) in self.parameters.iter().enumerate() {
            if self.parameters[..i].iter().any(|(n, _)| n == name) {
                return Err(self.invalid(&format!("duplicate parameter name \"{name}\"")));
            }
            self.check_rule_needs_header(rule, &format!("parameter \"{name}\""))?;
        }
        match self.timestamp_rule.columns() {
            TimestampColumns::Single(col) => {
                self.check_rule_needs_header(col, "timestamp column")?;
            }
            TimestampColumns::StartStop { start, stop } => {
                self.check_rule_needs_header(start, "start timestamp column")?;
                self.check_rule_needs_header(stop, "stop timestamp column")?;
            }
        }
        if self.timestamp_rule.formats().is_empty() {
            return Err(self.invalid("at least one timestamp format is required"));
        }
        if !self.fit_err_corr.is_finite() || self.fit_err_corr <= 0.0 {
            return Err(self.invalid("fit error correction factor must be finite and positive"));
        }
        Ok(())
    }

    fn check_rule_needs_header(&self, rule: &ColumnRule, what: &str) -> Result<(), ImportError> {
        if self.file_type == FileType::DelimitedNoHeader {
            if let ColumnRule::HeaderSubstring(substring) = rule {
                return Err(self.invalid(&format!(
                    "{what} uses substring rule \"{substring}\" but the file type has no header"
                )));
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> ImportError {
        ImportError::InvalidSpecification {
            scenario: self.scenario_id.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Select the specification whose scenario ID matches a filename.
///
/// When several scenario IDs are substrings of the filename the longest
/// wins, so `f01so2` beats `f01` for `f01so2_2017.dat`. Returns `None`
/// when nothing matches — the builder records such files as unmatched.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ImportError::AmbiguousScenarioMatch`] | Two distinct matches of equal maximal length |
pub fn select_spec<'a>(
    filename: &str,
    specs: &'a [ImportSpec],
) -> Result<Option<&'a ImportSpec>, ImportError> {
    let mut best: Option<&ImportSpec> = None;
    for spec in specs.iter().filter(|s| s.matches(filename)) {
        match best {
            None => best = Some(spec),
            Some(current) => {
                let (cur_len, new_len) = (current.scenario_id().len(), spec.scenario_id().len());
                if new_len > cur_len {
                    best = Some(spec);
                } else if new_len == cur_len && spec.scenario_id() != current.scenario_id() {
                    return Err(ImportError::AmbiguousScenarioMatch {
                        filename: filename.to_string(),
                        first: current.scenario_id().to_string(),
                        second: spec.scenario_id().to_string(),
                    });
                }
            }
        }
    }
    Ok(best)
}
