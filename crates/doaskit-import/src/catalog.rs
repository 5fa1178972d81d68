//! Built-in catalog of result file format templates.
//!
//! Import specifications for well-known third-party fit software ship as an
//! embedded JSON resource. A template describes the file layout (delimiter,
//! header presence, timestamp columns, time formats); stamping it with a
//! scenario ID and parameter rules yields an ordinary [`ImportSpec`] that
//! the builder treats like any hand-written one.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::error::ImportError;
use crate::locator::ColumnRule;
use crate::reader::FileType;
use crate::spec::{ImportSpec, TimestampRule};

const BUILTIN_CATALOG: &str = include_str!("../resources/catalog.json");

/// Timestamp layout of a format template: a start column and an optional
/// separate stop column.
#[derive(Debug, Clone, Deserialize)]
pub struct TimestampLayout {
    /// Column holding the acquisition start timestamp.
    pub start: ColumnRule,
    /// Column holding the acquisition stop timestamp, if the format records one.
    #[serde(default)]
    pub stop: Option<ColumnRule>,
}

/// File-layout description of one well-known result format.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatTemplate {
    /// Catalog lookup name, e.g. `doasis`.
    pub name: String,
    /// Field delimiter. Must be a single ASCII character.
    #[serde(deserialize_with = "ascii_char")]
    pub delimiter: char,
    /// Whether files carry a header line.
    pub has_header: bool,
    /// Conventional file extension, usable as a builder filename filter.
    #[serde(default)]
    pub extension: Option<String>,
    /// Comment line prefix, if the format allows comments. ASCII only.
    #[serde(default, deserialize_with = "ascii_char_opt")]
    pub comment_prefix: Option<char>,
    /// Timestamp column layout.
    pub timestamp: TimestampLayout,
    /// Candidate `chrono` formats for timestamp cells, tried in order.
    pub time_formats: Vec<String>,
    /// Relative column offset of each parameter's fit error, if recorded.
    #[serde(default)]
    pub fit_err_offset: Option<usize>,
    /// Correction factor applied to imported fit errors.
    #[serde(default)]
    pub fit_err_corr: Option<f64>,
}

// Delimiters and comment prefixes feed a byte-oriented reader; a multi-byte
// character would be silently truncated, so reject it at parse time.
fn ascii_char<'de, D>(deserializer: D) -> Result<char, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let c = char::deserialize(deserializer)?;
    if !c.is_ascii() {
        return Err(serde::de::Error::custom(format!(
            "{c:?} is not an ASCII character"
        )));
    }
    Ok(c)
}

fn ascii_char_opt<'de, D>(deserializer: D) -> Result<Option<char>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<char>::deserialize(deserializer)? {
        Some(c) if !c.is_ascii() => Err(serde::de::Error::custom(format!(
            "{c:?} is not an ASCII character"
        ))),
        other => Ok(other),
    }
}

impl FormatTemplate {
    /// Return the file type implied by `has_header`.
    #[must_use]
    pub fn file_type(&self) -> FileType {
        if self.has_header {
            FileType::DelimitedWithHeader
        } else {
            FileType::DelimitedNoHeader
        }
    }

    /// Return the timestamp rule implied by this template.
    #[must_use]
    pub fn timestamp_rule(&self) -> TimestampRule {
        match &self.timestamp.stop {
            Some(stop) => TimestampRule::start_stop(
                self.timestamp.start.clone(),
                stop.clone(),
                self.time_formats.clone(),
            ),
            None => TimestampRule::single(self.timestamp.start.clone(), self.time_formats.clone()),
        }
    }
}

impl ImportSpec {
    /// Stamp a format template into a concrete specification for one
    /// scenario, declaring the given parameters.
    #[must_use]
    pub fn from_template(
        scenario_id: impl Into<String>,
        template: &FormatTemplate,
        parameters: Vec<(String, ColumnRule)>,
    ) -> Self {
        let mut spec = ImportSpec::new(scenario_id, template.file_type(), template.timestamp_rule())
            .with_delimiter(template.delimiter as u8);
        if let Some(prefix) = template.comment_prefix {
            spec = spec.with_comment_prefix(prefix as u8);
        }
        if let Some(offset) = template.fit_err_offset {
            spec = spec.with_fit_err_offset(offset);
        }
        if let Some(factor) = template.fit_err_corr {
            spec = spec.with_fit_err_corr(factor);
        }
        for (name, rule) in parameters {
            spec = spec.with_parameter(name, rule);
        }
        spec
    }
}

/// Immutable registry of format templates, keyed by name.
#[derive(Debug, Clone)]
pub struct Catalog {
    templates: BTreeMap<String, FormatTemplate>,
}

impl Catalog {
    /// Parse a catalog from a JSON array of templates.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ImportError::CatalogParse`] | The JSON does not describe a template list |
    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        let templates: Vec<FormatTemplate> =
            serde_json::from_str(json).map_err(|e| ImportError::CatalogParse { source: e })?;
        Ok(Self {
            templates: templates.into_iter().map(|t| (t.name.clone(), t)).collect(),
        })
    }

    /// Return the process-wide catalog of built-in formats, loaded once.
    #[must_use]
    pub fn builtin() -> &'static Catalog {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(|| {
            Catalog::from_json(BUILTIN_CATALOG).expect("embedded catalog resource is valid JSON")
        })
    }

    /// Look up a template by name.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ImportError::UnknownFormat`] | No template with this name |
    pub fn get(&self, name: &str) -> Result<&FormatTemplate, ImportError> {
        self.templates
            .get(name)
            .ok_or_else(|| ImportError::UnknownFormat {
                name: name.to_string(),
            })
    }

    /// Return the available format names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }
}
