//! Column locator: resolves a logical parameter name to a column index.

use serde::{Deserialize, Serialize};

use crate::error::ImportError;

/// How to locate a data column inside a result file.
///
/// Declarative replacement for any "guess the format" logic: either an
/// explicit zero-based index (header-less files) or a unique substring
/// matched against header cell text (files with a header line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRule {
    /// Explicit zero-based column index.
    Index(usize),
    /// Unique, case-sensitive substring of exactly one header cell.
    HeaderSubstring(String),
}

/// Resolve a column rule to a concrete index.
///
/// Matching is exact substring containment: not case-insensitive, not a
/// regex. This keeps resolution predictable against the heterogeneous
/// header strings different fit software emits.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ImportError::ColumnOutOfRange`] | Explicit index >= `row_width` |
/// | [`ImportError::AmbiguousColumn`] | Substring contained in more than one header cell |
/// | [`ImportError::ColumnNotFound`] | Substring contained in no header cell |
/// | [`ImportError::MissingHeader`] | Substring rule but no header present |
pub fn resolve(
    header: Option<&[String]>,
    rule: &ColumnRule,
    row_width: usize,
) -> Result<usize, ImportError> {
    match rule {
        ColumnRule::Index(index) => {
            if *index >= row_width {
                return Err(ImportError::ColumnOutOfRange {
                    index: *index,
                    width: row_width,
                });
            }
            Ok(*index)
        }
        ColumnRule::HeaderSubstring(substring) => {
            let header = header.ok_or_else(|| ImportError::MissingHeader {
                substring: substring.clone(),
            })?;
            let mut matches = header
                .iter()
                .enumerate()
                .filter(|(_, cell)| cell.contains(substring.as_str()))
                .map(|(i, _)| i);
            let first = matches.next().ok_or_else(|| ImportError::ColumnNotFound {
                substring: substring.clone(),
            })?;
            if let Some(second) = matches.next() {
                return Err(ImportError::AmbiguousColumn {
                    substring: substring.clone(),
                    first,
                    second,
                });
            }
            Ok(first)
        }
    }
}
