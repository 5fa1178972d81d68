//! Result file reader: one delimited text file into header + raw rows.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::error::ImportError;

/// Layout of a result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// First non-empty line names the columns; substring rules allowed.
    DelimitedWithHeader,
    /// Every non-empty line is data; only explicit index rules work.
    DelimitedNoHeader,
}

/// One raw data row: split field values plus the source line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// One-based line number in the source file, for diagnostics.
    pub line: u64,
    /// Field values as split on the delimiter, trimmed.
    pub fields: Vec<String>,
}

/// A fully parsed result file: optional header plus ordered raw rows.
///
/// Constructed transiently per file during a build pass; not retained
/// after extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    /// Path the table was read from.
    pub path: PathBuf,
    /// Header cells, when the file type declares a header line.
    pub header: Option<Vec<String>>,
    /// Data rows in file order.
    pub rows: Vec<RawRow>,
}

/// Reads one tabular result file into a [`RawTable`].
///
/// Blank lines and comment-prefixed lines are skipped. When a header is
/// declared, every data row must match its width; mismatches are reported
/// as [`ImportError::MalformedRow`] with the offending line number — this
/// component only reports, the caller decides whether to skip or abort.
///
/// Reading identical content twice produces identical output.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ImportError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`ImportError::CsvParse`] | Malformed record at the delimiter level |
/// | [`ImportError::MalformedRow`] | Row width differs from header width |
#[derive(Debug, Clone)]
pub struct ResultFileReader {
    path: PathBuf,
    delimiter: u8,
    comment_prefix: Option<u8>,
}

impl ResultFileReader {
    /// Create a reader for the given path. Defaults to tab-delimited with
    /// no comment prefix.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            delimiter: b'\t',
            comment_prefix: None,
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
    pub fn with_comment_prefix(mut self, prefix: Option<u8>) -> Self {
        self.comment_prefix = prefix;
        self
    }

    /// Read and split the file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self, file_type: FileType) -> Result<RawTable, ImportError> {
        let file = std::fs::File::open(&self.path).map_err(|e| ImportError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) allows varying field counts so that our own
        // MalformedRow check fires instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .comment(self.comment_prefix)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut header: Option<Vec<String>> = None;
        let mut rows: Vec<RawRow> = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| ImportError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;
            // A whitespace-only line trims down to a single empty field.
            if record.iter().all(str::is_empty) {
                continue;
            }
            let line = record.position().map_or(0, |p| p.line());
            let fields: Vec<String> = record.iter().map(String::from).collect();

            if file_type == FileType::DelimitedWithHeader && header.is_none() {
                debug!(n_cols = fields.len(), "read header line");
                header = Some(fields);
                continue;
            }
            if let Some(h) = &header {
                if fields.len() != h.len() {
                    return Err(ImportError::MalformedRow {
                        path: self.path.clone(),
                        line,
                        expected: h.len(),
                        got: fields.len(),
                    });
                }
            }
            rows.push(RawRow { line, fields });
        }

        debug!(n_rows = rows.len(), has_header = header.is_some(), "file read");
        Ok(RawTable {
            path: self.path.clone(),
            header,
            rows,
        })
    }
}
