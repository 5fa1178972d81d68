//! Import of DOAS fit result files into aggregated time series.

mod builder;
mod catalog;
mod error;
mod locator;
mod reader;
mod report;
mod spec;

pub use builder::{BuildOutcome, DatasetBuilder};
pub use catalog::{Catalog, FormatTemplate, TimestampLayout};
pub use error::ImportError;
pub use locator::ColumnRule;
pub use reader::{FileType, RawRow, RawTable, ResultFileReader};
pub use report::{DuplicateRecord, FileFailure, ImportReport};
pub use spec::{select_spec, ImportSpec, TimestampColumns, TimestampRule};
