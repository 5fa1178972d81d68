//! Time-stamped fit result series and the aggregated result container.

mod container;
mod error;
mod key;
mod series;

pub use container::ResultContainer;
pub use error::SeriesError;
pub use key::SeriesKey;
pub use series::ResultSeries;
