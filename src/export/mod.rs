//! Export adapters that consume row streams.
//!
//! - [`to_csv`] writes any row stream to a CSV file.
//! - `to_dataframe` (feature `dataframe`) builds a typed `polars` frame
//!   indexed by the dataset's primary key.

mod csv_writer;
#[cfg(feature = "dataframe")]
mod dataframe;

pub use csv_writer::{to_csv, CsvOptions};
#[cfg(feature = "dataframe")]
pub use dataframe::{build_frame, to_dataframe, IndexedFrame};

/// Quoting styles accepted by [`CsvOptions`].
pub use ::csv::QuoteStyle;
