//! # scrapejobs export
//!
//! Streams scrape results into CSV, keeping only a selected set of columns.
//!
//! ## Features
//!
//! - Single records and record collections on the same channel
//! - Case-insensitive column selection, record order preserved
//! - Header written once, from the first record

pub mod error;
pub mod record;
pub mod selection;
pub mod writer;

pub use error::ExportError;
pub use record::{FieldRecord, Record, ResultData};
pub use selection::FieldSelection;
pub use writer::FilteredCsvWriter;
