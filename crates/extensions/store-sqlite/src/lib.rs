//! SQLite job repository for scrapejobs.
//!
//! Lock contention is reported as [`scrapejobs_jobs::JobError::Busy`] and left
//! to the retrying layer.

mod backend;
mod schema;

pub use backend::SqliteJobRepository;
