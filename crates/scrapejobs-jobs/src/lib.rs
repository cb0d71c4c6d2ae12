//! # scrapejobs jobs
//!
//! Scrape job lifecycle on top of a lock-prone store.
//!
//! ## Features
//!
//! - Job and job data validation
//! - Swappable job repositories (in-memory, SQLite)
//! - Busy-store retry with exponential backoff, jitter and cancellation
//! - Job service with artifact cleanup and pending-job selection
//! - Runner that streams handler results into projected CSV files

pub mod config;
pub mod error;
pub mod job;
pub mod retry;
pub mod runner;
pub mod service;
pub mod store;

pub use config::RunnerConfig;
pub use error::JobError;
pub use job::{Job, JobData, JobStatus, ValidationError};
pub use retry::{RetryConfig, RetryingRepository, is_busy_error};
pub use runner::{JobHandler, JobRunner};
pub use service::JobService;
pub use store::{JobRepository, MemoryJobRepository, SelectParams};
