//! Job runner: claims pending jobs and exports their results.

use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use scrapejobs_export::{ExportError, FilteredCsvWriter, ResultData};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::RunnerConfig;
use crate::error::JobError;
use crate::job::{Job, JobStatus};
use crate::service::JobService;

/// Produces the results of a job.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run the job, sending results on `results`. The channel closes when
    /// every clone of the sender is dropped.
    async fn handle(&self, job: &Job, results: mpsc::Sender<ResultData>) -> Result<(), JobError>;
}

/// Claims pending jobs one at a time and writes their CSV artifacts.
pub struct JobRunner<H: JobHandler> {
    service: Arc<JobService>,
    handler: Arc<H>,
    config: RunnerConfig,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
}

impl<H: JobHandler + 'static> JobRunner<H> {
    /// Create a new runner.
    pub fn new(service: Arc<JobService>, handler: Arc<H>, config: RunnerConfig) -> Self {
        Self {
            service,
            handler,
            config,
            jobs_completed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
        }
    }

    /// Get completed job count.
    pub fn jobs_completed(&self) -> u64 {
        self.jobs_completed.load(Ordering::SeqCst)
    }

    /// Get failed job count.
    pub fn jobs_failed(&self) -> u64 {
        self.jobs_failed.load(Ordering::SeqCst)
    }

    /// Poll for pending jobs until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Job runner started");

        while !cancel.is_cancelled() {
            let idle = match self.run_once(&cancel).await {
                Ok(Some(_)) => false,
                Ok(None) => true,
                Err(JobError::Cancelled { .. }) => break,
                Err(e) => {
                    error!("Failed to claim job: {}", e);
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(self.config.poll_interval) => {}
                }
            }
        }

        info!("Job runner stopped");
    }

    /// Claim and process the next pending job, if any.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<Option<Job>, JobError> {
        let Some(job) = self.service.claim_next(cancel).await? else {
            return Ok(None);
        };

        let status = match self.execute(&job).await {
            Ok(rows) => {
                info!("Job '{}' exported {} rows", job.id, rows);
                self.jobs_completed.fetch_add(1, Ordering::SeqCst);
                JobStatus::Ok
            }
            Err(e) => {
                error!("Job '{}' failed: {}", job.id, e);
                self.jobs_failed.fetch_add(1, Ordering::SeqCst);
                JobStatus::Failed
            }
        };

        // Terminal status is recorded even during shutdown
        let job = self
            .service
            .finish(&CancellationToken::new(), job, status)
            .await?;
        Ok(Some(job))
    }

    /// Run the handler and stream its results into the job's artifact.
    async fn execute(&self, job: &Job) -> Result<u64, JobError> {
        let path = self.service.artifact_path(&job.id)?;
        tokio::fs::create_dir_all(self.service.data_folder()).await?;
        let file = tokio::fs::File::create(&path).await?.into_std().await;
        debug!("Writing results of job '{}' to {:?}", job.id, path);

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let fields = job.data.fields.clone();
        // CSV encoding and file writes block, so the writer gets its own thread.
        let writer_task = tokio::task::spawn_blocking(move || {
            let mut writer = FilteredCsvWriter::new(BufWriter::new(file), &fields);
            writer.run_blocking(rx)?;
            let rows = writer.rows_written();
            writer.into_inner()?.flush()?;
            Ok::<u64, ExportError>(rows)
        });

        let handled = match timeout(job.data.max_time, self.handler.handle(job, tx)).await {
            Ok(result) => result,
            Err(_) => {
                info!("Job '{}' reached its max time of {:?}", job.id, job.data.max_time);
                Ok(())
            }
        };

        let rows = writer_task
            .await
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))??;
        handled?;
        Ok(rows)
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
