//! Job lifecycle service.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::JobError;
use crate::job::{Job, JobStatus, is_safe_file_name};
use crate::retry::RetryingRepository;
use crate::store::SelectParams;

/// Extension of exported result files.
pub const ARTIFACT_EXTENSION: &str = "csv";

/// Job lifecycle operations on top of a retrying repository.
///
/// Each job may own one exported CSV artifact named `<id>.csv` inside the
/// data folder.
pub struct JobService {
    repo: RetryingRepository,
    data_folder: PathBuf,
}

impl JobService {
    /// Create a new service.
    pub fn new(repo: RetryingRepository, data_folder: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            data_folder: data_folder.into(),
        }
    }

    /// Get the data folder root.
    pub fn data_folder(&self) -> &Path {
        &self.data_folder
    }

    /// Validate and store a new job.
    pub async fn create(&self, cancel: &CancellationToken, job: &Job) -> Result<(), JobError> {
        job.validate()?;
        self.repo.create(cancel, job).await?;
        info!("Created job '{}' ({})", job.id, job.name);
        Ok(())
    }

    /// Load a job.
    pub async fn get(&self, cancel: &CancellationToken, id: &str) -> Result<Job, JobError> {
        self.repo.get(cancel, id).await
    }

    /// List every job, oldest first.
    pub async fn all(&self, cancel: &CancellationToken) -> Result<Vec<Job>, JobError> {
        self.repo.select(cancel, SelectParams::default()).await
    }

    /// Validate and replace a job.
    pub async fn update(&self, cancel: &CancellationToken, job: &Job) -> Result<(), JobError> {
        job.validate()?;
        self.repo.update(cancel, job).await
    }

    /// Remove a job's artifact, then its row.
    pub async fn delete(&self, cancel: &CancellationToken, id: &str) -> Result<(), JobError> {
        let path = self.artifact_path(id)?;

        match fs::remove_file(&path).await {
            Ok(()) => debug!("Removed artifact {:?}", path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.repo.delete(cancel, id).await?;
        info!("Deleted job '{}'", id);
        Ok(())
    }

    /// Return the next pending job, if any.
    ///
    /// The job is not claimed: two callers may receive the same job until
    /// one of them moves it to `working`.
    pub async fn select_pending(&self, cancel: &CancellationToken) -> Result<Option<Job>, JobError> {
        let params = SelectParams::with_status(JobStatus::Pending).limit(1);
        let jobs = self.repo.select(cancel, params).await?;
        Ok(jobs.into_iter().next())
    }

    /// Select the next pending job and mark it `working`.
    pub async fn claim_next(&self, cancel: &CancellationToken) -> Result<Option<Job>, JobError> {
        let Some(mut job) = self.select_pending(cancel).await? else {
            return Ok(None);
        };

        job.status = JobStatus::Working;
        self.repo.update(cancel, &job).await?;
        info!("Claimed job '{}'", job.id);
        Ok(Some(job))
    }

    /// Move a job to a terminal status.
    pub async fn finish(
        &self,
        cancel: &CancellationToken,
        mut job: Job,
        status: JobStatus,
    ) -> Result<Job, JobError> {
        job.status = status;
        self.repo.update(cancel, &job).await?;
        info!("Job '{}' finished: {}", job.id, status);
        Ok(job)
    }

    /// Locate the exported artifact of a job.
    ///
    /// Only the filesystem is consulted. A job that exists but has not
    /// produced output yet yields [`JobError::ArtifactNotFound`].
    pub async fn get_csv(&self, id: &str) -> Result<PathBuf, JobError> {
        let path = self.artifact_path(id)?;

        if fs::try_exists(&path).await? {
            Ok(path)
        } else {
            Err(JobError::ArtifactNotFound(id.to_string()))
        }
    }

    /// Path of a job's artifact, rejecting names that escape the data folder.
    pub fn artifact_path(&self, id: &str) -> Result<PathBuf, JobError> {
        if id.is_empty() || !is_safe_file_name(id) {
            return Err(JobError::InvalidName(id.to_string()));
        }
        Ok(self
            .data_folder
            .join(format!("{}.{}", id, ARTIFACT_EXTENSION)))
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
