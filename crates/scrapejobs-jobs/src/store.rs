//! Job persistence store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::JobError;
use crate::job::{Job, JobStatus};

/// Filter for [`JobRepository::select`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectParams {
    /// Only return jobs in this status.
    pub status: Option<JobStatus>,
    /// Maximum number of jobs (0 = unlimited).
    pub limit: usize,
}

impl SelectParams {
    /// Select jobs with the given status.
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            limit: 0,
        }
    }

    /// Limit the number of returned jobs.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Job store trait for persistence.
///
/// Implementations never retry; any method may return [`JobError::Busy`]
/// when the backend is locked by another writer.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Load a job by ID. Returns [`JobError::NotFound`] if absent.
    async fn get(&self, id: &str) -> Result<Job, JobError>;

    /// Insert a new job.
    async fn create(&self, job: &Job) -> Result<(), JobError>;

    /// Delete a job. Deleting a missing job is not an error.
    async fn delete(&self, id: &str) -> Result<(), JobError>;

    /// Select jobs ordered by date, oldest first.
    async fn select(&self, params: SelectParams) -> Result<Vec<Job>, JobError>;

    /// Replace an existing job. Returns [`JobError::NotFound`] if absent.
    async fn update(&self, job: &Job) -> Result<(), JobError>;
}

/// In-memory job store for testing.
pub struct MemoryJobRepository {
    jobs: RwLock<HashMap<String, Job>>,
}

impl MemoryJobRepository {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

impl Default for MemoryJobRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn get(&self, id: &str) -> Result<Job, JobError> {
        let jobs = self.jobs.read().await;
        jobs.get(id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    async fn create(&self, job: &Job) -> Result<(), JobError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(JobError::Database(format!("job {} already exists", job.id)));
        }
        jobs.insert(job.id.clone(), job.clone());
        debug!("Created job '{}'", job.id);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), JobError> {
        let mut jobs = self.jobs.write().await;
        jobs.remove(id);
        Ok(())
    }

    async fn select(&self, params: SelectParams) -> Result<Vec<Job>, JobError> {
        let jobs = self.jobs.read().await;
        let mut selected: Vec<Job> = jobs
            .values()
            .filter(|j| params.status.is_none_or(|s| j.status == s))
            .cloned()
            .collect();

        selected.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        if params.limit > 0 {
            selected.truncate(params.limit);
        }

        Ok(selected)
    }

    async fn update(&self, job: &Job) -> Result<(), JobError> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&job.id) {
            Some(existing) => {
                *existing = job.clone();
                Ok(())
            }
            None => Err(JobError::NotFound(job.id.clone())),
        }
    }
}
