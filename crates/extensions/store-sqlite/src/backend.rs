//! SQLite job repository implementation.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{ErrorCode, OptionalExtension, params};
use tokio_rusqlite::Connection;
use tracing::debug;

use scrapejobs_jobs::{Job, JobError, JobRepository, JobStatus, SelectParams};

use crate::schema::init_schema;

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;

/// Lock wait while switching to WAL and creating the schema. Another process
/// may still be checkpointing the file while it closes.
const SETUP_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str = "SELECT id, name, status, data, created_at FROM jobs";

/// SQLite-based job repository.
pub struct SqliteJobRepository {
    conn: Connection,
}

impl SqliteJobRepository {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self, JobError> {
        let conn = Connection::open_in_memory().await.map_err(into_job_error)?;

        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(into_job_error)?;

        Ok(Self { conn })
    }

    /// Open a file-backed database in WAL mode.
    ///
    /// `busy_timeout` is how long SQLite itself waits on a lock before
    /// reporting `SQLITE_BUSY` once the database is open; zero reports
    /// contention immediately.
    pub async fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, JobError> {
        let path = path.as_ref().to_path_buf();
        debug!("Opening job database at {:?}", path);
        let conn = Connection::open(path).await.map_err(into_job_error)?;

        conn.call(move |conn| {
            conn.busy_timeout(SETUP_BUSY_TIMEOUT)?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
            init_schema(conn)?;
            conn.busy_timeout(busy_timeout)?;
            Ok(())
        })
        .await
        .map_err(into_job_error)?;

        Ok(Self { conn })
    }

    /// Close the connection, waiting for SQLite to release the file.
    pub async fn close(self) -> Result<(), JobError> {
        self.conn.close().await.map_err(into_job_error)
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn get(&self, id: &str) -> Result<Job, JobError> {
        let key = id.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                        [&key],
                        JobRow::from_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(into_job_error)?;

        match row {
            Some(row) => row.into_job(),
            None => Err(JobError::NotFound(id.to_string())),
        }
    }

    async fn create(&self, job: &Job) -> Result<(), JobError> {
        let row = JobRow::from_job(job)?;
        let now = timestamp(&Utc::now());

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO jobs (id, name, status, data, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![row.id, row.name, row.status, row.data, row.created_at, now],
                )?;
                Ok(())
            })
            .await
            .map_err(into_job_error)
    }

    async fn delete(&self, id: &str) -> Result<(), JobError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM jobs WHERE id = ?1", [&id])?;
                Ok(())
            })
            .await
            .map_err(into_job_error)
    }

    async fn select(&self, params: SelectParams) -> Result<Vec<Job>, JobError> {
        let status = params.status.map(|s| s.as_str().to_string());
        // SQLite treats a negative LIMIT as unlimited
        let limit = if params.limit == 0 {
            -1
        } else {
            i64::try_from(params.limit).unwrap_or(i64::MAX)
        };

        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE (?1 IS NULL OR status = ?1)
                     ORDER BY created_at ASC, id ASC LIMIT ?2",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![status, limit], JobRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(into_job_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn update(&self, job: &Job) -> Result<(), JobError> {
        let row = JobRow::from_job(job)?;
        let now = timestamp(&Utc::now());

        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE jobs SET name = ?1, status = ?2, data = ?3, created_at = ?4,
                     updated_at = ?5 WHERE id = ?6",
                    params![row.name, row.status, row.data, row.created_at, now, row.id],
                )?;
                Ok(changed)
            })
            .await
            .map_err(into_job_error)?;

        if changed == 0 {
            return Err(JobError::NotFound(job.id.clone()));
        }
        Ok(())
    }
}

/// A job as stored in the `jobs` table.
struct JobRow {
    id: String,
    name: String,
    status: String,
    data: String,
    created_at: String,
}

impl JobRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            status: row.get(2)?,
            data: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn from_job(job: &Job) -> Result<Self, JobError> {
        let data = serde_json::to_string(&job.data)
            .map_err(|e| JobError::Database(format!("Failed to serialize job data: {}", e)))?;

        Ok(Self {
            id: job.id.clone(),
            name: job.name.clone(),
            status: job.status.as_str().to_string(),
            data,
            created_at: timestamp(&job.date),
        })
    }

    fn into_job(self) -> Result<Job, JobError> {
        let status: JobStatus = self.status.parse().map_err(JobError::Database)?;
        let data = serde_json::from_str(&self.data).map_err(|e| {
            JobError::Database(format!("Failed to deserialize job {}: {}", self.id, e))
        })?;
        let date = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| JobError::Database(format!("Invalid date for job {}: {}", self.id, e)))?
            .with_timezone(&Utc);

        Ok(Job {
            id: self.id,
            name: self.name,
            date,
            status,
            data,
        })
    }
}

/// Fixed-width RFC 3339 so text order matches time order.
fn timestamp(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn into_job_error(error: tokio_rusqlite::Error) -> JobError {
    match error {
        tokio_rusqlite::Error::Rusqlite(e) => from_rusqlite(e),
        other => JobError::Database(other.to_string()),
    }
}

fn from_rusqlite(error: rusqlite::Error) -> JobError {
    match &error {
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            JobError::Busy(error.to_string())
        }
        _ => JobError::Database(error.to_string()),
    }
}
