//! Job definition, status and validation.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Job status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting to be claimed.
    #[default]
    Pending,
    /// Claimed by a runner.
    Working,
    /// Completed successfully.
    Ok,
    /// Completed with an error.
    Failed,
}

impl JobStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Working => "working",
            JobStatus::Ok => "ok",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "working" => Ok(JobStatus::Working),
            "ok" => Ok(JobStatus::Ok),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

/// Job and job data validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing id")]
    MissingId,
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("missing name")]
    MissingName,
    #[error("missing date")]
    MissingDate,
    #[error("missing keywords")]
    MissingKeywords,
    #[error("missing lang")]
    MissingLang,
    #[error("invalid lang")]
    InvalidLang,
    #[error("missing depth")]
    MissingDepth,
    #[error("missing max time")]
    MissingMaxTime,
    #[error("missing geo coordinates")]
    MissingGeoCoordinates,
}

/// Check that an identifier can be used as a file name inside the data folder.
pub fn is_safe_file_name(id: &str) -> bool {
    !(id.contains('/') || id.contains('\\') || id.contains(".."))
}

/// Scrape parameters carried by a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobData {
    pub keywords: Vec<String>,
    pub lang: String,
    #[serde(default)]
    pub zoom: u32,
    #[serde(default)]
    pub lat: String,
    #[serde(default)]
    pub lon: String,
    #[serde(default)]
    pub fast_mode: bool,
    #[serde(default)]
    pub radius: u32,
    pub depth: u32,
    #[serde(default)]
    pub email: bool,
    pub max_time: Duration,
    #[serde(default)]
    pub proxies: Vec<String>,
    /// Comma-separated export columns, empty for all.
    #[serde(default)]
    pub fields: String,
}

impl JobData {
    /// Validate the scrape parameters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.keywords.is_empty() {
            return Err(ValidationError::MissingKeywords);
        }

        if self.lang.is_empty() {
            return Err(ValidationError::MissingLang);
        }

        if self.lang.chars().count() != 2 {
            return Err(ValidationError::InvalidLang);
        }

        if self.depth == 0 {
            return Err(ValidationError::MissingDepth);
        }

        if self.max_time.is_zero() {
            return Err(ValidationError::MissingMaxTime);
        }

        if self.fast_mode && (self.lat.is_empty() || self.lon.is_empty()) {
            return Err(ValidationError::MissingGeoCoordinates);
        }

        Ok(())
    }
}

/// A scrape job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Caller-assigned identifier, also the artifact file stem.
    pub id: String,
    pub name: String,
    pub date: DateTime<Utc>,
    pub status: JobStatus,
    pub data: JobData,
}

impl Job {
    /// Create a pending job with a fresh identifier.
    pub fn new(name: impl Into<String>, data: JobData) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            date: Utc::now(),
            status: JobStatus::Pending,
            data,
        }
    }

    /// Set the job status.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    /// Validate the job before it is persisted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingId);
        }

        if !is_safe_file_name(&self.id) {
            return Err(ValidationError::InvalidId(self.id.clone()));
        }

        if self.name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        if self.date == DateTime::<Utc>::default() {
            return Err(ValidationError::MissingDate);
        }

        self.data.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_data() -> JobData {
        JobData {
            keywords: vec!["coffee in berlin".to_string()],
            lang: "en".to_string(),
            zoom: 15,
            depth: 10,
            max_time: Duration::from_secs(600),
            ..Default::default()
        }
    }

    fn valid_job() -> Job {
        Job::new("berlin coffee", valid_data())
    }

    #[test]
    fn test_job_new() {
        let job = valid_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(!job.id.is_empty());
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_missing_scalar_fields() {
        let mut job = valid_job();
        job.id.clear();
        assert_eq!(job.validate(), Err(ValidationError::MissingId));

        let mut job = valid_job();
        job.name.clear();
        assert_eq!(job.validate(), Err(ValidationError::MissingName));

        let mut job = valid_job();
        job.date = DateTime::<Utc>::default();
        assert_eq!(job.validate(), Err(ValidationError::MissingDate));
    }

    #[test]
    fn test_unsafe_id() {
        for id in ["../etc", "a/b", "a\\b", ".."] {
            let mut job = valid_job();
            job.id = id.to_string();
            assert!(matches!(job.validate(), Err(ValidationError::InvalidId(_))));
        }
    }

    #[test]
    fn test_missing_data_fields() {
        let mut data = valid_data();
        data.keywords.clear();
        assert_eq!(data.validate(), Err(ValidationError::MissingKeywords));

        let mut data = valid_data();
        data.lang.clear();
        assert_eq!(data.validate(), Err(ValidationError::MissingLang));

        let mut data = valid_data();
        data.lang = "eng".to_string();
        assert_eq!(data.validate(), Err(ValidationError::InvalidLang));

        let mut data = valid_data();
        data.depth = 0;
        assert_eq!(data.validate(), Err(ValidationError::MissingDepth));

        let mut data = valid_data();
        data.max_time = Duration::ZERO;
        assert_eq!(data.validate(), Err(ValidationError::MissingMaxTime));
    }

    #[test]
    fn test_invalid_data_fails_job() {
        let mut job = valid_job();
        job.data.depth = 0;
        assert_eq!(job.validate(), Err(ValidationError::MissingDepth));
    }

    #[test]
    fn test_fast_mode_requires_coordinates() {
        let mut data = valid_data();
        data.fast_mode = true;
        assert_eq!(data.validate(), Err(ValidationError::MissingGeoCoordinates));

        data.lat = "52.52".to_string();
        assert_eq!(data.validate(), Err(ValidationError::MissingGeoCoordinates));

        data.lat.clear();
        data.lon = "13.40".to_string();
        assert_eq!(data.validate(), Err(ValidationError::MissingGeoCoordinates));

        data.lat = "52.52".to_string();
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_coordinates_optional_without_fast_mode() {
        let data = valid_data();
        assert!(!data.fast_mode);
        assert!(data.lat.is_empty());
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_status_round_trip_str() {
        for status in [JobStatus::Pending, JobStatus::Working, JobStatus::Ok, JobStatus::Failed] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("done".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Working).unwrap();
        assert_eq!(json, "\"working\"");
    }
}
