use super::*;
use std::time::Duration;
use tempfile::TempDir;

use scrapejobs_export::FieldRecord;

use crate::job::JobData;
use crate::retry::{RetryConfig, RetryingRepository};
use crate::store::MemoryJobRepository;

/// Handler that emits two places, one of them inside a batch.
struct PlacesHandler;

#[async_trait]
impl JobHandler for PlacesHandler {
    async fn handle(&self, job: &Job, results: mpsc::Sender<ResultData>) -> Result<(), JobError> {
        let headers = ["title", "phone", "address"];
        results
            .send(ResultData::record(FieldRecord::new(
                headers,
                [job.name.as_str(), "555-1212", "1 Main St"],
            )))
            .await
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;
        results
            .send(ResultData::collection(vec![FieldRecord::new(
                headers,
                ["Second", "555-0000", "2 Side St"],
            )]))
            .await
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;
        Ok(())
    }
}

struct FailingHandler;

#[async_trait]
impl JobHandler for FailingHandler {
    async fn handle(&self, _job: &Job, _results: mpsc::Sender<ResultData>) -> Result<(), JobError> {
        Err(JobError::ExecutionFailed("browser crashed".to_string()))
    }
}

struct BadShapeHandler;

#[async_trait]
impl JobHandler for BadShapeHandler {
    async fn handle(&self, _job: &Job, results: mpsc::Sender<ResultData>) -> Result<(), JobError> {
        let _ = results.send(ResultData::unsupported::<f64>()).await;
        Ok(())
    }
}

/// Emits one record, then never finishes.
struct SlowHandler;

#[async_trait]
impl JobHandler for SlowHandler {
    async fn handle(&self, _job: &Job, results: mpsc::Sender<ResultData>) -> Result<(), JobError> {
        let _ = results
            .send(ResultData::record(FieldRecord::new(["title"], ["Early"])))
            .await;
        sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

fn job(name: &str, fields: &str) -> Job {
    Job::new(
        name,
        JobData {
            keywords: vec![name.to_string()],
            lang: "en".to_string(),
            depth: 1,
            max_time: Duration::from_secs(60),
            fields: fields.to_string(),
            ..Default::default()
        },
    )
}

fn setup<H: JobHandler + 'static>(handler: H) -> (TempDir, Arc<JobService>, JobRunner<H>) {
    let dir = TempDir::new().unwrap();
    let repo = RetryingRepository::new(Arc::new(MemoryJobRepository::new()), RetryConfig::default());
    let service = Arc::new(JobService::new(repo, dir.path().join("data")));
    let config = RunnerConfig {
        poll_interval: Duration::from_millis(10),
        ..Default::default()
    };
    let runner = JobRunner::new(service.clone(), Arc::new(handler), config);
    (dir, service, runner)
}

#[tokio::test]
async fn test_run_once_without_jobs() {
    let (_dir, _service, runner) = setup(PlacesHandler);
    let result = runner.run_once(&CancellationToken::new()).await.unwrap();
    assert!(result.is_none());
    assert_eq!(runner.jobs_completed(), 0);
}

#[tokio::test]
async fn test_run_once_exports_selected_fields() {
    let (_dir, service, runner) = setup(PlacesHandler);
    let cancel = CancellationToken::new();
    let job = job("Acme", "Title,PHONE");
    service.create(&cancel, &job).await.unwrap();

    let finished = runner.run_once(&cancel).await.unwrap().unwrap();
    assert_eq!(finished.status, JobStatus::Ok);
    assert_eq!(runner.jobs_completed(), 1);

    let path = service.get_csv(&job.id).await.unwrap();
    let content = std::fs::read_to_string(path).unwrap();
    assert_eq!(content, "title,phone\r\nAcme,555-1212\r\nSecond,555-0000\r\n");

    let stored = service.get(&cancel, &job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Ok);
}

#[tokio::test]
async fn test_handler_failure_marks_job_failed() {
    let (_dir, service, runner) = setup(FailingHandler);
    let cancel = CancellationToken::new();
    let job = job("Broken", "");
    service.create(&cancel, &job).await.unwrap();

    let finished = runner.run_once(&cancel).await.unwrap().unwrap();
    assert_eq!(finished.status, JobStatus::Failed);
    assert_eq!(runner.jobs_failed(), 1);
    assert_eq!(
        service.get(&cancel, &job.id).await.unwrap().status,
        JobStatus::Failed
    );
}

#[tokio::test]
async fn test_unsupported_result_marks_job_failed() {
    let (_dir, service, runner) = setup(BadShapeHandler);
    let cancel = CancellationToken::new();
    let job = job("Shape", "");
    service.create(&cancel, &job).await.unwrap();

    let finished = runner.run_once(&cancel).await.unwrap().unwrap();
    assert_eq!(finished.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_max_time_stops_handler() {
    let (_dir, service, runner) = setup(SlowHandler);
    let cancel = CancellationToken::new();
    let mut job = job("Slow", "");
    job.data.max_time = Duration::from_millis(50);
    service.create(&cancel, &job).await.unwrap();

    let finished = runner.run_once(&cancel).await.unwrap().unwrap();
    assert_eq!(finished.status, JobStatus::Ok);

    let content = std::fs::read_to_string(service.get_csv(&job.id).await.unwrap()).unwrap();
    assert_eq!(content, "title\r\nEarly\r\n");
}

#[tokio::test]
async fn test_run_loop_drains_pending_jobs() {
    let (_dir, service, runner) = setup(PlacesHandler);
    let runner = Arc::new(runner);
    let cancel = CancellationToken::new();

    for name in ["one", "two", "three"] {
        service.create(&cancel, &job(name, "title")).await.unwrap();
    }

    let handle = {
        let runner = runner.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { runner.run(cancel).await })
    };

    for _ in 0..200 {
        if runner.jobs_completed() == 3 {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }

    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(runner.jobs_completed(), 3);
    let jobs = service.all(&CancellationToken::new()).await.unwrap();
    assert!(jobs.iter().all(|j| j.status == JobStatus::Ok));
}
