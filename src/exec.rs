//! Job handler that delegates scraping to an external process.
//!
//! The process receives the job as one JSON line on stdin and prints one
//! JSON value per result on stdout: an object becomes a row, an array of
//! objects becomes a batch of rows.

use std::process::Stdio;

use async_trait::async_trait;
use scrapejobs_export::{FieldRecord, ResultData};
use scrapejobs_jobs::{Job, JobError, JobHandler};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Runs `program args...` once per job.
pub(crate) struct ExecHandler {
    program: String,
    args: Vec<String>,
}

impl ExecHandler {
    pub(crate) fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl JobHandler for ExecHandler {
    async fn handle(&self, job: &Job, results: mpsc::Sender<ResultData>) -> Result<(), JobError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| JobError::ExecutionFailed("Failed to capture stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| JobError::ExecutionFailed("Failed to capture stdout".to_string()))?;

        let request = serde_json::to_string(job)
            .map_err(|e| JobError::ExecutionFailed(format!("Failed to encode job: {}", e)))?;
        stdin.write_all(request.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        drop(stdin);

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let item = match serde_json::from_str::<Value>(&line) {
                Ok(value) => to_result(value),
                Err(e) => {
                    warn!("Skipping malformed output line for job '{}': {}", job.id, e);
                    continue;
                }
            };
            if results.send(item).await.is_err() {
                // Nobody drains stdout any more; the writer's error is reported instead.
                debug!("Result writer closed for job '{}', stopping {}", job.id, self.program);
                drop(lines);
                if let Err(e) = child.kill().await {
                    warn!("Failed to stop {}: {}", self.program, e);
                }
                return Ok(());
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(JobError::ExecutionFailed(format!(
                "{} exited with {}",
                self.program, status
            )));
        }
        Ok(())
    }
}

/// Map one decoded output value to a writer input.
fn to_result(value: Value) -> ResultData {
    match value {
        Value::Object(map) => ResultData::record(to_record(map)),
        Value::Array(items) => ResultData::Collection(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => ResultData::record(to_record(map)),
                    _ => ResultData::unsupported::<Value>(),
                })
                .collect(),
        ),
        _ => ResultData::unsupported::<Value>(),
    }
}

fn to_record(map: Map<String, Value>) -> FieldRecord {
    FieldRecord::from_pairs(map.into_iter().map(|(key, value)| {
        let text = match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        (key, text)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrapejobs_export::Record;

    #[test]
    fn test_object_becomes_record_in_key_order() {
        let value: Value =
            serde_json::from_str(r#"{"title":"Acme","rating":4.5,"phone":null}"#).unwrap();

        let ResultData::Record(record) = to_result(value) else {
            panic!("expected record");
        };
        assert_eq!(record.headers(), vec!["title", "rating", "phone"]);
        assert_eq!(record.row(), vec!["Acme", "4.5", ""]);
    }

    #[test]
    fn test_array_becomes_collection() {
        let value: Value = serde_json::from_str(r#"[{"a":"1"},{"a":"2"},3]"#).unwrap();

        let ResultData::Collection(items) = to_result(value) else {
            panic!("expected collection");
        };
        assert_eq!(items.len(), 3);
        assert!(matches!(items[2], ResultData::Unsupported { .. }));
    }

    #[test]
    fn test_scalar_is_unsupported() {
        assert!(matches!(
            to_result(Value::from("text")),
            ResultData::Unsupported { .. }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_handle_streams_process_output() {
        let handler = ExecHandler::new(
            "sh",
            vec![
                "-c".to_string(),
                r#"read job; echo '{"name":"Acme"}'; echo; echo '{"name":"Bolt"}'"#.to_string(),
            ],
        );
        let (tx, mut rx) = mpsc::channel(8);

        handler.handle(&Job::default(), tx).await.unwrap();

        let mut names = Vec::new();
        while let Some(ResultData::Record(record)) = rx.recv().await {
            names.push(record.row()[0].clone());
        }
        assert_eq!(names, vec!["Acme", "Bolt"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_handle_stops_process_when_writer_closes() {
        let handler = ExecHandler::new(
            "sh",
            vec![
                "-c".to_string(),
                r#"read job; while true; do echo '{"name":"Acme"}'; done"#.to_string(),
            ],
        );
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            handler.handle(&Job::default(), tx),
        )
        .await
        .expect("handler should stop the process");
        assert!(result.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_handle_nonzero_exit_fails() {
        let handler = ExecHandler::new("sh", vec!["-c".to_string(), "read job; exit 3".to_string()]);
        let (tx, _rx) = mpsc::channel(8);

        let result = handler.handle(&Job::default(), tx).await;
        assert!(matches!(result, Err(JobError::ExecutionFailed(_))));
    }
}
