//! Command handlers.

use std::error::Error;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use scrapejobs_export::{ExportError, FieldRecord, FilteredCsvWriter};
use scrapejobs_jobs::{Job, JobData, JobRunner, JobService, JobStatus, RunnerConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{Commands, CreateArgs};
use crate::exec::ExecHandler;

/// Dispatch a parsed command against the job service.
pub(crate) async fn run(
    command: Commands,
    service: Arc<JobService>,
    runner_config: RunnerConfig,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Create(args) => {
            let job = build_job(args);
            service.create(cancel, &job).await?;
            println!("{}", job.id);
        }
        Commands::List { status } => {
            let status = status.map(|s| s.parse::<JobStatus>()).transpose()?;
            let jobs = service.all(cancel).await?;
            let mut out = io::stdout().lock();
            for job in jobs
                .iter()
                .filter(|job| status.is_none_or(|s| job.status == s))
            {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    job.id,
                    job.status,
                    job.date.to_rfc3339(),
                    job.name
                )?;
            }
        }
        Commands::Get { id } => {
            let job = service.get(cancel, &id).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Commands::Delete { id } => {
            service.delete(cancel, &id).await?;
            info!("Deleted job '{}'", id);
        }
        Commands::Claim => match service.claim_next(cancel).await? {
            Some(job) => println!("{}", job.id),
            None => info!("No pending jobs"),
        },
        Commands::Csv { id } => {
            let path = service.get_csv(&id).await?;
            println!("{}", path.display());
        }
        Commands::Run { once, mut command } => {
            let program = command.remove(0);
            let handler = Arc::new(ExecHandler::new(program, command));
            let runner = JobRunner::new(Arc::clone(&service), handler, runner_config);
            if once {
                match runner.run_once(cancel).await? {
                    Some(job) => println!("{}\t{}", job.id, job.status),
                    None => info!("No pending jobs"),
                }
            } else {
                runner.run(cancel.clone()).await;
                info!(
                    "Processed {} jobs ({} failed)",
                    runner.jobs_completed() + runner.jobs_failed(),
                    runner.jobs_failed()
                );
            }
        }
        Commands::Project { id, fields } => {
            let path = service.get_csv(&id).await?;
            let rows = project_artifact(&path, &fields, io::stdout().lock())?;
            info!("Projected {} rows from {}", rows, path.display());
        }
    }

    Ok(())
}

/// Build a pending job from `create` arguments.
fn build_job(args: CreateArgs) -> Job {
    let data = JobData {
        keywords: args.keywords,
        lang: args.lang,
        zoom: args.zoom,
        lat: args.lat,
        lon: args.lon,
        fast_mode: args.fast_mode,
        radius: args.radius,
        depth: args.depth,
        email: args.email,
        max_time: Duration::from_secs(args.max_time_secs),
        proxies: args.proxies,
        fields: args.fields,
    };

    let mut job = Job::new(args.name, data);
    if let Some(id) = args.id {
        job.id = id;
    }
    job
}

/// Copy an exported CSV to `out`, keeping only the selected columns.
///
/// Returns the number of data rows written.
fn project_artifact<W: Write>(path: &Path, fields: &str, out: W) -> Result<u64, ExportError> {
    // Exports hold rows of differing lengths when results had mixed shapes.
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();

    let mut writer = FilteredCsvWriter::new(out, fields);
    for row in reader.records() {
        let row = row?;
        let record = FieldRecord::from_pairs(headers.iter().cloned().zip(row.iter()));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    Ok(writer.rows_written())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use tempfile::TempDir;

    fn create_args(argv: &[&str]) -> CreateArgs {
        let mut full = vec!["scrapejobs", "create"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Create(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_build_job_defaults_validate() {
        let job = build_job(create_args(&["--name", "cafes", "-k", "cafe"]));

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.data.max_time, Duration::from_secs(600));
        assert!(!job.id.is_empty());
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_build_job_explicit_id() {
        let job = build_job(create_args(&["--name", "n", "-k", "k", "--id", "job-1"]));
        assert_eq!(job.id, "job-1");
    }

    #[test]
    fn test_build_job_fast_mode_needs_coordinates() {
        let job = build_job(create_args(&["--name", "n", "-k", "k", "--fast-mode"]));
        assert!(job.validate().is_err());
    }

    #[test]
    fn test_project_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.csv");
        std::fs::write(
            &path,
            "Title,Phone,Website\r\nAcme,555-1212,acme.test\r\nBolt,555-0000,bolt.test\r\n",
        )
        .unwrap();

        let mut out = Vec::new();
        let rows = project_artifact(&path, "website, title", &mut out).unwrap();

        assert_eq!(rows, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Title,Website\r\nAcme,acme.test\r\nBolt,bolt.test\r\n"
        );
    }

    #[test]
    fn test_project_artifact_all_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.csv");
        std::fs::write(&path, "A,B\r\n1,2\r\n").unwrap();

        let mut out = Vec::new();
        project_artifact(&path, "", &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "A,B\r\n1,2\r\n");
    }

    #[test]
    fn test_project_artifact_mixed_row_lengths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.csv");
        std::fs::write(&path, "title,phone\r\nAcme,555\r\nBolt\r\n").unwrap();

        let mut out = Vec::new();
        let rows = project_artifact(&path, "phone", &mut out).unwrap();

        assert_eq!(rows, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "phone\r\n555\r\n\r\n");
    }

    #[test]
    fn test_project_artifact_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut out = Vec::new();
        let result = project_artifact(&dir.path().join("nope.csv"), "", &mut out);
        assert!(matches!(result, Err(ExportError::Csv(_))));
    }
}
