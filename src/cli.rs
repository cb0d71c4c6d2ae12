//! CLI definitions for scrapejobs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// scrapejobs CLI.
#[derive(Parser)]
#[command(name = "scrapejobs")]
#[command(about = "Manage scrape jobs and their CSV exports")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "scrapejobs.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Submit a new pending job
    Create(CreateArgs),

    /// List jobs
    List {
        /// Only show jobs in this status (pending, working, ok, failed)
        #[arg(long)]
        status: Option<String>,
    },

    /// Show a job as JSON
    Get {
        /// Job ID
        id: String,
    },

    /// Delete a job and its CSV export
    Delete {
        /// Job ID
        id: String,
    },

    /// Claim the next pending job and mark it working
    Claim,

    /// Print the path of a job's CSV export
    Csv {
        /// Job ID
        id: String,
    },

    /// Process pending jobs with an external scraper command
    Run {
        /// Process at most one job and exit
        #[arg(long)]
        once: bool,

        /// Scraper program followed by its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Re-export a job's CSV keeping only some columns
    Project {
        /// Job ID
        id: String,

        /// Comma-separated columns to keep (case-insensitive)
        #[arg(short, long, default_value = "")]
        fields: String,
    },
}

#[derive(Args)]
pub(crate) struct CreateArgs {
    /// Job name
    #[arg(short, long)]
    pub name: String,

    /// Search keyword (repeatable)
    #[arg(short, long = "keyword", required = true)]
    pub keywords: Vec<String>,

    /// Explicit job ID (default: random UUID)
    #[arg(long)]
    pub id: Option<String>,

    /// Two-letter language code
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Map zoom level
    #[arg(long, default_value_t = 15)]
    pub zoom: u32,

    /// Latitude, required with --fast-mode
    #[arg(long, default_value = "")]
    pub lat: String,

    /// Longitude, required with --fast-mode
    #[arg(long, default_value = "")]
    pub lon: String,

    /// Scrape around the given coordinates only
    #[arg(long)]
    pub fast_mode: bool,

    /// Search radius in meters
    #[arg(long, default_value_t = 10000)]
    pub radius: u32,

    /// Result page depth
    #[arg(long, default_value_t = 10)]
    pub depth: u32,

    /// Extract emails from websites
    #[arg(long)]
    pub email: bool,

    /// Maximum run time in seconds
    #[arg(long, default_value_t = 600)]
    pub max_time_secs: u64,

    /// Proxy URL (repeatable)
    #[arg(long = "proxy")]
    pub proxies: Vec<String>,

    /// Comma-separated export columns (default: all)
    #[arg(long, default_value = "")]
    pub fields: String,
}
