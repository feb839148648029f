//! Command-line interface for data-diff-viewer

use crate::report::BucketKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "data-diff-viewer")]
#[command(about = "Browse a precomputed data-diff report")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Prefix of the sample tables
    #[arg(long, global = true)]
    pub sample_prefix: Option<String>,

    /// DuckDB memory limit, e.g. "2GB"
    #[arg(long, global = true)]
    pub memory_limit: Option<String>,

    /// DuckDB worker threads
    #[arg(long, global = true, value_parser = validate_threads)]
    pub threads: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the report header and the per-column summary
    Summary {
        /// Report database
        db: PathBuf,

        /// Hide columns without any change
        #[arg(long)]
        hide_unchanged: bool,

        /// Show the ranked values of every column
        #[arg(long)]
        expand_all: bool,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Show the ranked values of one column
    Column {
        /// Report database
        db: PathBuf,

        /// Column name
        name: String,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Show the sample row of one diff entry
    Sample {
        /// Report database
        db: PathBuf,

        /// Column name
        column: String,

        /// Bucket: "no_change", "changed", "only_in_left", "only_in_right"
        #[arg(long, default_value = "changed", value_parser = parse_bucket)]
        bucket: BucketKind,

        /// Position of the entry in the bucket, as stored in the report
        #[arg(long, default_value = "0")]
        index: usize,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Package a computed diff into a report database
    Package {
        /// Report database to create
        db: PathBuf,

        /// Report title
        #[arg(long)]
        title: String,

        /// JSON file holding the schema diff summary
        #[arg(long)]
        summary: PathBuf,

        /// Parquet or JSON lines file with one row per column
        #[arg(long)]
        diff_per_col: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

fn parse_bucket(s: &str) -> Result<BucketKind, String> {
    s.parse::<BucketKind>().map_err(|e| e.to_string())
}

/// Validate that the thread count is greater than 0
fn validate_threads(s: &str) -> Result<usize, String> {
    let threads: usize = s
        .parse()
        .map_err(|_| format!("Invalid thread count: '{}'. Must be a positive integer.", s))?;

    if threads == 0 {
        return Err("Thread count must be greater than 0".to_string());
    }

    Ok(threads)
}
