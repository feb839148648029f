//! Unit tests for CLI argument parsing

use clap::Parser;
use data_diff_viewer::cli::{Cli, Commands, OutputFormat};
use data_diff_viewer::commands::StoreOptions;
use data_diff_viewer::report::BucketKind;
use std::path::Path;

#[test]
fn test_summary_defaults() {
    let cli = Cli::try_parse_from(["data-diff-viewer", "summary", "report.duckdb"]).unwrap();
    assert!(!cli.verbose);

    match cli.command {
        Commands::Summary {
            db,
            hide_unchanged,
            expand_all,
            format,
        } => {
            assert_eq!(db, Path::new("report.duckdb"));
            assert!(!hide_unchanged);
            assert!(!expand_all);
            assert_eq!(OutputFormat::parse(&format).unwrap(), OutputFormat::Pretty);
        }
        _ => panic!("expected the summary command"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "data-diff-viewer",
        "column",
        "report.duckdb",
        "name",
        "--verbose",
        "--sample-prefix",
        "part_",
        "--threads",
        "2",
        "--memory-limit",
        "1GB",
    ])
    .unwrap();

    assert!(cli.verbose);
    let options = StoreOptions::from_cli(&cli);
    assert_eq!(options.sample_prefix.as_deref(), Some("part_"));
    assert_eq!(options.threads, Some(2));

    let config = options.to_config(Path::new("report.duckdb"));
    assert_eq!(config.sample_table_prefix, "part_");
    assert_eq!(config.memory_limit.as_deref(), Some("1GB"));
    assert!(config.read_only);
}

#[test]
fn test_sample_defaults_to_first_changed_entry() {
    let cli = Cli::try_parse_from(["data-diff-viewer", "sample", "report.duckdb", "name"]).unwrap();
    match cli.command {
        Commands::Sample { bucket, index, .. } => {
            assert_eq!(bucket, BucketKind::Changed);
            assert_eq!(index, 0);
        }
        _ => panic!("expected the sample command"),
    }
}

#[test]
fn test_invalid_arguments() {
    assert!(Cli::try_parse_from(["data-diff-viewer", "sample", "r.duckdb", "name", "--bucket", "moved"]).is_err());
    assert!(Cli::try_parse_from(["data-diff-viewer", "summary", "r.duckdb", "--threads", "0"]).is_err());
    assert!(Cli::try_parse_from(["data-diff-viewer", "package", "r.duckdb"]).is_err());
    assert!(Cli::try_parse_from(["data-diff-viewer"]).is_err());
}

#[test]
fn test_package_arguments() {
    let cli = Cli::try_parse_from([
        "data-diff-viewer",
        "package",
        "out.duckdb",
        "--title",
        "Nightly",
        "--summary",
        "summary.json",
        "--diff-per-col",
        "cols.jsonl",
    ])
    .unwrap();

    match cli.command {
        Commands::Package {
            title, diff_per_col, ..
        } => {
            assert_eq!(title, "Nightly");
            assert_eq!(diff_per_col, Path::new("cols.jsonl"));
        }
        _ => panic!("expected the package command"),
    }
}
