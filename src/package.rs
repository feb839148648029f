//! Packaging of a diff into a self-contained report database

use crate::error::{Result, ViewerError};
use crate::loader::{DIFF_PER_COL_TABLE, DIFF_REPORT_TABLE};
use crate::report::SchemaDiffSummary;
use crate::store::{quote_identifier, quote_literal};
use chrono::Utc;
use duckdb::{params, Connection};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Result of packaging a report
#[derive(Debug, Clone)]
pub struct PackagedReport {
    pub db_path: PathBuf,
    pub column_count: u64,
}

/// Write a report database holding the `diff_report` and `diff_per_col`
/// tables.
///
/// `diff_per_col_path` is a parquet or newline-delimited JSON file with one
/// row per column: `column_number`, `column_name`, `counts`, `diff`.
pub fn write_report_database(
    db_path: &Path,
    report_title: &str,
    summary: &SchemaDiffSummary,
    diff_per_col_path: &Path,
) -> Result<PackagedReport> {
    if db_path.exists() {
        return Err(ViewerError::invalid_input(format!(
            "Report database already exists: {}",
            db_path.display()
        )));
    }
    if !diff_per_col_path.is_file() {
        return Err(ViewerError::invalid_input(format!(
            "File not found: {}",
            diff_per_col_path.display()
        )));
    }
    summary.validate()?;

    let reader = reader_function(diff_per_col_path)?;
    let connection = Connection::open(db_path)?;

    connection.execute_batch(&format!(
        "CREATE TABLE {} AS SELECT * FROM {}({})",
        quote_identifier(DIFF_PER_COL_TABLE),
        reader,
        quote_literal(&diff_per_col_path.to_string_lossy())
    ))?;

    connection.execute_batch(&format!(
        "CREATE TABLE {} (report_title VARCHAR, creation_timestamp TIMESTAMP, diff_summary VARCHAR)",
        quote_identifier(DIFF_REPORT_TABLE)
    ))?;

    let duckdb_version: String = connection.query_row("SELECT version()", [], |row| row.get(0))?;
    let summary_json = summary_payload(summary, &duckdb_version)?;
    let creation_timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string();

    connection.execute(
        &format!(
            "INSERT INTO {} VALUES (?, CAST(? AS TIMESTAMP), ?)",
            quote_identifier(DIFF_REPORT_TABLE)
        ),
        params![report_title, creation_timestamp, summary_json],
    )?;

    let column_count: u64 = connection.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_identifier(DIFF_PER_COL_TABLE)),
        [],
        |row| row.get(0),
    )?;

    log::info!(
        "Wrote report '{}' with {} columns to {}",
        report_title,
        column_count,
        db_path.display()
    );

    Ok(PackagedReport {
        db_path: db_path.to_path_buf(),
        column_count,
    })
}

/// The summary JSON stored in `diff_report.diff_summary`
pub fn summary_payload(summary: &SchemaDiffSummary, duckdb_version: &str) -> Result<String> {
    let mut payload = serde_json::to_value(summary)?;
    if let Value::Object(ref mut object) = payload {
        object.insert(
            "data_diff_viewer_version".to_string(),
            Value::String(env!("CARGO_PKG_VERSION").to_string()),
        );
        object.insert(
            "results_serialized_with".to_string(),
            Value::String(format!("duck_db:{}", duckdb_version)),
        );
        object.insert(
            "diff_per_col_table_name".to_string(),
            Value::String(DIFF_PER_COL_TABLE.to_string()),
        );
    }
    Ok(serde_json::to_string(&payload)?)
}

fn reader_function(path: &Path) -> Result<&'static str> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("parquet") => Ok("read_parquet"),
        Some("json") | Some("jsonl") | Some("ndjson") => Ok("read_json_auto"),
        _ => Err(ViewerError::invalid_input(format!(
            "Unsupported diff_per_col file '{}', expected parquet or JSON lines",
            path.display()
        ))),
    }
}
