//! Error types for data-diff-viewer operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ViewerError>;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// The store could not be opened or a report query failed.
    #[error("Failed to load report: {message}")]
    Load { message: String },

    /// A report payload did not have the expected shape.
    #[error("Failed to decode report: {message}")]
    Decode { message: String },

    #[error("Sample lookup failed on table '{table}': {message}")]
    SampleLookup { table: String, message: String },

    #[error("Column not found in report: {name}")]
    ColumnNotFound { name: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl ViewerError {
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load {
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn sample_lookup(table: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SampleLookup {
            table: table.into(),
            message: msg.into(),
        }
    }

    pub fn column_not_found(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { name: name.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }
}
