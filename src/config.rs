//! Viewer configuration and DuckDB session settings

use crate::error::{Result, ViewerError};
use std::env;
use std::path::{Path, PathBuf};

/// Default prefix shared by all partitioned sample tables
pub const DEFAULT_SAMPLE_TABLE_PREFIX: &str = "sample_";

/// Default identity column of sample tables
pub const DEFAULT_SAMPLE_ID_COLUMN: &str = "__SAMPLE_ID__";

const ENV_MEMORY_LIMIT: &str = "DATA_DIFF_VIEWER_MEMORY_LIMIT";
const ENV_THREADS: &str = "DATA_DIFF_VIEWER_THREADS";
const ENV_SAMPLE_PREFIX: &str = "DATA_DIFF_VIEWER_SAMPLE_PREFIX";

/// Configuration of a report viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Path of the DuckDB report database
    pub db_path: PathBuf,
    pub sample_table_prefix: String,
    pub sample_id_column: String,
    /// Open the report database read-only
    pub read_only: bool,
    /// DuckDB `memory_limit` setting, e.g. "2GB"
    pub memory_limit: Option<String>,
    /// DuckDB `threads` setting
    pub threads: Option<usize>,
}

impl ViewerConfig {
    /// Create a configuration with defaults, then apply environment overrides
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        let mut config = Self::with_defaults(db_path);
        config.apply_env_overrides();
        config
    }

    /// Create a configuration ignoring the environment
    pub fn with_defaults(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            sample_table_prefix: DEFAULT_SAMPLE_TABLE_PREFIX.to_string(),
            sample_id_column: DEFAULT_SAMPLE_ID_COLUMN.to_string(),
            read_only: true,
            memory_limit: None,
            threads: None,
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(limit) = env::var(ENV_MEMORY_LIMIT) {
            if !limit.trim().is_empty() {
                self.memory_limit = Some(limit.trim().to_string());
            }
        }

        if let Ok(threads) = env::var(ENV_THREADS) {
            match threads.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.threads = Some(n),
                _ => log::warn!("Ignoring invalid {}='{}'", ENV_THREADS, threads),
            }
        }

        if let Ok(prefix) = env::var(ENV_SAMPLE_PREFIX) {
            if !prefix.is_empty() {
                self.sample_table_prefix = prefix;
            }
        }
    }

    pub fn with_sample_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sample_table_prefix = prefix.into();
        self
    }

    pub fn with_memory_limit(mut self, limit: impl Into<String>) -> Self {
        self.memory_limit = Some(limit.into());
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn writable(mut self) -> Self {
        self.read_only = false;
        self
    }

    /// Validate the current configuration
    pub fn validate(&self) -> Result<()> {
        if !self.db_path.is_file() {
            return Err(ViewerError::config(format!(
                "Report database not found: {}",
                self.db_path.display()
            )));
        }

        if self.sample_table_prefix.is_empty() {
            return Err(ViewerError::config("Sample table prefix must not be empty"));
        }

        if self.sample_id_column.is_empty() {
            return Err(ViewerError::config("Sample id column must not be empty"));
        }

        if self.threads == Some(0) {
            return Err(ViewerError::config("Thread count must be greater than 0"));
        }

        Ok(())
    }

    /// `SET` statements applied to every new connection
    pub fn session_settings(&self) -> Vec<String> {
        let mut settings = vec!["SET enable_progress_bar=false".to_string()];

        if let Some(ref limit) = self.memory_limit {
            settings.push(format!("SET memory_limit='{}'", limit.replace('\'', "''")));
        }
        if let Some(threads) = self.threads {
            settings.push(format!("SET threads={}", threads));
        }

        settings
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Key under which this report is cached by the loader
    pub fn cache_key(&self) -> String {
        self.db_path.to_string_lossy().into_owned()
    }
}
