//! # data-diff-viewer
//!
//! Loads a precomputed data-diff report from an analytical store and turns it
//! into per-column change statistics, character-level value diffs and sample
//! rows fetched on demand.

pub mod aggregate;
pub mod cache;
pub mod char_diff;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod interaction;
pub mod loader;
pub mod output;
pub mod package;
pub mod progress;
pub mod report;
pub mod sample;
pub mod session;
pub mod store;

pub use config::ViewerConfig;
pub use error::{Result, ViewerError};
pub use loader::ReportLoader;
pub use report::DiffReport;
pub use session::ReportSession;
pub use store::{AnalyticalStore, DuckDbStore};
