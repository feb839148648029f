//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a report or a sample row is loading
#[derive(Debug)]
pub struct LoadProgress {
    pub spinner: Option<ProgressBar>,
}

impl LoadProgress {
    pub fn new(message: &str) -> Self {
        Self {
            spinner: Some(create_spinner(message)),
        }
    }

    /// No spinner, for machine-readable output
    pub fn new_minimal() -> Self {
        Self { spinner: None }
    }

    pub fn set_message(&self, message: &str) {
        if let Some(pb) = &self.spinner {
            pb.set_message(message.to_string());
        }
    }

    pub fn finish(&mut self, message: &str) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_with_message(message.to_string());
        }
    }

    pub fn clear(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

impl Drop for LoadProgress {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Create a spinner progress bar
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
