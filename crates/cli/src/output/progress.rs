//! Progress bar utilities for upload operations
//!
//! Provides consistent progress indication for long-running uploads.

use s3x_core::{Error, UploadObserver, UploadedObject};

use super::OutputConfig;

const FILES_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}";

/// Progress bar wrapper
///
/// Handles progress display based on output configuration.
/// In quiet or JSON mode, progress is suppressed.
#[derive(Debug)]
pub struct ProgressBar {
    bar: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Create a file-count progress bar; the length can be set later
    pub fn new(config: &OutputConfig, total: u64) -> Self {
        let bar = if config.quiet || config.json || config.no_progress {
            None
        } else {
            let bar = indicatif::ProgressBar::new(total);
            if let Ok(style) = indicatif::ProgressStyle::with_template(FILES_TEMPLATE) {
                bar.set_style(style.progress_chars("#>-"));
            }
            Some(bar)
        };

        Self { bar }
    }

    /// Set the total number of steps
    pub fn set_length(&self, len: u64) {
        if let Some(bar) = &self.bar {
            bar.set_length(len);
        }
    }

    /// Increment progress
    pub fn inc(&self, delta: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(delta);
        }
    }

    /// Set message
    pub fn set_message(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.to_string());
        }
    }

    /// Finish and clear the progress bar
    pub fn finish_and_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    /// Check if progress bar is visible
    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.as_ref().map_or(0, |bar| bar.position())
    }
}

impl UploadObserver for ProgressBar {
    fn on_planned(&self, files: usize) {
        self.set_length(files as u64);
    }

    fn on_uploaded(&self, object: &UploadedObject) {
        self.set_message(&object.destination.key);
        self.inc(1);
    }

    fn on_failed(&self, source: &str, _error: &Error) {
        self.set_message(&format!("failed: {source}"));
        self.inc(1);
    }
}
