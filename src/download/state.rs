//! Download batch items, events and reports

use std::path::PathBuf;

/// One (remote url, local destination) pair of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    pub url: String,
    pub dest: PathBuf,
}

impl DownloadItem {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
        }
    }
}

/// Message sent from the download worker to the coordinator
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// Fraction of the batch processed so far, in `0.0..=1.0`
    Progress(f64),
    /// Sent exactly once, after the last item
    Finished(DownloadReport),
}

/// An item that could not be fetched or written
#[derive(Debug, Clone)]
pub struct FailedDownload {
    pub url: String,
    pub dest: PathBuf,
    pub reason: String,
}

/// Completion contract of one batch
#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub batch_id: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<FailedDownload>,
}

impl DownloadReport {
    pub fn new(batch_id: impl Into<String>, total: usize) -> Self {
        Self {
            batch_id: batch_id.into(),
            total,
            succeeded: 0,
            failed: Vec::new(),
        }
    }

    /// Report for a phase that had nothing to download
    pub fn empty() -> Self {
        Self::new(String::new(), 0)
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn has_failed(&self, url: &str) -> bool {
        self.failed.iter().any(|f| f.url == url)
    }
}
