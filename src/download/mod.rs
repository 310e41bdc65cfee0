//! Background download pipeline
//!
//! A batch of (url, destination) pairs is handed to a single worker task which
//! fetches them one after another, in submission order. The worker never
//! touches the catalog or the installed-state store: it only writes files and
//! reports back over a channel. A failed item is logged and recorded in the
//! batch report; it never aborts the batch.

pub mod fetch;
pub mod state;

pub use fetch::{Fetcher, HttpFetcher};
pub use state::{DownloadEvent, DownloadItem, DownloadReport, FailedDownload};

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

/// Default minimum delay between two progress events
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// A running batch. Dropping it without waiting leaves the worker running to
/// the end of its list; there is no cancellation.
pub struct DownloadTask {
    batch_id: String,
    events: mpsc::UnboundedReceiver<DownloadEvent>,
    worker: JoinHandle<()>,
}

impl DownloadTask {
    /// Spawn the worker for `items`
    pub fn start(
        fetcher: Arc<dyn Fetcher>,
        items: Vec<DownloadItem>,
        progress_interval: Duration,
    ) -> Self {
        let batch_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();

        tracing::debug!("Starting download batch {} with {} items", batch_id, items.len());
        tracing::trace!("Batch {} items: {:?}", batch_id, items);

        let worker = tokio::spawn(run_batch(
            fetcher,
            batch_id.clone(),
            items,
            progress_interval,
            tx,
        ));

        Self {
            batch_id,
            events: rx,
            worker,
        }
    }

    /// Forward progress events to `on_progress` until the batch finishes
    pub async fn wait<F>(mut self, mut on_progress: F) -> Result<DownloadReport>
    where
        F: FnMut(f64),
    {
        while let Some(event) = self.events.recv().await {
            match event {
                DownloadEvent::Progress(fraction) => {
                    tracing::trace!("Batch {} progress {:.2}", self.batch_id, fraction);
                    on_progress(fraction);
                }
                DownloadEvent::Finished(report) => {
                    self.worker
                        .await
                        .context("Download worker terminated abnormally")?;
                    tracing::debug!(
                        "Batch {} finished: {}/{} downloaded, {} failed",
                        report.batch_id,
                        report.succeeded,
                        report.total,
                        report.failed_count()
                    );
                    return Ok(report);
                }
            }
        }

        self.worker
            .await
            .context("Download worker terminated abnormally")?;
        bail!("Download batch {} ended without a report", self.batch_id)
    }
}

/// Run `items` through a fresh worker and wait for its report
pub async fn download_batch<F>(
    fetcher: Arc<dyn Fetcher>,
    items: Vec<DownloadItem>,
    progress_interval: Duration,
    on_progress: F,
) -> Result<DownloadReport>
where
    F: FnMut(f64),
{
    DownloadTask::start(fetcher, items, progress_interval)
        .wait(on_progress)
        .await
}

async fn run_batch(
    fetcher: Arc<dyn Fetcher>,
    batch_id: String,
    items: Vec<DownloadItem>,
    progress_interval: Duration,
    events: mpsc::UnboundedSender<DownloadEvent>,
) {
    // Send errors only mean the coordinator stopped listening.
    let _ = events.send(DownloadEvent::Progress(0.0));

    let total = items.len();
    let mut report = DownloadReport::new(batch_id, total);
    let mut last_report = Instant::now();

    for (index, item) in items.into_iter().enumerate() {
        tracing::trace!("About to download {}", item.url);
        tracing::trace!("Destination is {}", item.dest.display());

        match fetch_one(fetcher.as_ref(), &item).await {
            Ok(size) => {
                tracing::debug!("Successfully downloaded {} ({} bytes)", item.url, size);
                report.succeeded += 1;
            }
            Err(e) => {
                tracing::warn!("Could not download {}: {:#}", item.url, e);
                report.failed.push(FailedDownload {
                    url: item.url,
                    dest: item.dest,
                    reason: format!("{:#}", e),
                });
            }
        }

        if last_report.elapsed() >= progress_interval {
            last_report = Instant::now();
            let _ = events.send(DownloadEvent::Progress((index + 1) as f64 / total as f64));
        }
    }

    let _ = events.send(DownloadEvent::Finished(report));
}

async fn fetch_one(fetcher: &dyn Fetcher, item: &DownloadItem) -> Result<usize> {
    if let Some(parent) = item.dest.parent() {
        if !parent.exists() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let url = encode_spaces(&item.url);
    Url::parse(&url).with_context(|| format!("Invalid download url: {}", url))?;

    let data = fetcher.fetch(&url).await?;
    tokio::fs::write(&item.dest, &data)
        .await
        .with_context(|| format!("Failed to write {}", item.dest.display()))?;

    Ok(data.len())
}

/// Percent-encode spaces the way the asset server expects
pub fn encode_spaces(url: &str) -> String {
    url.replace(' ', "%20")
}
