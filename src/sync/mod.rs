//! Catalog synchronization
//!
//! A sync runs three download phases one after another, each on a fresh
//! download worker:
//! 1. fetch the manifest into `remote.json` and reload the catalog
//! 2. fetch screenshots and thumbnails for every record
//! 3. rebuild the installed state from the filesystem
//!
//! A phase only starts once the previous batch has reported completion.

pub mod state;

pub use state::SyncState;

use crate::db::AssetDb;
use crate::download::{download_batch, DownloadItem, DownloadReport, Fetcher};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Settings for one sync run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub manifest_url: String,
    pub screenshots: bool,
    pub thumbnails: bool,
    /// Re-download previews that are already cached
    pub force: bool,
    pub progress_interval: Duration,
}

/// Outcome of a sync run
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub manifest: DownloadReport,
    pub metadata: DownloadReport,
    /// Whether a manifest is loaded after the run
    pub synchronized: bool,
    pub remote_assets: usize,
    pub installed_assets: usize,
    /// Every state entered, in order
    pub transitions: Vec<SyncState>,
}

impl SyncReport {
    fn new() -> Self {
        Self {
            manifest: DownloadReport::empty(),
            metadata: DownloadReport::empty(),
            synchronized: false,
            remote_assets: 0,
            installed_assets: 0,
            transitions: Vec::new(),
        }
    }

    /// Failed items across all phases
    pub fn failed_count(&self) -> usize {
        self.manifest.failed_count() + self.metadata.failed_count()
    }
}

/// Drives the sync state machine against one session's database
pub struct SyncOrchestrator<'a> {
    db: &'a mut AssetDb,
    fetcher: Arc<dyn Fetcher>,
    options: SyncOptions,
    state: SyncState,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(db: &'a mut AssetDb, fetcher: Arc<dyn Fetcher>, options: SyncOptions) -> Self {
        Self {
            db,
            fetcher,
            options,
            state: SyncState::Idle,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Run every phase to completion. `observer` receives the current state
    /// and the batch progress of that state.
    pub async fn run<F>(&mut self, mut observer: F) -> Result<SyncReport>
    where
        F: FnMut(SyncState, f64),
    {
        let mut report = SyncReport::new();
        self.state = SyncState::Idle;

        while !self.state.is_final() {
            let next = match self.step(&mut report, &mut observer).await {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!("Sync failed while {}: {:#}", self.state, e);
                    self.enter(SyncState::Failed, &mut report);
                    return Err(e);
                }
            };
            self.enter(next, &mut report);
        }

        report.synchronized = self.db.is_synchronized();
        report.remote_assets = self.db.remote().len();
        report.installed_assets = self.db.local().len();
        Ok(report)
    }

    fn enter(&mut self, next: SyncState, report: &mut SyncReport) {
        tracing::info!("Sync: {} -> {}", self.state, next);
        self.state = next;
        report.transitions.push(next);
    }

    async fn step<F>(&mut self, report: &mut SyncReport, observer: &mut F) -> Result<SyncState>
    where
        F: FnMut(SyncState, f64),
    {
        match self.state {
            SyncState::Idle => Ok(SyncState::FetchingManifest),
            SyncState::FetchingManifest => {
                report.manifest = self.fetch_manifest(observer).await?;
                Ok(SyncState::FetchingMetadata)
            }
            SyncState::FetchingMetadata => {
                report.metadata = self.fetch_metadata(observer).await?;
                Ok(SyncState::Finalizing)
            }
            SyncState::Finalizing => {
                self.db.rebuild_local()?;
                self.db.reload_local()?;
                observer(SyncState::Finalizing, 1.0);
                Ok(SyncState::Done)
            }
            SyncState::Done | SyncState::Failed => Ok(self.state),
        }
    }

    async fn fetch_manifest<F>(&mut self, observer: &mut F) -> Result<DownloadReport>
    where
        F: FnMut(SyncState, f64),
    {
        let part = self.db.layout().remote_db_part();
        discard(&part);

        let items = vec![DownloadItem::new(self.options.manifest_url.clone(), part.clone())];
        let report = self.run_batch(items, SyncState::FetchingManifest, observer).await?;

        if report.is_clean() {
            self.db.install_remote(&part)?;
        } else {
            tracing::warn!("Manifest could not be refreshed; keeping the previous copy");
            discard(&part);
            self.db.reload_remote()?;
        }
        tracing::info!("Remote catalog holds {} assets", self.db.remote().len());
        Ok(report)
    }

    async fn fetch_metadata<F>(&mut self, observer: &mut F) -> Result<DownloadReport>
    where
        F: FnMut(SyncState, f64),
    {
        let layout = self.db.layout().clone();
        let items: Vec<DownloadItem> = self
            .db
            .remote()
            .iter()
            .flat_map(|asset| {
                asset.metadata_targets(&layout, self.options.screenshots, self.options.thumbnails)
            })
            .filter(|item| self.options.force || !item.dest.exists())
            .collect();

        tracing::info!("{} preview files to download", items.len());
        self.run_batch(items, SyncState::FetchingMetadata, observer).await
    }

    async fn run_batch<F>(
        &self,
        items: Vec<DownloadItem>,
        phase: SyncState,
        observer: &mut F,
    ) -> Result<DownloadReport>
    where
        F: FnMut(SyncState, f64),
    {
        download_batch(
            Arc::clone(&self.fetcher),
            items,
            self.options.progress_interval,
            |fraction| observer(phase, fraction),
        )
        .await
    }
}

/// Remove a leftover partial download, if any
fn discard(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}
