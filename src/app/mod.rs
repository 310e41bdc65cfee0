//! Application session and orchestration

mod actions;

use crate::assets::AssetType;
use crate::config::Config;
use crate::db::AssetDb;
use crate::download::{download_batch, DownloadReport, Fetcher, HttpFetcher};
use crate::sync::{SyncOptions, SyncOrchestrator, SyncReport, SyncState};

use anyhow::{Context, Result};
use std::sync::Arc;

/// One running session: configuration, asset database and fetcher.
///
/// The session is the only owner of the catalog and installed state. Download
/// workers receive owned batches and report back; all mutation happens here.
pub struct App {
    /// Application configuration
    pub config: Config,

    /// Remote catalog and installed state
    pub db: AssetDb,

    /// URL fetcher used by every download batch
    fetcher: Arc<dyn Fetcher>,
}

impl App {
    /// Create a new App instance talking HTTP
    pub fn new(config: Config) -> Result<Self> {
        // Ensure directories exist
        config.ensure_dirs().context("Failed to create directories")?;

        let fetcher = HttpFetcher::new(&config.server.user_agent, config.timeout())?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Create an App with a custom fetcher
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let layout = config.layout();
        layout
            .ensure_dirs()
            .context("Failed to create asset directories")?;

        let db = AssetDb::open(layout).context("Failed to open asset database")?;
        if !db.is_synchronized() {
            tracing::info!("Asset database is not synchronized yet");
        }

        Ok(Self {
            config,
            db,
            fetcher,
        })
    }

    pub fn sync_options(&self, force: bool) -> SyncOptions {
        SyncOptions {
            manifest_url: self.config.server.manifest_url.clone(),
            screenshots: self.config.download.screenshots,
            thumbnails: self.config.download.thumbnails,
            force,
            progress_interval: self.config.download.progress_interval(),
        }
    }

    /// Refresh the manifest, the preview cache and the installed state
    pub async fn synchronize<F>(&mut self, force: bool, observer: F) -> Result<SyncReport>
    where
        F: FnMut(SyncState, f64),
    {
        let options = self.sync_options(force);
        let fetcher = Arc::clone(&self.fetcher);
        SyncOrchestrator::new(&mut self.db, fetcher, options)
            .run(observer)
            .await
    }

    /// Download one asset into the install tree and record it as installed.
    ///
    /// The thumbnail is fetched into the preview cache and copied next to the
    /// installed payload. An asset whose pertinent file did not arrive is not
    /// recorded; the returned report lists what failed.
    pub async fn download_asset<F>(
        &mut self,
        asset_type: AssetType,
        id: u64,
        on_progress: F,
    ) -> Result<DownloadReport>
    where
        F: FnMut(f64),
    {
        let asset = self
            .db
            .asset(asset_type, id)
            .cloned()
            .with_context(|| format!("Asset {} {} is not in the catalog", asset_type, id))?;
        let layout = self.db.layout().clone();

        tracing::info!("Downloading {} {} ({})", asset_type, id, asset.title());
        let report = download_batch(
            Arc::clone(&self.fetcher),
            asset.payload_targets(&layout),
            self.config.download.progress_interval(),
            on_progress,
        )
        .await?;

        let thumb = asset.thumb_path(&layout);
        let sidecar = asset.thumb_sidecar(&layout);
        if let (Some(thumb), Some(sidecar)) = (thumb, sidecar) {
            if thumb.exists() && asset.install_path(&layout).exists() {
                if let Err(e) = std::fs::copy(&thumb, &sidecar) {
                    tracing::warn!("Could not copy thumbnail to {}: {}", sidecar.display(), e);
                }
            }
        }

        match asset.pertinent_file(&layout) {
            Some(file) if file.exists() => {
                self.db.record_install(asset_type, id, &file)?;
                tracing::info!("Installed {} {} at {}", asset_type, id, file.display());
            }
            Some(file) => tracing::warn!(
                "{} was not downloaded; {} {} is not installed",
                file.display(),
                asset_type,
                id
            ),
            None => tracing::warn!("Asset {} {} has no installable payload", asset_type, id),
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::fetch::MockFetcher;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
        "1001": {"type":"hair","author":"Jane","title":"Braid",
                 "files":{"thumb":"http://x/1001/t.png",
                          "render":"http://x/1001/r.png",
                          "main":"http://x/1001/m.mhclo",
                          "obj":"http://x/1001/m.obj"}}
    }"#;

    fn config(dir: &TempDir) -> Config {
        Config {
            asset_root_override: Some(dir.path().join("assets").display().to_string()),
            install_root_override: Some(dir.path().join("install").display().to_string()),
            ..Config::default()
        }
    }

    fn app(dir: &TempDir, serve_main: bool) -> App {
        let config = config(dir);
        let layout = config.layout();
        layout.ensure_dirs().unwrap();
        std::fs::write(layout.remote_db(), MANIFEST).unwrap();

        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().returning(move |url| match url {
            "http://x/1001/t.png" => Ok(b"thumb".to_vec()),
            "http://x/1001/m.obj" => Ok(b"obj".to_vec()),
            "http://x/1001/m.mhclo" if serve_main => Ok(b"mhclo".to_vec()),
            other => Err(anyhow::anyhow!("unexpected fetch of {}", other)),
        });

        App::with_fetcher(config, Arc::new(fetcher)).unwrap()
    }

    #[tokio::test]
    async fn download_installs_and_records_asset() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, true);
        let layout = app.db.layout().clone();

        let report = app
            .download_asset(AssetType::Hair, 1001, |_| {})
            .await
            .unwrap();

        assert_eq!(report.total, 3);
        assert!(report.is_clean());

        let install = layout.install_dir(AssetType::Hair, 1001);
        assert_eq!(std::fs::read(install.join("m.mhclo")).unwrap(), b"mhclo");
        assert_eq!(std::fs::read(install.join("m.thumb")).unwrap(), b"thumb");
        assert!(!layout.cache_dir(1001).join("screenshot.png").exists());

        let entry = app.db.local().get(AssetType::Hair, 1001).unwrap();
        assert_eq!(entry.file, install.join("m.mhclo"));

        let persisted = crate::db::LocalState::load(&layout.local_db()).unwrap();
        assert!(persisted.is_installed(AssetType::Hair, 1001));
    }

    #[tokio::test]
    async fn missing_payload_is_not_recorded() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, false);

        let report = app
            .download_asset(AssetType::Hair, 1001, |_| {})
            .await
            .unwrap();

        assert!(report.has_failed("http://x/1001/m.mhclo"));
        assert!(!app.db.local().is_installed(AssetType::Hair, 1001));
    }

    #[tokio::test]
    async fn unknown_asset_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, true);

        assert!(app.download_asset(AssetType::Pose, 1001, |_| {}).await.is_err());
    }
}
