//! Asset database: remote catalog plus installed state
//!
//! Files under the asset root:
//! - `remote.json`: local copy of the server manifest
//! - `local.json`: installed assets, rebuilt from the filesystem after a sync
//! - `remotecache/`: screenshots and thumbnails

pub mod filter;
pub mod local;
pub mod remote;

pub use filter::{filter_assets, yes_no_from_cli, AssetFilter, InstalledFilter, UpdatedWithin};
pub use local::{modified_timestamp, InstalledAsset, LocalState};
pub use remote::{CatalogError, RemoteCatalog};

use crate::assets::{AssetRecord, AssetType};
use crate::config::AssetLayout;
use anyhow::{Context, Result};
use std::path::Path;

/// Catalog and installed state for one session.
///
/// Only the coordinating task holds an `AssetDb`; download workers never see
/// it, so no locking is involved.
pub struct AssetDb {
    layout: AssetLayout,
    remote: RemoteCatalog,
    local: LocalState,
}

impl AssetDb {
    /// Load both stores. When `local.json` is missing or unreadable but a
    /// manifest is present, the installed state is rebuilt from the filesystem.
    pub fn open(layout: AssetLayout) -> Result<Self> {
        let remote =
            RemoteCatalog::load(&layout.remote_db()).context("Failed to load remote catalog")?;

        let local = if layout.local_db().exists() {
            match LocalState::load(&layout.local_db()) {
                Ok(local) => local,
                Err(e) => {
                    tracing::warn!("Discarding unreadable installed state: {:#}", e);
                    derive_local(&remote, &layout)?
                }
            }
        } else {
            derive_local(&remote, &layout)?
        };

        Ok(Self {
            layout,
            remote,
            local,
        })
    }

    pub fn layout(&self) -> &AssetLayout {
        &self.layout
    }

    pub fn remote(&self) -> &RemoteCatalog {
        &self.remote
    }

    pub fn local(&self) -> &LocalState {
        &self.local
    }

    pub fn is_synchronized(&self) -> bool {
        self.remote.is_synchronized()
    }

    pub fn asset(&self, asset_type: AssetType, id: u64) -> Option<&AssetRecord> {
        self.remote.get(asset_type, id)
    }

    /// Re-read `remote.json`. On error the current catalog is kept as is.
    pub fn reload_remote(&mut self) -> Result<(), CatalogError> {
        self.remote = RemoteCatalog::load(&self.layout.remote_db())?;
        Ok(())
    }

    /// Load a freshly downloaded manifest and move it over `remote.json`.
    ///
    /// A candidate that fails to load is deleted; both the catalog in memory
    /// and `remote.json` on disk stay as they were.
    pub fn install_remote(&mut self, candidate: &Path) -> Result<(), CatalogError> {
        let catalog = match RemoteCatalog::load(candidate) {
            Ok(catalog) => catalog,
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(candidate) {
                    tracing::warn!("Could not remove {}: {}", candidate.display(), rm);
                }
                return Err(e);
            }
        };

        let target = self.layout.remote_db();
        std::fs::rename(candidate, &target).map_err(|source| CatalogError::Io {
            path: target.clone(),
            source,
        })?;
        self.remote = catalog;
        Ok(())
    }

    /// Rebuild `local.json` from the filesystem
    pub fn rebuild_local(&mut self) -> Result<()> {
        self.local = LocalState::rebuild(&self.remote, &self.layout)?;
        Ok(())
    }

    /// Re-read `local.json`
    pub fn reload_local(&mut self) -> Result<()> {
        self.local = LocalState::load(&self.layout.local_db())?;
        Ok(())
    }

    /// Record one freshly installed file and persist the state
    pub fn record_install(&mut self, asset_type: AssetType, id: u64, file: &Path) -> Result<()> {
        self.local.record_install(asset_type, id, file)?;
        self.local.save(&self.layout.local_db())
    }

    pub fn filtered(&self, asset_type: AssetType, filter: &AssetFilter) -> Vec<&AssetRecord> {
        let now = chrono::Local::now().naive_local();
        filter_assets(&self.remote, &self.local, asset_type, filter, now)
    }

    /// Like [`AssetDb::filtered`], but an unknown type name yields nothing
    pub fn filtered_by_name(&self, type_name: &str, filter: &AssetFilter) -> Vec<&AssetRecord> {
        match type_name.parse::<AssetType>() {
            Ok(asset_type) => self.filtered(asset_type, filter),
            Err(e) => {
                tracing::debug!("{}; returning no assets", e);
                Vec::new()
            }
        }
    }

    pub fn known_authors(&self) -> Vec<String> {
        self.remote.known_authors().to_vec()
    }

    pub fn known_clothes_categories(&self) -> Vec<String> {
        self.remote.known_clothes_categories().to_vec()
    }
}

/// Installed state derived from the filesystem, or nothing before a first sync
fn derive_local(remote: &RemoteCatalog, layout: &AssetLayout) -> Result<LocalState> {
    if remote.is_synchronized() {
        LocalState::rebuild(remote, layout)
    } else {
        Ok(LocalState::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BRAID: &str = r#"{"1001": {"type":"hair", "author":"Jane", "title":"Braid",
        "files":{"thumb":"http://x/1001/t.png","main":"http://x/1001/m.mhclo"}}}"#;

    fn layout(dir: &TempDir) -> AssetLayout {
        AssetLayout::new(dir.path().join("assets"), dir.path().join("install"))
    }

    #[test]
    fn fresh_profile_is_unsynchronized() {
        let dir = TempDir::new().unwrap();
        let db = AssetDb::open(layout(&dir)).unwrap();

        assert!(!db.is_synchronized());
        assert!(db.local().is_empty());
        assert!(!db.layout().local_db().exists());
    }

    #[test]
    fn open_rebuilds_missing_local_state() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        layout.ensure_dirs().unwrap();
        std::fs::write(layout.remote_db(), BRAID).unwrap();
        let install_dir = layout.install_dir(AssetType::Hair, 1001);
        std::fs::create_dir_all(&install_dir).unwrap();
        std::fs::write(install_dir.join("m.mhclo"), b"mesh").unwrap();

        let db = AssetDb::open(layout.clone()).unwrap();

        assert!(db.is_synchronized());
        assert!(db.local().is_installed(AssetType::Hair, 1001));
        assert!(layout.local_db().exists());
    }

    #[test]
    fn braid_scenario() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        layout.ensure_dirs().unwrap();
        std::fs::write(layout.remote_db(), BRAID).unwrap();
        let db = AssetDb::open(layout).unwrap();

        let jane = AssetFilter {
            author: Some("Jane".into()),
            ..Default::default()
        };
        let found = db.filtered_by_name("hair", &jane);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), 1001);

        let bob = AssetFilter {
            author: Some("Bob".into()),
            ..Default::default()
        };
        assert!(db.filtered_by_name("hair", &bob).is_empty());
    }

    #[test]
    fn unknown_type_name_filters_to_nothing() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        layout.ensure_dirs().unwrap();
        std::fs::write(layout.remote_db(), BRAID).unwrap();
        let db = AssetDb::open(layout).unwrap();

        assert!(db
            .filtered_by_name("alien-thing", &AssetFilter::default())
            .is_empty());
    }

    #[test]
    fn failed_reload_keeps_previous_catalog() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        layout.ensure_dirs().unwrap();
        std::fs::write(layout.remote_db(), BRAID).unwrap();
        let mut db = AssetDb::open(layout.clone()).unwrap();

        std::fs::write(
            layout.remote_db(),
            r#"{"1": {"type":"hair"}, "2": {"type":"alien-thing"}}"#,
        )
        .unwrap();

        assert!(matches!(
            db.reload_remote(),
            Err(CatalogError::UnknownAssetType(_))
        ));
        assert_eq!(db.remote().len(), 1);
        assert!(db.asset(AssetType::Hair, 1001).is_some());
        assert!(db.asset(AssetType::Hair, 1).is_none());
    }

    #[test]
    fn truncated_local_state_is_rebuilt_on_open() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        layout.ensure_dirs().unwrap();
        std::fs::write(layout.remote_db(), BRAID).unwrap();
        let install_dir = layout.install_dir(AssetType::Hair, 1001);
        std::fs::create_dir_all(&install_dir).unwrap();
        std::fs::write(install_dir.join("m.mhclo"), b"mesh").unwrap();
        std::fs::write(layout.local_db(), r#"{"hair":{"10"#).unwrap();

        let db = AssetDb::open(layout.clone()).unwrap();

        assert!(db.local().is_installed(AssetType::Hair, 1001));
        assert_eq!(LocalState::load(&layout.local_db()).unwrap(), *db.local());
    }

    #[test]
    fn truncated_local_state_before_sync_opens_empty() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        layout.ensure_dirs().unwrap();
        std::fs::write(layout.local_db(), r#"{"hair":{"10"#).unwrap();

        let db = AssetDb::open(layout).unwrap();

        assert!(!db.is_synchronized());
        assert!(db.local().is_empty());
    }

    #[test]
    fn invalid_candidate_manifest_is_not_installed() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        layout.ensure_dirs().unwrap();
        std::fs::write(layout.remote_db(), BRAID).unwrap();
        let mut db = AssetDb::open(layout.clone()).unwrap();

        let candidate = layout.remote_db_part();
        std::fs::write(&candidate, "<html>captive portal</html>").unwrap();

        assert!(matches!(
            db.install_remote(&candidate),
            Err(CatalogError::Parse(_))
        ));
        assert!(!candidate.exists());
        assert_eq!(std::fs::read_to_string(layout.remote_db()).unwrap(), BRAID);
        assert_eq!(db.remote().len(), 1);
    }

    #[test]
    fn valid_candidate_manifest_replaces_remote_json() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        layout.ensure_dirs().unwrap();
        let mut db = AssetDb::open(layout.clone()).unwrap();

        let candidate = layout.remote_db_part();
        std::fs::write(&candidate, BRAID).unwrap();
        db.install_remote(&candidate).unwrap();

        assert!(!candidate.exists());
        assert!(db.is_synchronized());
        assert_eq!(std::fs::read_to_string(layout.remote_db()).unwrap(), BRAID);
    }
}
