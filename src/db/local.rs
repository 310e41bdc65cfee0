//! Installed-state store
//!
//! The persisted map is a cache: it can always be rebuilt by checking every
//! catalog record against the filesystem.

use super::remote::RemoteCatalog;
use crate::assets::{AssetType, TIMESTAMP_FORMAT};
use crate::config::AssetLayout;
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One installed asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledAsset {
    /// Absolute path of the pertinent file
    pub file: PathBuf,
    /// File modification time, `YYYY-MM-DD HH:MM:SS` local time
    pub modified: String,
}

impl InstalledAsset {
    /// Describe `file` using its current modification time
    pub fn from_file(file: &Path) -> Result<Self> {
        Ok(Self {
            file: file.to_path_buf(),
            modified: modified_timestamp(file)?,
        })
    }

    pub fn modified_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.modified, TIMESTAMP_FORMAT).ok()
    }
}

/// Installed assets keyed by type and id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalState {
    assets: BTreeMap<AssetType, BTreeMap<u64, InstalledAsset>>,
}

impl Default for LocalState {
    fn default() -> Self {
        Self::empty()
    }
}

impl LocalState {
    /// One empty group per known type
    pub fn empty() -> Self {
        Self {
            assets: AssetType::all().iter().map(|t| (*t, BTreeMap::new())).collect(),
        }
    }

    /// Read the persisted state. A missing file means nothing is installed.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("Local json local path {}", path.display());

        if !path.exists() {
            tracing::warn!("Local json does not exist");
            return Ok(Self::empty());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut state: LocalState = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        for asset_type in AssetType::all() {
            state.assets.entry(*asset_type).or_default();
        }
        Ok(state)
    }

    /// Full overwrite of the persisted state
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        // Write beside the target, then rename over it
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).context("Failed to serialize local state")?;
        std::fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Derive the state from the filesystem: an asset is installed when its
    /// install directory and pertinent file both exist.
    pub fn scan(catalog: &RemoteCatalog, layout: &AssetLayout) -> Result<Self> {
        let mut state = Self::empty();

        for asset in catalog.iter() {
            let location = asset.install_path(layout);
            if !location.exists() {
                tracing::trace!("NOT installed asset {}", location.display());
                continue;
            }

            let Some(file) = asset.pertinent_file(layout) else {
                tracing::trace!("Asset {} has no pertinent file", asset.id());
                continue;
            };

            if file.exists() {
                tracing::debug!("Installed asset {}", location.display());
                state.insert(asset.asset_type(), asset.id(), InstalledAsset::from_file(&file)?);
            } else {
                tracing::trace!("NOT installed asset {}", location.display());
            }
        }

        Ok(state)
    }

    /// Scan the filesystem and persist the result to `layout.local_db()`
    pub fn rebuild(catalog: &RemoteCatalog, layout: &AssetLayout) -> Result<Self> {
        let state = Self::scan(catalog, layout)?;
        state.save(&layout.local_db())?;
        tracing::info!("Rebuilt local state: {} installed assets", state.len());
        Ok(state)
    }

    pub fn insert(&mut self, asset_type: AssetType, id: u64, installed: InstalledAsset) {
        self.assets.entry(asset_type).or_default().insert(id, installed);
    }

    /// Insert or refresh the entry for `file` from its current mtime
    pub fn record_install(&mut self, asset_type: AssetType, id: u64, file: &Path) -> Result<()> {
        let installed = InstalledAsset::from_file(file)?;
        self.insert(asset_type, id, installed);
        Ok(())
    }

    pub fn get(&self, asset_type: AssetType, id: u64) -> Option<&InstalledAsset> {
        self.assets.get(&asset_type).and_then(|group| group.get(&id))
    }

    pub fn is_installed(&self, asset_type: AssetType, id: u64) -> bool {
        self.get(asset_type, id).is_some()
    }

    pub fn installed_count(&self, asset_type: AssetType) -> usize {
        self.assets.get(&asset_type).map_or(0, BTreeMap::len)
    }

    pub fn len(&self) -> usize {
        self.assets.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Modification time of `path` as `YYYY-MM-DD HH:MM:SS` in local time
pub fn modified_timestamp(path: &Path) -> Result<String> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("Failed to read modification time of {}", path.display()))?;
    let local: DateTime<Local> = modified.into();
    Ok(local.format(TIMESTAMP_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn catalog() -> RemoteCatalog {
        RemoteCatalog::from_json(
            r#"{
                "1": {"type":"hair","author":"Jane","files":{"main":"http://x/1/braid.mhclo"}},
                "2": {"type":"hair","author":"Jane","files":{"main":"http://x/2/bob.mhclo"}},
                "3": {"type":"pose","author":"Bob","files":{"bvh":"http://x/3/walk.bvh"}},
                "4": {"type":"skin","author":"Bob","files":{"render":"http://x/4/r.png"}}
            }"#,
        )
        .unwrap()
    }

    fn install(layout: &AssetLayout, asset_type: AssetType, id: u64, name: &str) -> PathBuf {
        let dir = layout.install_dir(asset_type, id);
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join(name);
        std::fs::write(&file, b"data").unwrap();
        file
    }

    #[test]
    fn scan_records_exactly_the_present_assets() {
        let dir = TempDir::new().unwrap();
        let layout = AssetLayout::new(dir.path().join("assets"), dir.path().join("install"));
        let catalog = catalog();

        let braid = install(&layout, AssetType::Hair, 1, "braid.mhclo");
        // Directory exists but the pertinent file does not.
        install(&layout, AssetType::Hair, 2, "something-else.obj");
        install(&layout, AssetType::Pose, 3, "walk.bvh");
        // No payload role at all.
        std::fs::create_dir_all(layout.install_dir(AssetType::Skin, 4)).unwrap();

        let state = LocalState::scan(&catalog, &layout).unwrap();

        assert_eq!(state.len(), 2);
        assert_eq!(state.get(AssetType::Hair, 1).unwrap().file, braid);
        assert!(!state.is_installed(AssetType::Hair, 2));
        assert!(state.is_installed(AssetType::Pose, 3));
        assert!(!state.is_installed(AssetType::Skin, 4));
    }

    #[test]
    fn rebuild_persists_every_type_group() {
        let dir = TempDir::new().unwrap();
        let layout = AssetLayout::new(dir.path().join("assets"), dir.path().join("install"));
        install(&layout, AssetType::Hair, 1, "braid.mhclo");

        LocalState::rebuild(&catalog(), &layout).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(layout.local_db()).unwrap()).unwrap();
        let object = raw.as_object().unwrap();
        assert_eq!(object.len(), AssetType::all().len());
        assert!(object["expression"].as_object().unwrap().is_empty());
        assert!(object["hair"]["1"]["file"].as_str().unwrap().ends_with("braid.mhclo"));
    }

    #[test]
    fn persisted_state_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local.json");

        let mut state = LocalState::empty();
        state.insert(
            AssetType::Clothes,
            77,
            InstalledAsset {
                file: PathBuf::from("/install/clothes/77/shirt.mhclo"),
                modified: "2021-03-04 05:06:07".to_string(),
            },
        );
        state.save(&path).unwrap();

        assert_eq!(LocalState::load(&path).unwrap(), state);
        assert!(!dir.path().join("local.json.tmp").exists());
    }

    #[test]
    fn missing_file_loads_empty_groups() {
        let dir = TempDir::new().unwrap();
        let state = LocalState::load(&dir.path().join("local.json")).unwrap();

        assert!(state.is_empty());
        assert_eq!(state.installed_count(AssetType::Rig), 0);
    }

    #[test]
    fn partial_file_gets_missing_groups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local.json");
        std::fs::write(
            &path,
            r#"{"hair":{"5":{"file":"/x/5/a.mhclo","modified":"2020-01-01 00:00:00"}}}"#,
        )
        .unwrap();

        let state = LocalState::load(&path).unwrap();
        assert!(state.is_installed(AssetType::Hair, 5));
        assert_eq!(state, {
            let mut expected = LocalState::empty();
            expected.insert(
                AssetType::Hair,
                5,
                InstalledAsset {
                    file: PathBuf::from("/x/5/a.mhclo"),
                    modified: "2020-01-01 00:00:00".to_string(),
                },
            );
            expected
        });
    }

    #[test]
    fn truncated_file_is_a_load_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local.json");
        std::fs::write(&path, r#"{"hair":{"10"#).unwrap();

        assert!(LocalState::load(&path).is_err());
    }

    #[test]
    fn modified_timestamp_has_second_precision() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"x").unwrap();

        let stamp = modified_timestamp(&file).unwrap();
        assert_eq!(stamp.len(), "YYYY-MM-DD HH:MM:SS".len());
        assert!(NaiveDateTime::parse_from_str(&stamp, TIMESTAMP_FORMAT).is_ok());
    }
}
