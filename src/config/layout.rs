//! On-disk layout of the asset database and install tree

use crate::assets::AssetType;
use std::path::{Path, PathBuf};

/// Resolved locations for one user profile.
///
/// The asset root holds the synchronized manifest, the installed-state file and
/// the metadata cache. Installed payloads live under the install root, one
/// directory per type and asset id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLayout {
    asset_root: PathBuf,
    install_root: PathBuf,
}

impl AssetLayout {
    pub fn new(asset_root: impl Into<PathBuf>, install_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            install_root: install_root.into(),
        }
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Local copy of the remote manifest: <asset_root>/remote.json
    pub fn remote_db(&self) -> PathBuf {
        self.asset_root.join("remote.json")
    }

    /// Download target of a manifest that has not been validated yet
    pub fn remote_db_part(&self) -> PathBuf {
        self.asset_root.join("remote.json.part")
    }

    /// Installed-state file: <asset_root>/local.json
    pub fn local_db(&self) -> PathBuf {
        self.asset_root.join("local.json")
    }

    /// Metadata cache: <asset_root>/remotecache/
    pub fn remote_cache(&self) -> PathBuf {
        self.asset_root.join("remotecache")
    }

    /// Cache directory for one asset's screenshot and thumbnail
    pub fn cache_dir(&self, asset_id: u64) -> PathBuf {
        self.remote_cache().join(asset_id.to_string())
    }

    /// Install directory: <install_root>/<type dir>/<id>/
    pub fn install_dir(&self, asset_type: AssetType, asset_id: u64) -> PathBuf {
        self.install_root
            .join(asset_type.install_dir_name())
            .join(asset_id.to_string())
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.asset_root)?;
        std::fs::create_dir_all(self.remote_cache())?;
        std::fs::create_dir_all(&self.install_root)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_the_two_roots() {
        let layout = AssetLayout::new("/data/assets", "/data/install");
        assert_eq!(layout.remote_db(), PathBuf::from("/data/assets/remote.json"));
        assert_eq!(
            layout.remote_db_part(),
            PathBuf::from("/data/assets/remote.json.part")
        );
        assert_eq!(layout.local_db(), PathBuf::from("/data/assets/local.json"));
        assert_eq!(layout.cache_dir(42), PathBuf::from("/data/assets/remotecache/42"));
        assert_eq!(
            layout.install_dir(AssetType::Proxy, 7),
            PathBuf::from("/data/install/proxymeshes/7")
        );
    }
}
