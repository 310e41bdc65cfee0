//! Remote catalog loaded from the synchronized manifest

use crate::assets::{AssetRecord, AssetType, ManifestEntry, UnknownAssetType};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Errors that abort a catalog load
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The manifest names a type this client does not know about, which means
    /// the manifest and client versions disagree.
    #[error(transparent)]
    UnknownAssetType(#[from] UnknownAssetType),

    #[error("Invalid asset id in manifest: {0}")]
    InvalidId(String),

    #[error("Failed to access manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Records grouped by type, plus the option lists derived while loading
#[derive(Debug, Clone, Default)]
pub struct RemoteCatalog {
    assets: BTreeMap<AssetType, BTreeMap<u64, AssetRecord>>,
    known_authors: Vec<String>,
    known_clothes_categories: Vec<String>,
    synchronized: bool,
}

impl RemoteCatalog {
    /// An unsynchronized catalog with one empty group per type
    pub fn empty() -> Self {
        Self {
            assets: AssetType::all().iter().map(|t| (*t, BTreeMap::new())).collect(),
            ..Self::default()
        }
    }

    /// Load the manifest at `path`. A missing file yields an empty,
    /// unsynchronized catalog.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        tracing::debug!("Remote json local path {}", path.display());

        if !path.exists() {
            tracing::warn!("Remote json does not exist locally");
            return Ok(Self::empty());
        }

        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Build a catalog from manifest text
    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let raw: BTreeMap<String, ManifestEntry> = serde_json::from_str(content)?;

        let mut catalog = Self::empty();
        let mut authors = BTreeSet::new();
        let mut categories = BTreeSet::new();

        for (key, entry) in raw {
            let id: u64 = key
                .trim()
                .parse()
                .map_err(|_| CatalogError::InvalidId(key.clone()))?;

            let record = AssetRecord::from_entry(id, entry).inspect_err(|e| {
                tracing::error!("{}", e);
            })?;

            if record.asset_type() == AssetType::Clothes {
                categories.insert(record.category().to_string());
            }
            authors.insert(record.author().to_string());

            catalog
                .assets
                .entry(record.asset_type())
                .or_default()
                .insert(id, record);
        }

        catalog.known_authors = authors.into_iter().collect();
        catalog.known_clothes_categories = categories.into_iter().collect();
        catalog.synchronized = true;

        tracing::debug!(
            "Loaded {} remote assets from {} authors",
            catalog.len(),
            catalog.known_authors.len()
        );
        Ok(catalog)
    }

    /// Whether a manifest has been loaded
    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    pub fn get(&self, asset_type: AssetType, id: u64) -> Option<&AssetRecord> {
        self.assets.get(&asset_type).and_then(|group| group.get(&id))
    }

    /// All records of one type, ordered by id
    pub fn of_type(&self, asset_type: AssetType) -> impl Iterator<Item = &AssetRecord> {
        self.assets
            .get(&asset_type)
            .into_iter()
            .flat_map(|group| group.values())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetRecord> {
        self.assets.values().flat_map(|group| group.values())
    }

    pub fn count(&self, asset_type: AssetType) -> usize {
        self.assets.get(&asset_type).map_or(0, BTreeMap::len)
    }

    pub fn len(&self) -> usize {
        self.assets.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted distinct authors across all types
    pub fn known_authors(&self) -> &[String] {
        &self.known_authors
    }

    /// Sorted distinct clothes categories
    pub fn known_clothes_categories(&self) -> &[String] {
        &self.known_clothes_categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
        "1001": {"type":"hair", "author":"Jane", "title":"Braid",
                 "files":{"thumb":"http://x/1001/t.png","main":"http://x/1001/m.mhclo"}},
        "20": {"type":"clothes", "author":"Bob", "category":"Shoes", "title":"Boots"},
        "21": {"type":"clothes", "author":"Ann", "category":"Dresses", "title":"Gown"},
        "22": {"type":"clothes", "author":"Bob", "category":"Shoes", "title":"Sandals"}
    }"#;

    #[test]
    fn missing_manifest_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let catalog = RemoteCatalog::load(&dir.path().join("remote.json")).unwrap();

        assert!(!catalog.is_synchronized());
        assert!(catalog.is_empty());
        assert_eq!(catalog.count(AssetType::Hair), 0);
    }

    #[test]
    fn loads_records_grouped_by_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("remote.json");
        std::fs::write(&path, MANIFEST).unwrap();

        let catalog = RemoteCatalog::load(&path).unwrap();

        assert!(catalog.is_synchronized());
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.count(AssetType::Hair), 1);
        assert_eq!(catalog.count(AssetType::Clothes), 3);

        let braid = catalog.get(AssetType::Hair, 1001).unwrap();
        assert_eq!(braid.author(), "Jane");
        assert_eq!(braid.title(), "Braid");
        assert!(catalog.get(AssetType::Clothes, 1001).is_none());
    }

    #[test]
    fn null_description_does_not_abort_the_load() {
        let catalog =
            RemoteCatalog::from_json(r#"{"1":{"type":"hair","author":"Jane","description":null}}"#)
                .unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(AssetType::Hair, 1).unwrap().description(), "");
    }

    #[test]
    fn collects_sorted_distinct_option_lists() {
        let catalog = RemoteCatalog::from_json(MANIFEST).unwrap();

        assert_eq!(catalog.known_authors(), ["Ann", "Bob", "Jane"]);
        assert_eq!(catalog.known_clothes_categories(), ["Dresses", "Shoes"]);
    }

    #[test]
    fn unknown_type_aborts_the_load() {
        let manifest = r#"{
            "1": {"type":"hair", "author":"Jane"},
            "2": {"type":"alien-thing", "author":"Zed"}
        }"#;

        let err = RemoteCatalog::from_json(manifest).unwrap_err();
        match err {
            CatalogError::UnknownAssetType(UnknownAssetType(name)) => {
                assert_eq!(name, "alien-thing")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_id_is_rejected() {
        let err = RemoteCatalog::from_json(r#"{"abc": {"type":"hair"}}"#).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidId(id) if id == "abc"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = RemoteCatalog::from_json("[1, 2").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }
}
