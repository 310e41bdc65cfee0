//! Asset records parsed from manifest entries

use super::types::{AssetType, UnknownAssetType};
use crate::config::AssetLayout;
use crate::download::DownloadItem;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// File role of the full-size screenshot
pub const ROLE_SCREENSHOT: &str = "render";
/// File role of the thumbnail
pub const ROLE_THUMB: &str = "thumb";
/// Role that always wins when choosing the pertinent payload
pub const ROLE_MAIN: &str = "main";

/// Timestamp format shared by manifest `changed` values and local state
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One entry of the remote manifest, as found on the wire
///
/// Server exports may carry `null` for any text field; those read as empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ManifestEntry {
    #[serde(rename = "type", deserialize_with = "null_as_empty")]
    pub asset_type: String,
    #[serde(alias = "username", deserialize_with = "null_as_empty")]
    pub author: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub category: String,
    pub changed: Option<serde_json::Value>,
    #[serde(deserialize_with = "string_files")]
    pub files: BTreeMap<String, String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// File roles whose value is not a URL string are dropped
fn string_files<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(role, value)| match value {
            serde_json::Value::String(url) => Some((role, url)),
            _ => None,
        })
        .collect())
}

/// A downloadable asset. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    id: u64,
    asset_type: AssetType,
    category: String,
    author: String,
    title: String,
    description: String,
    changed: Option<NaiveDateTime>,
    files: BTreeMap<String, String>,
}

impl AssetRecord {
    /// Build a record from a manifest entry, rejecting unknown types
    pub fn from_entry(id: u64, entry: ManifestEntry) -> Result<Self, UnknownAssetType> {
        let asset_type: AssetType = entry.asset_type.parse()?;
        let changed = entry.changed.as_ref().and_then(parse_changed);

        Ok(Self {
            id,
            asset_type,
            category: entry.category.trim().to_string(),
            author: entry.author.trim().to_string(),
            title: entry.title,
            description: entry.description,
            changed,
            files: entry.files,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    /// Clothes subtype; empty for every other type
    pub fn category(&self) -> &str {
        if self.asset_type == AssetType::Clothes {
            &self.category
        } else {
            ""
        }
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Last remote update, in local time
    pub fn changed(&self) -> Option<NaiveDateTime> {
        self.changed
    }

    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    pub fn has_screenshot(&self) -> bool {
        self.files.contains_key(ROLE_SCREENSHOT)
    }

    pub fn has_thumbnail(&self) -> bool {
        self.files.contains_key(ROLE_THUMB)
    }

    /// Roles that carry installable files rather than previews
    pub fn payload_roles(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files
            .iter()
            .filter(|(role, _)| !is_metadata_role(role))
            .map(|(role, url)| (role.as_str(), url.as_str()))
    }

    /// Role whose file decides whether the asset counts as installed
    pub fn pertinent_role(&self) -> Option<&str> {
        let preferred = [ROLE_MAIN, self.asset_type.payload_role()];
        preferred
            .into_iter()
            .find(|role| self.files.contains_key(*role))
            .or_else(|| self.payload_roles().map(|(role, _)| role).next())
    }

    /// Installed file name of the pertinent payload
    pub fn pertinent_file_name(&self) -> Option<&str> {
        let role = self.pertinent_role()?;
        self.files.get(role).and_then(|url| file_name_from_url(url))
    }

    pub fn install_path(&self, layout: &AssetLayout) -> PathBuf {
        layout.install_dir(self.asset_type, self.id)
    }

    pub fn pertinent_file(&self, layout: &AssetLayout) -> Option<PathBuf> {
        self.pertinent_file_name()
            .map(|name| self.install_path(layout).join(name))
    }

    pub fn thumb_path(&self, layout: &AssetLayout) -> Option<PathBuf> {
        self.has_thumbnail()
            .then(|| layout.cache_dir(self.id).join("thumb.png"))
    }

    pub fn screenshot_path(&self, layout: &AssetLayout) -> Option<PathBuf> {
        self.has_screenshot()
            .then(|| layout.cache_dir(self.id).join("screenshot.png"))
    }

    /// Thumbnail copy placed next to the installed payload
    pub fn thumb_sidecar(&self, layout: &AssetLayout) -> Option<PathBuf> {
        let pertinent = self.pertinent_file(layout)?;
        Some(pertinent.with_extension("thumb"))
    }

    /// Preview files fetched during a catalog sync
    pub fn metadata_targets(
        &self,
        layout: &AssetLayout,
        screenshots: bool,
        thumbnails: bool,
    ) -> Vec<DownloadItem> {
        let mut targets = Vec::new();
        if screenshots {
            if let (Some(url), Some(dest)) =
                (self.files.get(ROLE_SCREENSHOT), self.screenshot_path(layout))
            {
                targets.push(DownloadItem::new(url, dest));
            }
        }
        if thumbnails {
            if let (Some(url), Some(dest)) = (self.files.get(ROLE_THUMB), self.thumb_path(layout)) {
                targets.push(DownloadItem::new(url, dest));
            }
        }
        targets
    }

    /// Files fetched when the asset itself is downloaded: the thumbnail plus
    /// every payload role. The screenshot is not part of an install.
    pub fn payload_targets(&self, layout: &AssetLayout) -> Vec<DownloadItem> {
        let mut targets = Vec::new();
        if let (Some(url), Some(dest)) = (self.files.get(ROLE_THUMB), self.thumb_path(layout)) {
            targets.push(DownloadItem::new(url, dest));
        }

        let install_path = self.install_path(layout);
        for (role, url) in self.payload_roles() {
            match file_name_from_url(url) {
                Some(name) => targets.push(DownloadItem::new(url, install_path.join(name))),
                None => tracing::warn!(
                    "Asset {} has no usable file name in its {} url: {}",
                    self.id,
                    role,
                    url
                ),
            }
        }
        targets
    }
}

fn is_metadata_role(role: &str) -> bool {
    role == ROLE_SCREENSHOT || role == ROLE_THUMB
}

/// Last path segment of a URL, ignoring query and fragment
pub fn file_name_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

/// Accepts epoch seconds (number or numeric string) or `YYYY-MM-DD HH:MM:SS`
fn parse_changed(value: &serde_json::Value) -> Option<NaiveDateTime> {
    let from_epoch = |secs: i64| {
        DateTime::from_timestamp(secs, 0).map(|utc| utc.with_timezone(&Local).naive_local())
    };

    match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(from_epoch),
        serde_json::Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(secs) => from_epoch(secs),
                Err(_) => NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok(),
            }
        }
        _ => None,
    }
}
