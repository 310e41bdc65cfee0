//! Catalog filtering

use super::local::LocalState;
use super::remote::RemoteCatalog;
use crate::assets::{AssetRecord, AssetType};
use anyhow::{bail, Result};
use chrono::{Duration, NaiveDateTime};

/// Installed-state predicate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstalledFilter {
    #[default]
    Any,
    Yes,
    No,
    /// Installed, but the remote copy changed after the local file
    RemoteNewer,
}

impl InstalledFilter {
    pub fn from_cli(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "any" => Ok(InstalledFilter::Any),
            "yes" => Ok(InstalledFilter::Yes),
            "no" => Ok(InstalledFilter::No),
            "remote-newer" | "remote_newer" | "newer" => Ok(InstalledFilter::RemoteNewer),
            other => bail!(
                "Invalid installed filter '{}'. Valid values: any, yes, no, remote-newer",
                other
            ),
        }
    }
}

/// Window for the "updated/created within" predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatedWithin {
    Week,
    Month,
    ThreeMonths,
    Year,
}

impl UpdatedWithin {
    pub fn days(&self) -> i64 {
        match self {
            UpdatedWithin::Week => 7,
            UpdatedWithin::Month => 30,
            UpdatedWithin::ThreeMonths => 90,
            UpdatedWithin::Year => 365,
        }
    }

    pub fn from_cli(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "week" => Ok(UpdatedWithin::Week),
            "month" => Ok(UpdatedWithin::Month),
            "three-months" | "three_months" | "quarter" => Ok(UpdatedWithin::ThreeMonths),
            "year" => Ok(UpdatedWithin::Year),
            other => bail!(
                "Invalid window '{}'. Valid values: week, month, three-months, year",
                other
            ),
        }
    }
}

/// Parse a yes/no option value
pub fn yes_no_from_cli(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" => Ok(true),
        "no" | "n" | "false" => Ok(false),
        other => bail!("Invalid value '{}'. Valid values: yes, no", other),
    }
}

/// User-supplied predicates. `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    pub author: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub installed: InstalledFilter,
    pub has_screenshot: Option<bool>,
    pub has_thumbnail: Option<bool>,
    pub updated_within: Option<UpdatedWithin>,
}

impl AssetFilter {
    /// Whether `asset` passes every supplied predicate
    pub fn matches(&self, asset: &AssetRecord, local: &LocalState, now: NaiveDateTime) -> bool {
        if let Some(author) = &self.author {
            if asset.author() != author {
                return false;
            }
        }

        if let Some(category) = &self.category {
            if asset.category() != category {
                return false;
            }
        }

        if let Some(title) = &self.title {
            if !contains_ignore_case(asset.title(), title) {
                return false;
            }
        }

        if let Some(description) = &self.description {
            if !contains_ignore_case(asset.description(), description) {
                return false;
            }
        }

        if let Some(wanted) = self.has_screenshot {
            if asset.has_screenshot() != wanted {
                return false;
            }
        }

        if let Some(wanted) = self.has_thumbnail {
            if asset.has_thumbnail() != wanted {
                return false;
            }
        }

        if let Some(window) = self.updated_within {
            match asset.changed() {
                Some(changed)
                    if changed <= now && now - changed <= Duration::days(window.days()) => {}
                _ => return false,
            }
        }

        let installed = local.get(asset.asset_type(), asset.id());
        match self.installed {
            InstalledFilter::Any => true,
            InstalledFilter::Yes => installed.is_some(),
            InstalledFilter::No => installed.is_none(),
            InstalledFilter::RemoteNewer => {
                match (installed.and_then(|i| i.modified_at()), asset.changed()) {
                    (Some(local_time), Some(remote_time)) => remote_time > local_time,
                    _ => false,
                }
            }
        }
    }
}

/// Records of `asset_type` that pass `filter`, in id order
pub fn filter_assets<'a>(
    catalog: &'a RemoteCatalog,
    local: &LocalState,
    asset_type: AssetType,
    filter: &AssetFilter,
    now: NaiveDateTime,
) -> Vec<&'a AssetRecord> {
    catalog
        .of_type(asset_type)
        .filter(|asset| filter.matches(asset, local, now))
        .collect()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
