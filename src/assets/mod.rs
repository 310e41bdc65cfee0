//! Asset types and records

mod record;
mod types;

pub use record::{
    file_name_from_url, AssetRecord, ManifestEntry, ROLE_MAIN, ROLE_SCREENSHOT, ROLE_THUMB,
    TIMESTAMP_FORMAT,
};
pub use types::{AssetType, UnknownAssetType};
