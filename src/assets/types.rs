//! Known asset types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Asset type as named by the remote manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Pose,
    Clothes,
    Target,
    Hair,
    Teeth,
    Eyebrows,
    Eyelashes,
    Skin,
    Proxy,
    Material,
    Model,
    Rig,
    Expression,
}

impl AssetType {
    pub fn all() -> &'static [AssetType] {
        &[
            AssetType::Pose,
            AssetType::Clothes,
            AssetType::Target,
            AssetType::Hair,
            AssetType::Teeth,
            AssetType::Eyebrows,
            AssetType::Eyelashes,
            AssetType::Skin,
            AssetType::Proxy,
            AssetType::Material,
            AssetType::Model,
            AssetType::Rig,
            AssetType::Expression,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Pose => "pose",
            AssetType::Clothes => "clothes",
            AssetType::Target => "target",
            AssetType::Hair => "hair",
            AssetType::Teeth => "teeth",
            AssetType::Eyebrows => "eyebrows",
            AssetType::Eyelashes => "eyelashes",
            AssetType::Skin => "skin",
            AssetType::Proxy => "proxy",
            AssetType::Material => "material",
            AssetType::Model => "model",
            AssetType::Rig => "rig",
            AssetType::Expression => "expression",
        }
    }

    /// Directory under the install root holding assets of this type
    pub fn install_dir_name(&self) -> &'static str {
        match self {
            AssetType::Pose => "poses",
            AssetType::Clothes => "clothes",
            AssetType::Target => "targets",
            AssetType::Hair => "hair",
            AssetType::Teeth => "teeth",
            AssetType::Eyebrows => "eyebrows",
            AssetType::Eyelashes => "eyelashes",
            AssetType::Skin => "skins",
            AssetType::Proxy => "proxymeshes",
            AssetType::Material => "materials",
            AssetType::Model => "models",
            AssetType::Rig => "rigs",
            AssetType::Expression => "expressions",
        }
    }

    /// File role that usually carries the installable payload for this type
    pub fn payload_role(&self) -> &'static str {
        match self {
            AssetType::Clothes
            | AssetType::Hair
            | AssetType::Teeth
            | AssetType::Eyebrows
            | AssetType::Eyelashes => "mhclo",
            AssetType::Pose => "bvh",
            AssetType::Target => "target",
            AssetType::Skin | AssetType::Material => "mhmat",
            AssetType::Proxy => "proxy",
            AssetType::Model => "mhm",
            AssetType::Rig => "mhskel",
            AssetType::Expression => "mhpose",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = UnknownAssetType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownAssetType(s.to_string()))
    }
}

/// A type name that is not one of [`AssetType::all`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Asset type not known: {0}")]
pub struct UnknownAssetType(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_parses_from_its_name() {
        for t in AssetType::all() {
            assert_eq!(t.as_str().parse::<AssetType>(), Ok(*t));
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = "alien-thing".parse::<AssetType>().unwrap_err();
        assert_eq!(err, UnknownAssetType("alien-thing".to_string()));
        assert!("Hair".parse::<AssetType>().is_err());
    }

    #[test]
    fn serializes_as_lowercase_name() {
        let json = serde_json::to_string(&AssetType::Eyelashes).unwrap();
        assert_eq!(json, "\"eyelashes\"");
    }
}
