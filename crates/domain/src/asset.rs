use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tempo::TempoBand;

pub const DEFAULT_ASSET_ROOT: &str = "assets/audio";
pub const DEFAULT_ASSET_EXTENSION: &str = "mp3";

/// Identifies one lehra recording. The composed name is a contract with the
/// asset store and must not change.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AssetKey {
    pub meter_id: String,
    pub mode_id: String,
    pub instrument_id: String,
    pub band: TempoBand,
}

impl AssetKey {
    pub fn new(
        meter_id: impl Into<String>,
        mode_id: impl Into<String>,
        instrument_id: impl Into<String>,
        band: TempoBand,
    ) -> Self {
        Self {
            meter_id: meter_id.into(),
            mode_id: mode_id.into(),
            instrument_id: instrument_id.into(),
            band,
        }
    }

    /// `{meter}_{mode}_{band}_{instrument}`
    pub fn identifier(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.meter_id,
            self.mode_id,
            self.band.as_str(),
            self.instrument_id
        )
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

/// Maps asset keys to storage locations understood by a loader.
pub trait AssetLocator: Send + Sync {
    fn file_name(&self, key: &AssetKey) -> String;
    fn locate(&self, key: &AssetKey) -> String;
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectoryLocator {
    pub root: String,
    pub extension: String,
}

impl DirectoryLocator {
    pub fn new(root: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }
}

impl Default for DirectoryLocator {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_ROOT, DEFAULT_ASSET_EXTENSION)
    }
}

impl AssetLocator for DirectoryLocator {
    fn file_name(&self, key: &AssetKey) -> String {
        format!("{}.{}", key.identifier(), self.extension)
    }

    fn locate(&self, key: &AssetKey) -> String {
        let root = self.root.trim_end_matches('/');
        if root.is_empty() {
            self.file_name(key)
        } else {
            format!("{}/{}", root, self.file_name(key))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_format_is_stable() {
        let key = AssetKey::new("teental", "kirwani", "santoor", TempoBand::Medium);
        assert_eq!(key.identifier(), "teental_kirwani_madhya_santoor");
    }

    #[test]
    fn directory_locator_builds_paths() {
        let key = AssetKey::new("rupak", "yaman", "sarangi", TempoBand::Fast);
        let locator = DirectoryLocator::default();
        assert_eq!(locator.file_name(&key), "rupak_yaman_drut_sarangi.mp3");
        assert_eq!(
            locator.locate(&key),
            "assets/audio/rupak_yaman_drut_sarangi.mp3"
        );

        let bare = DirectoryLocator::new("", "wav");
        assert_eq!(bare.locate(&key), "rupak_yaman_drut_sarangi.wav");

        let trailing = DirectoryLocator::new("lehras/", "ogg");
        assert_eq!(trailing.locate(&key), "lehras/rupak_yaman_drut_sarangi.ogg");
    }
}
