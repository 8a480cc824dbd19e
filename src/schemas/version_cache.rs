// On-disk shape of the runtime version cache and of the registry response.

use serde::{Deserialize, Serialize};

/// Contents of `~/.serverbox/lucee-versions.json`.
///
/// The file is always replaced as a whole; it is never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionCacheEntry {
    /// Installable versions, newest first.
    pub versions: Vec<String>,
    /// When the list was fetched, in milliseconds since the Unix epoch.
    pub last_updated: i64,
    /// Registry URL the list came from.
    pub source: String,
}

/// One element of the registry's JSON array. The registry sends more fields
/// than this; unknown ones are ignored.
#[derive(Debug, Deserialize)]
pub struct RegistryVersion {
    pub version: String,
}
