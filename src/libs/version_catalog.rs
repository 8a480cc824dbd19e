// This module knows which runtime versions can be installed.
//
// The list comes from the Lucee update provider, is cached on disk for 24 hours,
// and degrades in three steps when something goes wrong:
//   1. fresh cache (unless bypassed)
//   2. network fetch, persisted to the cache
//   3. any cache regardless of age, then a built-in list
//
// `available_versions` never fails and never returns an empty list.

use crate::libs::errors::CatalogError;
use crate::libs::utilities::file_operations::write_atomic;
use crate::libs::utilities::timestamps::{Clock, SystemClock, age_of, format_duration};
use crate::schemas::version_cache::{RegistryVersion, VersionCacheEntry};
use crate::{log_debug, log_info, log_warn};
use chrono::Duration;
use colored::Colorize;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

/// Registry endpoint returning a JSON array of `{ "version": "..." }` objects.
pub const DEFAULT_REGISTRY_URL: &str = "https://update.lucee.org/rest/update/provider/list?extended=true";

/// Upper bound for the whole registry request.
pub const FETCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Versions known to work, used when neither the network nor a cache is usable.
pub const FALLBACK_VERSIONS: &[&str] = &[
    "7.0.0.395",
    "6.2.2.91",
    "6.2.1.122",
    "6.1.2.47",
    "6.0.4.10",
    "5.4.6.9",
];

/// Where the version list comes from. The catalog only needs the raw body.
pub trait VersionSource {
    /// Identifies the source in the cache file (`source` field).
    fn url(&self) -> &str;

    /// Returns the raw JSON body.
    fn fetch(&self) -> Result<String, CatalogError>;
}

/// Fetches the version list over HTTP with `ureq`.
#[derive(Debug, Clone)]
pub struct HttpVersionSource {
    url: String,
    timeout: std::time::Duration,
}

impl HttpVersionSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: FETCH_TIMEOUT,
        }
    }
}

impl Default for HttpVersionSource {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL)
    }
}

impl VersionSource for HttpVersionSource {
    fn url(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Result<String, CatalogError> {
        // The agent-wide timeout covers connect, send and read, so a stalled
        // registry cannot hang the command.
        let agent = ureq::AgentBuilder::new()
            .timeout(self.timeout)
            .user_agent(concat!("serverbox/", env!("CARGO_PKG_VERSION")))
            .build();

        log_debug!("[Versions] GET {}", self.url.blue());
        let response = agent
            .get(&self.url)
            .call()
            .map_err(|e| CatalogError::Fetch(e.to_string()))?;
        response
            .into_string()
            .map_err(|e| CatalogError::Fetch(e.to_string()))
    }
}

/// Cached view of the installable runtime versions.
pub struct VersionCatalog<S = HttpVersionSource, C = SystemClock> {
    cache_path: PathBuf,
    source: S,
    clock: C,
    ttl: Duration,
}

impl VersionCatalog {
    /// A catalog backed by the real registry and wall clock.
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self::with_parts(cache_path, HttpVersionSource::default(), SystemClock)
    }
}

impl<S: VersionSource, C: Clock> VersionCatalog<S, C> {
    pub fn with_parts(cache_path: impl Into<PathBuf>, source: S, clock: C) -> Self {
        Self {
            cache_path: cache_path.into(),
            source,
            clock,
            ttl: Duration::hours(24),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Installable versions, newest first. Never empty.
    ///
    /// # Arguments
    /// * `bypass_cache`: skip the freshness check and go to the registry. The
    ///   cache is still used as a fallback if the registry fails.
    pub fn available_versions(&self, bypass_cache: bool) -> Vec<String> {
        if !bypass_cache {
            if let Some(entry) = self.read_cache() {
                let age = age_of(&self.clock, entry.last_updated);
                if age >= Duration::zero() && age < self.ttl {
                    log_debug!("[Versions] Using cached list ({} old)", format_duration(&age));
                    return entry.versions;
                }
                log_debug!("[Versions] Cached list is stale ({} old)", format_duration(&age));
            }
        }

        match self.fetch_and_cache() {
            Ok(versions) => versions,
            Err(e) => {
                log_warn!("[Versions] {}", e);
                if let Some(entry) = self.read_cache() {
                    log_warn!("[Versions] Using cached version list from {}", self.cache_path.display());
                    entry.versions
                } else {
                    log_warn!("[Versions] No cache available, using the built-in version list");
                    FALLBACK_VERSIONS.iter().map(|v| v.to_string()).collect()
                }
            }
        }
    }

    /// Deletes the cache file. Best-effort: errors are logged and ignored.
    pub fn clear_cache(&self) {
        match fs::remove_file(&self.cache_path) {
            Ok(()) => log_info!("[Versions] Cleared {}", self.cache_path.display().to_string().cyan()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log_debug!("[Versions] No cache to clear at {}", self.cache_path.display())
            }
            Err(e) => log_debug!("[Versions] Could not remove {}: {}", self.cache_path.display(), e),
        }
    }

    /// Reads the cache file. Missing, unreadable, corrupt and empty caches all
    /// count as "no cache".
    fn read_cache(&self) -> Option<VersionCacheEntry> {
        let contents = fs::read_to_string(&self.cache_path).ok()?;
        match serde_json::from_str::<VersionCacheEntry>(&contents) {
            Ok(entry) if !entry.versions.is_empty() => Some(entry),
            Ok(_) => None,
            Err(e) => {
                log_debug!("[Versions] Ignoring unreadable cache {}: {}", self.cache_path.display(), e);
                None
            }
        }
    }

    fn fetch_and_cache(&self) -> Result<Vec<String>, CatalogError> {
        let body = self.source.fetch()?;
        let versions = parse_registry_response(&body)?;

        let entry = VersionCacheEntry {
            versions: versions.clone(),
            last_updated: self.clock.now_millis(),
            source: self.source.url().to_string(),
        };
        // A cache we cannot write does not invalidate the list we just fetched.
        if let Err(e) = self.write_cache(&entry) {
            log_warn!("[Versions] {}", e);
        }
        log_info!("[Versions] Fetched {} versions from {}", versions.len(), self.source.url().cyan());
        Ok(versions)
    }

    fn write_cache(&self, entry: &VersionCacheEntry) -> Result<(), CatalogError> {
        let json = serde_json::to_string_pretty(entry).map_err(|e| CatalogError::Cache(e.to_string()))?;
        write_atomic(&self.cache_path, json.as_bytes())
            .map_err(|e| CatalogError::Cache(format!("{}: {}", self.cache_path.display(), e)))
    }
}

/// Parses the registry body into a deduplicated, newest-first list.
pub fn parse_registry_response(body: &str) -> Result<Vec<String>, CatalogError> {
    let entries: Vec<RegistryVersion> =
        serde_json::from_str(body).map_err(|e| CatalogError::Parse(e.to_string()))?;

    let mut versions: Vec<String> = entries
        .into_iter()
        .map(|e| e.version.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    versions.sort_by(|a, b| compare_versions(b, a));
    versions.dedup();

    if versions.is_empty() {
        return Err(CatalogError::Parse("registry returned no versions".to_string()));
    }
    Ok(versions)
}

/// Orders version strings such as `6.2.2.91`, `7.0.0.202-RC` and
/// `6.2.3.1-SNAPSHOT`.
///
/// Segments are split on `.` and `-`. Numeric segments compare as numbers,
/// others as text, and numbers sort above text. When one version runs out
/// of segments, a numeric continuation on the other side makes it newer
/// (`6.2.1` < `6.2.1.5`) and a textual one makes it a pre-release
/// (`6.2.1-RC` < `6.2.1`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split(['.', '-']);
    let mut right = b.split(['.', '-']);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(l), None) => {
                return if l.parse::<u64>().is_ok() {
                    Ordering::Greater
                } else {
                    Ordering::Less
                };
            }
            (None, Some(r)) => {
                return if r.parse::<u64>().is_ok() {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
            }
            (Some(l), Some(r)) => {
                let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Greater,
                    (Err(_), Ok(_)) => Ordering::Less,
                    (Err(_), Err(_)) => l.cmp(r),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}
