// `serverbox versions`: installable runtime versions, newest first.

use anyhow::Result;
use serverbox::log_debug;
use serverbox::libs::paths::version_cache_path;
use serverbox::libs::version_catalog::VersionCatalog;

pub fn run(refresh: bool, clear_cache: bool) -> Result<()> {
    let catalog = VersionCatalog::new(version_cache_path());
    log_debug!("[Versions] Cache file: {}", catalog.cache_path().display());
    if clear_cache {
        catalog.clear_cache();
        return Ok(());
    }
    for version in catalog.available_versions(refresh) {
        println!("{}", version);
    }
    Ok(())
}
