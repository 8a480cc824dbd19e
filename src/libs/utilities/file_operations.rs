// File helpers shared by the cache, config and keystore code: whole-file
// atomic replacement and owner-only permissions for secrets.

use crate::log_debug;
use colored::Colorize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Replaces `path` with `contents` in one step.
///
/// The data is written to a temporary file in the same directory and then
/// renamed over the target, so readers see either the old file or the new
/// one, never a truncated mix. Parent directories are created if needed.
///
/// # Arguments
/// * `path`: Destination file.
/// * `contents`: Full new contents.
///
/// # Returns
/// * `io::Result<()>`: any error creating, writing or renaming the temporary file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    log_debug!("[Files] Wrote {}", path.display().to_string().cyan());
    Ok(())
}

/// Restricts `path` to owner read/write (`0600`).
///
/// Best-effort: failures are logged at debug level and otherwise ignored, and
/// on platforms without POSIX permissions this does nothing.
#[cfg(unix)]
pub fn restrict_to_owner(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let result = fs::metadata(path).and_then(|meta| {
        let mut perms = meta.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)
    });
    if let Err(e) = result {
        log_debug!("[Files] Could not restrict permissions on {}: {}", path.display(), e);
    }
}

#[cfg(not(unix))]
pub fn restrict_to_owner(path: &Path) {
    log_debug!("[Files] Skipping permission change on {} (no POSIX permissions)", path.display());
}
