// Path helpers: `~`/`$VAR` expansion for user-supplied paths and the webroot
// resolution used by the server.xml patcher.

use crate::log_debug;
use std::path::{Component, Path, PathBuf};

/// Expands a leading `~` and any `$VAR`/`${VAR}` references in a user-supplied path.
///
/// Unknown variables are left as written; this is used for CLI arguments where
/// a literal `$` is more likely a typo than something worth aborting over.
///
/// # Arguments
/// * `path`: A string slice representing the path, which might start with `~`.
///
/// # Returns
/// * `PathBuf`: The expanded path.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

/// Resolves `webroot` against `project_dir` into an absolute, normalized path.
///
/// Absolute webroots are used as-is (after normalization). Relative ones are
/// joined onto the project directory, which itself is made absolute against
/// the current working directory when needed.
///
/// # Returns
/// * `Ok(PathBuf)`: absolute path with `.` and `..` components removed.
/// * `Err(String)`: human-readable reason the webroot cannot be resolved
///   (empty value, undefined environment variable, no usable working directory).
pub fn resolve_webroot(project_dir: &Path, webroot: &str) -> Result<PathBuf, String> {
    let trimmed = webroot.trim();
    if trimmed.is_empty() {
        return Err("webroot is empty".to_string());
    }

    // Unlike `expand_path`, an undefined variable here is an error: silently
    // mapping the webroot to a literal `$FOO` directory would serve the wrong files.
    let expanded = shellexpand::full(trimmed).map_err(|e| e.to_string())?;
    let candidate = PathBuf::from(expanded.as_ref());

    let joined = if candidate.is_absolute() {
        candidate
    } else {
        project_dir.join(candidate)
    };

    let absolute = std::path::absolute(&joined).map_err(|e| e.to_string())?;
    let normalized = normalize(&absolute);
    log_debug!("[Paths] webroot '{}' resolved to {}", webroot, normalized.display());
    Ok(normalized)
}

/// Removes `.` components and folds `..` into its parent without touching the
/// filesystem. The webroot does not have to exist yet when patching.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `pop` on the root is a no-op, which is what `/..` means anyway.
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
