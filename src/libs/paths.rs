// Well-known locations under the tool home (`~/.serverbox`) and inside an
// instance directory.

use crate::{log_debug, log_warn};
use colored::Colorize;
use std::env;
use std::path::{Path, PathBuf};

/// Name of the tool home directory under the user's home.
pub const TOOL_HOME_DIR: &str = ".serverbox";
/// File name of the runtime version cache inside the tool home.
pub const VERSION_CACHE_FILE: &str = "lucee-versions.json";
/// Default config file name looked up in a project directory.
pub const DEFAULT_CONFIG_FILE: &str = "lucee.json";

/// Returns the tool home, typically `~/.serverbox`.
///
/// If the home directory cannot be determined this falls back to
/// `./.serverbox` and says so, rather than failing the whole command.
pub fn tool_home() -> PathBuf {
    if let Some(home_dir) = dirs::home_dir() {
        let dir = home_dir.join(TOOL_HOME_DIR);
        log_debug!("[Paths] Tool home resolved to: {}", dir.display().to_string().cyan());
        dir
    } else {
        let fallback = env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(TOOL_HOME_DIR);
        log_warn!(
            "[Paths] Could not determine home directory. Using {}",
            fallback.display().to_string().yellow()
        );
        fallback
    }
}

/// `~/.serverbox/lucee-versions.json`
pub fn version_cache_path() -> PathBuf {
    tool_home().join(VERSION_CACHE_FILE)
}

/// Default instance directory for a named instance: `~/.serverbox/servers/<name>`.
pub fn default_instance_dir(name: &str) -> PathBuf {
    tool_home().join("servers").join(name)
}

/// Where the patched server configuration lives inside an instance.
pub fn server_xml_path(instance_dir: &Path) -> PathBuf {
    instance_dir.join("conf").join("server.xml")
}

/// Directory holding the keystore and its password.
pub fn certs_dir(instance_dir: &Path) -> PathBuf {
    instance_dir.join("certs")
}

/// Location of the rewrite rules Tomcat's RewriteValve reads for a host:
/// `conf/<engine>/<host>/rewrite.config`.
pub fn rewrite_config_path(instance_dir: &Path, engine_name: &str, host_name: &str) -> PathBuf {
    instance_dir
        .join("conf")
        .join(engine_name)
        .join(host_name)
        .join("rewrite.config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_relative_layout() {
        let instance = Path::new("/tmp/inst");
        assert_eq!(server_xml_path(instance), PathBuf::from("/tmp/inst/conf/server.xml"));
        assert_eq!(certs_dir(instance), PathBuf::from("/tmp/inst/certs"));
        assert_eq!(
            rewrite_config_path(instance, "Catalina", "localhost"),
            PathBuf::from("/tmp/inst/conf/Catalina/localhost/rewrite.config")
        );
    }

    #[test]
    fn cache_lives_in_tool_home() {
        let path = version_cache_path();
        assert!(path.ends_with(Path::new(TOOL_HOME_DIR).join(VERSION_CACHE_FILE)));
    }
}
