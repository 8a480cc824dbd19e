// Reading and writing server config files. The format follows the file
// extension: JSON (the default `lucee.json`), YAML or TOML.

use crate::libs::errors::ConfigError;
use crate::libs::utilities::file_operations::write_atomic;
use crate::schemas::server_config::ServerConfig;
use crate::{log_debug, log_info};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Serialization formats a server config file may use, picked by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Maps a file extension to a format. Anything unrecognised is an error
    /// rather than a guess.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(ConfigFormat::Json),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Loads a `ServerConfig` from a JSON, YAML or TOML file.
///
/// Missing fields fall back to their defaults, so partial files are fine.
///
/// # Arguments
/// * `path`: The config file, typically `<project>/lucee.json`.
///
/// # Returns
/// * `Ok(ServerConfig)` on success.
/// * `Err(ConfigError)` if the file cannot be read, has an unknown extension,
///   or does not parse.
pub fn load_server_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let format = ConfigFormat::from_path(path)?;
    log_debug!("[Config] Loading {:?} config from {}", format, path.display());

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let config = match format {
        ConfigFormat::Json => serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
        ConfigFormat::Yaml => serde_yaml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
        ConfigFormat::Toml => toml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?,
    };
    log_debug!("[Config] Loaded: {:?}", config);
    Ok(config)
}

/// Loads a config file if it exists, otherwise returns the defaults.
///
/// This is what `config set` uses so that the first `set` in a fresh project
/// creates the file.
pub fn load_or_default(path: &Path) -> Result<ServerConfig, ConfigError> {
    if path.exists() {
        load_server_config(path)
    } else {
        log_info!(
            "[Config] {} not found, starting from defaults",
            path.display().to_string().yellow()
        );
        Ok(ServerConfig::default())
    }
}

/// Writes `config` to `path` in the format implied by its extension.
/// The file is replaced atomically.
pub fn save_server_config(config: &ServerConfig, path: &Path) -> Result<(), ConfigError> {
    let format = ConfigFormat::from_path(path)?;
    let serialize_error = |message: String| ConfigError::Serialize {
        path: path.to_path_buf(),
        message,
    };

    let text = match format {
        ConfigFormat::Json => {
            serde_json::to_string_pretty(config).map_err(|e| serialize_error(e.to_string()))? + "\n"
        }
        ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| serialize_error(e.to_string()))?,
        ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| serialize_error(e.to_string()))?,
    };

    write_atomic(path, text.as_bytes()).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log_info!("[Config] Saved {}", path.display().to_string().green());
    Ok(())
}

/// Name to use for an instance: the configured `name`, or the project
/// directory's final component when that is empty.
pub fn instance_name(config: &ServerConfig, project_dir: &Path) -> String {
    if !config.name.trim().is_empty() {
        return config.name.trim().to_string();
    }
    std::path::absolute(project_dir)
        .unwrap_or_else(|_| PathBuf::from(project_dir))
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "default".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn json_yaml_and_toml_all_load() {
        let dir = TempDir::new().unwrap();

        let json = dir.path().join("lucee.json");
        fs::write(&json, r#"{"port": 8500, "https": {"enabled": true, "port": 8543}}"#).unwrap();
        let yaml = dir.path().join("lucee.yaml");
        fs::write(&yaml, "port: 8500\nhttps:\n  enabled: true\n  port: 8543\n").unwrap();
        let toml_path = dir.path().join("lucee.toml");
        fs::write(&toml_path, "port = 8500\n[https]\nenabled = true\nport = 8543\n").unwrap();

        for path in [json, yaml, toml_path] {
            let config = load_server_config(&path).unwrap();
            assert_eq!(config.port, 8500);
            assert_eq!(config.effective_https_port(), 8543);
            assert_eq!(config.host, "localhost");
        }
    }

    #[test]
    fn save_then_load_preserves_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lucee.json");
        let mut config = ServerConfig::default();
        config.name = "shop".to_string();
        config.jvm.additional_args = vec!["-Dx=1".to_string()];

        save_server_config(&config, &path).unwrap();
        assert_eq!(load_server_config(&path).unwrap(), config);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_server_config(Path::new("/tmp/lucee.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lucee.json");
        fs::write(&path, "{ port: ").unwrap();
        assert!(matches!(load_server_config(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_or_default(&dir.path().join("lucee.json")).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn instance_name_falls_back_to_directory() {
        let config = ServerConfig::default();
        assert_eq!(instance_name(&config, Path::new("/srv/my-site")), "my-site");
        let named = ServerConfig {
            name: "shop".to_string(),
            ..Default::default()
        };
        assert_eq!(instance_name(&named, Path::new("/srv/my-site")), "shop");
    }
}
