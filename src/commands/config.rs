// `serverbox config get|set|keys`: key-path access to a server config file.

use crate::cli::cmd_enums::ConfigCommands;
use anyhow::{Context, Result, bail};
use colored::Colorize;
use serverbox::libs::config_keys;
use serverbox::libs::config_loading::{load_or_default, save_server_config};
use serverbox::libs::paths::DEFAULT_CONFIG_FILE;
use serverbox::libs::utilities::path_helpers::expand_path;
use serverbox::{log_info, log_warn};
use std::path::PathBuf;

fn config_path(config: Option<String>) -> PathBuf {
    config
        .map(|c| expand_path(&c))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub fn run(action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Get { key, config } => get(&key, config_path(config)),
        ConfigCommands::Set { key, value, config } => set(&key, &value, config_path(config)),
        ConfigCommands::Keys => {
            for key in config_keys::available_keys() {
                println!(
                    "{:<24} {}",
                    key.bold(),
                    config_keys::describe_key(key).unwrap_or_default()
                );
            }
            Ok(())
        }
    }
}

fn get(key: &str, path: PathBuf) -> Result<()> {
    if !config_keys::is_known_key(key) {
        bail!("unknown config key '{}' (see `serverbox config keys`)", key);
    }
    let config = load_or_default(&path).with_context(|| format!("loading {}", path.display()))?;
    match config_keys::get(&config, key) {
        Some(value) => println!("{}", value),
        None => log_info!("{} is not set", key.bold()),
    }
    Ok(())
}

fn set(key: &str, value: &str, path: PathBuf) -> Result<()> {
    if !config_keys::is_known_key(key) {
        log_warn!(
            "Unknown config key '{}'; nothing changed (see `serverbox config keys`)",
            key.yellow()
        );
        return Ok(());
    }
    let mut config = load_or_default(&path).with_context(|| format!("loading {}", path.display()))?;
    let before = config.clone();
    config_keys::set(&mut config, key, value);
    if config == before {
        log_info!("{} unchanged", key.bold());
        return Ok(());
    }
    save_server_config(&config, &path).with_context(|| format!("saving {}", path.display()))?;
    log_info!(
        "Set {} = {}",
        key.bold(),
        config_keys::get(&config, key).unwrap_or_default().green()
    );
    Ok(())
}
