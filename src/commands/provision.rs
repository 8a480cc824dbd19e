// `serverbox provision`: load the config, patch the vendor server.xml, and
// write the result into the instance directory (or print it for a dry run).

use anyhow::{Context, Result};
use colored::Colorize;
use serverbox::libs::config_loading::{instance_name, load_server_config};
use serverbox::libs::keystore::KeytoolGenerator;
use serverbox::libs::paths::{DEFAULT_CONFIG_FILE, default_instance_dir, server_xml_path};
use serverbox::libs::server_xml::ServerXmlPatcher;
use serverbox::libs::utilities::file_operations::write_atomic;
use serverbox::libs::utilities::path_helpers::expand_path;
use serverbox::{log_debug, log_info};
use std::fs;
use std::path::PathBuf;

pub struct ProvisionArgs {
    pub base: String,
    pub config: Option<String>,
    pub project: Option<String>,
    pub instance: Option<String>,
    pub dry_run: bool,
}

pub fn run(args: ProvisionArgs) -> Result<()> {
    let project_dir = match &args.project {
        Some(p) => expand_path(p),
        None => std::env::current_dir().context("determining the current directory")?,
    };
    let config_path = args
        .config
        .as_deref()
        .map(expand_path)
        .unwrap_or_else(|| project_dir.join(DEFAULT_CONFIG_FILE));
    let config = load_server_config(&config_path)?;

    let instance_dir: PathBuf = match &args.instance {
        Some(i) => expand_path(i),
        None => default_instance_dir(&instance_name(&config, &project_dir)),
    };
    log_debug!("[Provision] project={} instance={}", project_dir.display(), instance_dir.display());

    let base_path = expand_path(&args.base);
    let base = fs::read_to_string(&base_path).with_context(|| format!("reading {}", base_path.display()))?;

    let keytool = KeytoolGenerator::locate();
    if config.https.enabled {
        log_debug!("[Provision] Certificate tool: {}", keytool.program().display());
    }
    let patcher = ServerXmlPatcher::new(keytool);
    let write_files = !args.dry_run;
    let patched = patcher
        .patch_text(&base, &config, &project_dir, &instance_dir, write_files)
        .with_context(|| format!("provisioning instance at {}", instance_dir.display()))?;

    if args.dry_run {
        print!("{}", patched);
        return Ok(());
    }

    let target = server_xml_path(&instance_dir);
    write_atomic(&target, patched.as_bytes()).with_context(|| format!("writing {}", target.display()))?;
    log_info!("[Provision] Wrote {}", target.display().to_string().green());
    if config.https.enabled {
        log_info!(
            "[Provision] HTTPS on port {}",
            config.effective_https_port().to_string().cyan()
        );
    }
    Ok(())
}
