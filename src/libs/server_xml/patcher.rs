// Turns a vendor server.xml plus a `ServerConfig` into the server.xml an
// instance runs with.
//
// `patch` never mutates its input: it clones the base document and runs the
// transforms over the copy. Running it on its own output gives the same
// document again. The only errors are an unresolvable webroot and a failed
// certificate tool; missing elements are skipped by the transforms.

use super::transforms::{
    DEFAULT_ENGINE_NAME, ensure_rewrite_valve, map_root_context, primary_host_names, set_http_connector_port,
    set_http_redirect_port, set_shutdown_port, wire_ajp_connector, wire_https_connector,
};
use super::tree::Document;
use crate::libs::errors::ProvisionError;
use crate::libs::keystore::{CertificateTool, KeystoreProvisioner};
use crate::libs::paths::rewrite_config_path;
use crate::libs::utilities::file_operations::write_atomic;
use crate::libs::utilities::path_helpers::resolve_webroot;
use crate::schemas::server_config::ServerConfig;
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Applies a `ServerConfig` to server.xml documents.
pub struct ServerXmlPatcher<T> {
    keystores: KeystoreProvisioner<T>,
}

impl<T: CertificateTool> ServerXmlPatcher<T> {
    pub fn new(tool: T) -> Self {
        Self {
            keystores: KeystoreProvisioner::new(tool),
        }
    }

    /// Produces the patched document.
    ///
    /// # Arguments
    /// * `base`: The vendor document. Left untouched.
    /// * `config`: Desired instance state.
    /// * `project_dir`: Directory the webroot is relative to.
    /// * `instance_dir`: Where certs and rewrite rules go.
    /// * `write_files`: `false` for a dry run: no keystore, no password file,
    ///   no rewrite rules, but the returned document is complete and refers to
    ///   the planned keystore path.
    ///
    /// # Returns
    /// * `Err(ProvisionError::WebrootResolution)` before anything is computed
    ///   if the webroot cannot be resolved.
    /// * `Err` from the certificate tool when HTTPS needs a new keystore and
    ///   generating it fails.
    pub fn patch(
        &self,
        base: &Document,
        config: &ServerConfig,
        project_dir: &Path,
        instance_dir: &Path,
        write_files: bool,
    ) -> Result<Document, ProvisionError> {
        let webroot =
            resolve_webroot(project_dir, &config.webroot).map_err(|reason| ProvisionError::WebrootResolution {
                webroot: config.webroot.clone(),
                project_dir: project_dir.to_path_buf(),
                reason,
            })?;

        if config.shutdown_port_collides() {
            log_warn!(
                "[server.xml] shutdownPort {} equals port; using {} instead",
                config.port,
                config.effective_shutdown_port()
            );
        }

        let mut doc = base.clone();
        set_http_connector_port(&mut doc, config.port);
        set_shutdown_port(&mut doc, config.effective_shutdown_port());
        map_root_context(&mut doc, &webroot);

        if config.https.enabled {
            let https_port = config.effective_https_port();
            let keystore = self.keystores.ensure_keystore(instance_dir, config, write_files)?;
            wire_https_connector(&mut doc, https_port, &keystore);
            set_http_redirect_port(&mut doc, https_port);

            if config.redirect_requested() {
                ensure_rewrite_valve(&mut doc);
                if write_files {
                    let (engine, host) = primary_host_names(&doc)
                        .unwrap_or_else(|| (DEFAULT_ENGINE_NAME.to_string(), config.host.clone()));
                    write_rewrite_rules(instance_dir, &engine, &host, config)?;
                }
            }
        } else {
            log_debug!("[server.xml] HTTPS disabled; no HTTPS connector added");
        }

        if config.ajp.enabled {
            wire_ajp_connector(&mut doc, config.effective_ajp_port());
        }

        Ok(doc)
    }

    /// Text in, text out: parses `base`, patches it and serializes the result.
    pub fn patch_text(
        &self,
        base: &str,
        config: &ServerConfig,
        project_dir: &Path,
        instance_dir: &Path,
        write_files: bool,
    ) -> Result<String, ProvisionError> {
        let doc = Document::parse(base)?;
        Ok(self
            .patch(&doc, config, project_dir, instance_dir, write_files)?
            .to_xml_string())
    }
}

/// Rewrite rules sending every plain-HTTP request to the HTTPS connector.
///
/// This is not a bare unconditional redirect: the valve sits on the host and
/// therefore also sees HTTPS requests, so the `RewriteCond %{HTTPS} off` line
/// keeps those from redirecting to themselves.
pub fn rewrite_rules(host: &str, https_port: u16) -> String {
    format!(
        "# Managed by serverbox: redirect HTTP to HTTPS\n\
         RewriteCond %{{HTTPS}} off\n\
         RewriteRule ^/?(.*)$ https://{}:{}/$1 [R=301,L]\n",
        host, https_port
    )
}

/// Writes `conf/<engine>/<host>/rewrite.config` under the instance directory.
pub fn write_rewrite_rules(
    instance_dir: &Path,
    engine_name: &str,
    host_name: &str,
    config: &ServerConfig,
) -> Result<PathBuf, ProvisionError> {
    let path = rewrite_config_path(instance_dir, engine_name, host_name);
    let rules = rewrite_rules(&config.host, config.effective_https_port());
    write_atomic(&path, rules.as_bytes()).map_err(|e| ProvisionError::io(&path, e))?;
    log_info!("[server.xml] Wrote HTTPS redirect rules to {}", path.display().to_string().green());
    Ok(path)
}
