// Defines the declarative description of a single server instance (`lucee.json`).
// Everything here is plain data plus the defaulting rules for the derived
// ("effective") ports. No I/O happens in this module.

use serde::{Deserialize, Serialize};

/// Default primary HTTP port.
pub const DEFAULT_HTTP_PORT: u16 = 8080;
/// HTTPS port used when `https.enabled` is set without an explicit `https.port`.
pub const DEFAULT_HTTPS_PORT: u16 = 8443;
/// AJP port used when `ajp.enabled` is set without an explicit `ajp.port`.
pub const DEFAULT_AJP_PORT: u16 = 8009;
/// Distance between the HTTP port and the derived shutdown port.
pub const SHUTDOWN_PORT_OFFSET: u16 = 1000;

/// The root of an instance's desired state.
///
/// Field names are serialized in camelCase to match the `lucee.json` files
/// users already have. Every field has a default, so a file that only says
/// `{"port": 8888}` is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Runtime version identifier, e.g. `6.2.2.91`.
    pub version: String,
    /// Primary HTTP port.
    pub port: u16,
    /// Tomcat shutdown port. When absent the effective value is `port + 1000`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown_port: Option<u16>,
    /// Instance identifier, unique among instances. Empty means "derive from
    /// the project directory name".
    pub name: String,
    /// Virtual-host name.
    pub host: String,
    /// Document root, relative to the project directory unless absolute.
    pub webroot: String,
    pub enable_lucee: bool,
    #[serde(rename = "enableREST")]
    pub enable_rest: bool,
    pub open_browser: bool,
    #[serde(rename = "openBrowserURL", skip_serializing_if = "Option::is_none")]
    pub open_browser_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,
    pub jvm: JvmConfig,
    pub monitoring: MonitoringConfig,
    pub admin: AdminConfig,
    pub url_rewrite: UrlRewriteConfig,
    pub https: HttpsConfig,
    pub ajp: AjpConfig,
}

/// JVM sizing and extra flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JvmConfig {
    pub max_memory: String,
    pub min_memory: String,
    pub additional_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub jmx: JmxConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JmxConfig {
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UrlRewriteConfig {
    pub enabled: bool,
    pub router_file: String,
}

/// HTTPS is enabled only through `enabled`; a port on its own does nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpsConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Redirect plain HTTP traffic to the HTTPS connector.
    pub redirect: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AjpConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: "6.2.2.91".to_string(),
            port: DEFAULT_HTTP_PORT,
            shutdown_port: None,
            name: String::new(),
            host: "localhost".to_string(),
            webroot: "./".to_string(),
            enable_lucee: true,
            enable_rest: false,
            open_browser: true,
            open_browser_url: None,
            configuration_file: None,
            env_file: None,
            jvm: JvmConfig::default(),
            monitoring: MonitoringConfig::default(),
            admin: AdminConfig::default(),
            url_rewrite: UrlRewriteConfig::default(),
            https: HttpsConfig::default(),
            ajp: AjpConfig::default(),
        }
    }
}

impl Default for JvmConfig {
    fn default() -> Self {
        Self {
            max_memory: "512m".to_string(),
            min_memory: "128m".to_string(),
            additional_args: Vec::new(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            jmx: JmxConfig::default(),
        }
    }
}

impl Default for JmxConfig {
    fn default() -> Self {
        Self { port: 8999 }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            password: None,
        }
    }
}

impl Default for UrlRewriteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            router_file: "index.cfm".to_string(),
        }
    }
}

impl ServerConfig {
    /// The shutdown port Tomcat will listen on.
    ///
    /// Explicit `shutdownPort` wins unless it equals `port`; otherwise the
    /// value is `port + 1000` (or `port - 1000` near the top of the range).
    /// The result never equals `port`.
    pub fn effective_shutdown_port(&self) -> u16 {
        if let Some(explicit) = self.shutdown_port {
            if explicit != self.port {
                return explicit;
            }
        }
        self.port
            .checked_add(SHUTDOWN_PORT_OFFSET)
            .unwrap_or_else(|| self.port - SHUTDOWN_PORT_OFFSET)
    }

    /// True when `shutdownPort` is set and collides with `port`, in which case
    /// `effective_shutdown_port` silently derives a different one.
    pub fn shutdown_port_collides(&self) -> bool {
        self.shutdown_port == Some(self.port)
    }

    pub fn effective_https_port(&self) -> u16 {
        self.https.port.unwrap_or(DEFAULT_HTTPS_PORT)
    }

    pub fn effective_ajp_port(&self) -> u16 {
        self.ajp.port.unwrap_or(DEFAULT_AJP_PORT)
    }

    /// Redirect wiring only applies when HTTPS itself is on.
    pub fn redirect_requested(&self) -> bool {
        self.https.enabled && self.https.redirect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_port_defaults_to_port_plus_offset() {
        let config = ServerConfig {
            port: 8080,
            ..Default::default()
        };
        assert_eq!(config.effective_shutdown_port(), 9080);
    }

    #[test]
    fn explicit_shutdown_port_wins() {
        let config = ServerConfig {
            shutdown_port: Some(8005),
            ..Default::default()
        };
        assert_eq!(config.effective_shutdown_port(), 8005);
    }

    #[test]
    fn colliding_shutdown_port_is_rederived() {
        let config = ServerConfig {
            port: 9000,
            shutdown_port: Some(9000),
            ..Default::default()
        };
        assert!(config.shutdown_port_collides());
        assert_eq!(config.effective_shutdown_port(), 10000);
    }

    #[test]
    fn shutdown_port_never_overflows() {
        let config = ServerConfig {
            port: 65000,
            ..Default::default()
        };
        assert_eq!(config.effective_shutdown_port(), 64000);
        assert_ne!(config.effective_shutdown_port(), config.port);
    }

    #[test]
    fn low_ports_get_offset_added() {
        for (port, expected) in [(0u16, 1000u16), (80, 1080), (443, 1443), (999, 1999)] {
            let config = ServerConfig {
                port,
                ..Default::default()
            };
            assert_eq!(config.effective_shutdown_port(), expected);
        }
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"port": 8888, "https": {"enabled": true}, "enableREST": true}"#)
                .unwrap();
        assert_eq!(config.port, 8888);
        assert_eq!(config.host, "localhost");
        assert!(config.enable_rest);
        assert!(config.https.enabled);
        assert_eq!(config.effective_https_port(), DEFAULT_HTTPS_PORT);
        assert_eq!(config.jvm.max_memory, "512m");
    }

    #[test]
    fn redirect_needs_https() {
        let mut config = ServerConfig::default();
        config.https.redirect = true;
        assert!(!config.redirect_requested());
        config.https.enabled = true;
        assert!(config.redirect_requested());
    }
}
