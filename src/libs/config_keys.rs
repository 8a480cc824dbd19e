// Dotted key-path access into a `ServerConfig` (`port`, `jvm.maxMemory`,
// `monitoring.jmx.port`). Used by `config get/set` on the command line and by
// anything that wants to validate user-supplied keys.
//
// Values cross this boundary as strings. Typed fields are parsed leniently:
// bad input is logged and the field is left alone. Unknown keys are ignored
// here; callers warn about them using `is_known_key`.

use crate::schemas::server_config::ServerConfig;
use crate::{log_debug, log_warn};
use colored::Colorize;

/// Every documented key, in the order `config keys` prints them.
const KEYS: &[(&str, &str)] = &[
    ("version", "Runtime version to run, e.g. 6.2.2.91"),
    ("port", "Primary HTTP port"),
    ("shutdownPort", "Tomcat shutdown port (default: port + 1000)"),
    ("name", "Instance name, unique among instances"),
    ("host", "Virtual host name (default: localhost)"),
    ("webroot", "Document root, relative to the project directory"),
    ("enableLucee", "Serve CFML through Lucee"),
    ("enableREST", "Enable the Lucee REST servlet"),
    ("openBrowser", "Open a browser once the server is up"),
    ("openBrowserURL", "URL to open instead of the server root"),
    ("configurationFile", "Path to an extra Lucee configuration file"),
    ("envFile", "Path to an environment file loaded at startup"),
    ("jvm.maxMemory", "Maximum heap size (-Xmx)"),
    ("jvm.minMemory", "Initial heap size (-Xms)"),
    ("jvm.additionalArgs", "Extra JVM arguments, whitespace separated"),
    ("monitoring.enabled", "Expose JMX monitoring"),
    ("monitoring.jmx.port", "JMX port"),
    ("admin.enabled", "Enable the Lucee administrator"),
    ("admin.password", "Administrator password"),
    ("urlRewrite.enabled", "Route requests through the router file"),
    ("urlRewrite.routerFile", "Router file for URL rewriting (default: index.cfm)"),
    ("https.enabled", "Add an HTTPS connector with a self-signed certificate"),
    ("https.port", "HTTPS port (default: 8443)"),
    ("https.redirect", "Redirect HTTP requests to HTTPS"),
    ("ajp.enabled", "Add an AJP connector"),
    ("ajp.port", "AJP port (default: 8009)"),
];

/// All known keys in declaration order.
pub fn available_keys() -> Vec<&'static str> {
    KEYS.iter().map(|(key, _)| *key).collect()
}

pub fn is_known_key(key: &str) -> bool {
    KEYS.iter().any(|(k, _)| *k == key)
}

/// One-line documentation for a key, if it is known.
pub fn describe_key(key: &str) -> Option<&'static str> {
    KEYS.iter().find(|(k, _)| *k == key).map(|(_, d)| *d)
}

/// Reads a key as a string.
///
/// Returns `None` for unknown keys and for optional fields that are unset.
pub fn get(config: &ServerConfig, key: &str) -> Option<String> {
    let value = match key {
        "version" => config.version.clone(),
        "port" => config.port.to_string(),
        "shutdownPort" => config.shutdown_port?.to_string(),
        "name" => config.name.clone(),
        "host" => config.host.clone(),
        "webroot" => config.webroot.clone(),
        "enableLucee" => config.enable_lucee.to_string(),
        "enableREST" => config.enable_rest.to_string(),
        "openBrowser" => config.open_browser.to_string(),
        "openBrowserURL" => config.open_browser_url.clone()?,
        "configurationFile" => config.configuration_file.clone()?,
        "envFile" => config.env_file.clone()?,
        "jvm.maxMemory" => config.jvm.max_memory.clone(),
        "jvm.minMemory" => config.jvm.min_memory.clone(),
        "jvm.additionalArgs" => config.jvm.additional_args.join(" "),
        "monitoring.enabled" => config.monitoring.enabled.to_string(),
        "monitoring.jmx.port" => config.monitoring.jmx.port.to_string(),
        "admin.enabled" => config.admin.enabled.to_string(),
        "admin.password" => config.admin.password.clone()?,
        "urlRewrite.enabled" => config.url_rewrite.enabled.to_string(),
        "urlRewrite.routerFile" => config.url_rewrite.router_file.clone(),
        "https.enabled" => config.https.enabled.to_string(),
        "https.port" => config.https.port?.to_string(),
        "https.redirect" => config.https.redirect.to_string(),
        "ajp.enabled" => config.ajp.enabled.to_string(),
        "ajp.port" => config.ajp.port?.to_string(),
        _ => return None,
    };
    Some(value)
}

/// Writes a key from a string.
///
/// Unknown keys are a no-op. Values that do not parse for the field's type
/// are logged as warnings and leave the field unchanged. For optional fields
/// an empty value clears the field.
pub fn set(config: &mut ServerConfig, key: &str, value: &str) {
    match key {
        "version" => config.version = value.to_string(),
        "port" => set_port(&mut config.port, key, value),
        "shutdownPort" => set_optional_port(&mut config.shutdown_port, key, value),
        "name" => config.name = value.to_string(),
        "host" => config.host = value.to_string(),
        "webroot" => config.webroot = value.to_string(),
        "enableLucee" => set_bool(&mut config.enable_lucee, key, value),
        "enableREST" => set_bool(&mut config.enable_rest, key, value),
        "openBrowser" => set_bool(&mut config.open_browser, key, value),
        "openBrowserURL" => set_optional_string(&mut config.open_browser_url, value),
        "configurationFile" => set_optional_string(&mut config.configuration_file, value),
        "envFile" => set_optional_string(&mut config.env_file, value),
        "jvm.maxMemory" => config.jvm.max_memory = value.to_string(),
        "jvm.minMemory" => config.jvm.min_memory = value.to_string(),
        "jvm.additionalArgs" => {
            config.jvm.additional_args = value.split_whitespace().map(str::to_string).collect();
        }
        "monitoring.enabled" => set_bool(&mut config.monitoring.enabled, key, value),
        "monitoring.jmx.port" => set_port(&mut config.monitoring.jmx.port, key, value),
        "admin.enabled" => set_bool(&mut config.admin.enabled, key, value),
        "admin.password" => set_optional_string(&mut config.admin.password, value),
        "urlRewrite.enabled" => set_bool(&mut config.url_rewrite.enabled, key, value),
        "urlRewrite.routerFile" => config.url_rewrite.router_file = value.to_string(),
        "https.enabled" => set_bool(&mut config.https.enabled, key, value),
        "https.port" => set_optional_port(&mut config.https.port, key, value),
        "https.redirect" => set_bool(&mut config.https.redirect, key, value),
        "ajp.enabled" => set_bool(&mut config.ajp.enabled, key, value),
        "ajp.port" => set_optional_port(&mut config.ajp.port, key, value),
        _ => log_debug!("[Config] Ignoring unknown key '{}'", key),
    }
}

fn parse_port(key: &str, value: &str) -> Option<u16> {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => Some(port),
        _ => {
            log_warn!(
                "[Config] '{}' is not a valid port for {}; keeping the current value",
                value.yellow(),
                key.bold()
            );
            None
        }
    }
}

fn set_port(field: &mut u16, key: &str, value: &str) {
    if let Some(port) = parse_port(key, value) {
        *field = port;
    }
}

fn set_optional_port(field: &mut Option<u16>, key: &str, value: &str) {
    if value.trim().is_empty() {
        *field = None;
    } else if let Some(port) = parse_port(key, value) {
        *field = Some(port);
    }
}

fn set_bool(field: &mut bool, key: &str, value: &str) {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => *field = true,
        "false" | "no" | "off" | "0" => *field = false,
        _ => log_warn!(
            "[Config] '{}' is not a boolean for {}; keeping the current value",
            value.yellow(),
            key.bold()
        ),
    }
}

fn set_optional_string(field: &mut Option<String>, value: &str) {
    *field = if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    };
}
