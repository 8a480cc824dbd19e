// Individual server.xml mutations. Each one is idempotent on its own, reports
// whether it found something to change, and skips quietly (with a warning) when
// the vendor document lacks the element it needs.
//
// Expected shape, as shipped with Tomcat:
//
//   Server@port
//     Service
//       Connector*        (HTTP, HTTPS, AJP)
//       Engine@name@defaultHost
//         Host@name
//           Valve* / Context*

use super::tree::{Document, Element};
use crate::libs::keystore::{KEY_ALIAS, KEYSTORE_TYPE, KeystoreInfo};
use crate::log_warn;
use std::path::Path;

pub const HTTPS_PROTOCOL: &str = "org.apache.coyote.http11.Http11NioProtocol";
pub const AJP_PROTOCOL: &str = "AJP/1.3";
pub const TLS_PROTOCOLS: &str = "TLSv1.2,TLSv1.3";
pub const REWRITE_VALVE_CLASS: &str = "org.apache.catalina.valves.rewrite.RewriteValve";

/// Tomcat's default engine name; also the directory under `conf/` holding per-host files.
pub const DEFAULT_ENGINE_NAME: &str = "Catalina";

/// `scheme="https"` or `SSLEnabled="true"`.
pub fn is_https_connector(element: &Element) -> bool {
    element.name == "Connector"
        && (element.attr_eq_ignore_case("scheme", "https") || element.attr_eq_ignore_case("SSLEnabled", "true"))
}

/// A plain HTTP connector: protocol missing, empty, `HTTP/1.1` or one of the
/// explicit http11 implementation classes, and not TLS-enabled.
pub fn is_plain_http_connector(element: &Element) -> bool {
    if element.name != "Connector" || is_https_connector(element) {
        return false;
    }
    match element.attr("protocol").map(str::trim) {
        None | Some("") | Some("HTTP/1.1") => true,
        Some(protocol) => protocol.starts_with("org.apache.coyote.http11."),
    }
}

pub fn is_ajp_connector(element: &Element) -> bool {
    element.name == "Connector" && element.attr("protocol").is_some_and(|p| p.trim().starts_with("AJP/"))
}

fn server_mut(doc: &mut Document) -> Option<&mut Element> {
    if doc.root.name == "Server" {
        Some(&mut doc.root)
    } else {
        None
    }
}

fn primary_service_mut(doc: &mut Document) -> Option<&mut Element> {
    server_mut(doc)?.find_child_mut("Service")
}

/// The first plain HTTP connector across all services, in document order.
///
/// When several connectors qualify only the first is returned; later ones are
/// left alone.
fn primary_http_connector_mut(doc: &mut Document) -> Option<&mut Element> {
    server_mut(doc)?
        .child_elements_mut()
        .filter(|e| e.name == "Service")
        .flat_map(|service| service.child_elements_mut())
        .find(|e| is_plain_http_connector(e))
}

fn primary_host_index(engine: &Element) -> Option<usize> {
    let default_host = engine.attr("defaultHost").map(str::to_string);
    default_host
        .and_then(|name| engine.child_index(|e| e.name == "Host" && e.attr("name") == Some(name.as_str())))
        .or_else(|| engine.child_index(|e| e.name == "Host"))
}

/// The host matching `Engine@defaultHost`, else the first `Host`.
fn primary_host_mut(doc: &mut Document) -> Option<&mut Element> {
    let engine = primary_service_mut(doc)?.find_child_mut("Engine")?;
    let index = primary_host_index(engine)?;
    engine.child_at_mut(index)
}

/// `(Engine@name, Host@name)` of the primary host, used to place per-host files.
pub fn primary_host_names(doc: &Document) -> Option<(String, String)> {
    if doc.root.name != "Server" {
        return None;
    }
    let engine = doc.root.find_child("Service")?.find_child("Engine")?;
    let host = engine.children.get(primary_host_index(engine)?)?.as_element()?;
    Some((
        engine.attr("name").unwrap_or(DEFAULT_ENGINE_NAME).to_string(),
        host.attr("name").unwrap_or("localhost").to_string(),
    ))
}

/// Sets `port` on the primary HTTP connector.
pub fn set_http_connector_port(doc: &mut Document, port: u16) -> bool {
    match primary_http_connector_mut(doc) {
        Some(connector) => {
            connector.set_attr("port", port.to_string());
            true
        }
        None => {
            log_warn!("[server.xml] No HTTP connector found; leaving ports as shipped");
            false
        }
    }
}

/// Points the primary HTTP connector's `redirectPort` at the HTTPS port, so
/// Tomcat's own confidential-transport redirects land on the right connector.
pub fn set_http_redirect_port(doc: &mut Document, https_port: u16) -> bool {
    match primary_http_connector_mut(doc) {
        Some(connector) => {
            connector.set_attr("redirectPort", https_port.to_string());
            true
        }
        None => false,
    }
}

/// Sets `Server@port`, the shutdown listener.
pub fn set_shutdown_port(doc: &mut Document, port: u16) -> bool {
    match server_mut(doc) {
        Some(server) => {
            server.set_attr("port", port.to_string());
            true
        }
        None => {
            log_warn!("[server.xml] Root element is <{}>, not <Server>; shutdown port unchanged", doc.root.name);
            false
        }
    }
}

/// Maps the root web application (`path=""` or `path="/"`) of the primary
/// host to `doc_base`, creating the `Context` when there is none.
pub fn map_root_context(doc: &mut Document, doc_base: &Path) -> bool {
    let Some(host) = primary_host_mut(doc) else {
        log_warn!("[server.xml] No <Host> found; root context not mapped");
        return false;
    };
    let doc_base = doc_base.to_string_lossy().into_owned();

    let existing = host.child_index(|e| e.name == "Context" && matches!(e.attr("path"), Some("") | Some("/")));
    match existing {
        Some(index) => {
            if let Some(context) = host.child_at_mut(index) {
                context.set_attr("docBase", doc_base);
            }
        }
        None => host.append_child(Element::new("Context").with_attr("path", "").with_attr("docBase", doc_base)),
    }
    true
}

/// Inserts `connector` among the service's connectors: right after the last
/// one, or before `Engine` when there are none (connectors must precede it).
/// Returns the child index it was placed at.
fn insert_connector(service: &mut Element, connector: Element) -> usize {
    let index = match service.last_child_index(|e| e.name == "Connector") {
        Some(last) => last + 1,
        None => service
            .child_index(|e| e.name == "Engine")
            .unwrap_or(service.children.len()),
    };
    service.insert_child(index, connector);
    index
}

/// Finds or creates the HTTPS connector and points it at the keystore.
///
/// Any existing `SSLHostConfig` is replaced, so a changed password or path
/// never leaves a stale certificate entry behind.
pub fn wire_https_connector(doc: &mut Document, port: u16, keystore: &KeystoreInfo) -> bool {
    let Some(service) = primary_service_mut(doc) else {
        log_warn!("[server.xml] No <Service> found; HTTPS connector not added");
        return false;
    };

    let index = match service.child_index(is_https_connector) {
        Some(index) => index,
        None => insert_connector(service, Element::new("Connector")),
    };
    let Some(connector) = service.child_at_mut(index) else {
        return false;
    };

    connector.set_attr("protocol", HTTPS_PROTOCOL);
    connector.set_attr("port", port.to_string());
    connector.set_attr("scheme", "https");
    connector.set_attr("secure", "true");
    connector.set_attr("SSLEnabled", "true");

    connector.remove_children_named("SSLHostConfig");
    let certificate = Element::new("Certificate")
        .with_attr("certificateKeystoreFile", keystore.keystore_path.to_string_lossy())
        .with_attr("certificateKeystorePassword", keystore.password.as_str())
        .with_attr("certificateKeystoreType", KEYSTORE_TYPE)
        .with_attr("certificateKeyAlias", KEY_ALIAS);
    connector.append_child(
        Element::new("SSLHostConfig")
            .with_attr("protocols", TLS_PROTOCOLS)
            .with_child(certificate),
    );
    true
}

/// Adds the rewrite valve to the primary host unless one is already there.
pub fn ensure_rewrite_valve(doc: &mut Document) -> bool {
    let Some(host) = primary_host_mut(doc) else {
        log_warn!("[server.xml] No <Host> found; rewrite valve not added");
        return false;
    };
    let present = host
        .child_elements()
        .any(|e| e.name == "Valve" && e.attr("className") == Some(REWRITE_VALVE_CLASS));
    if !present {
        host.append_child(Element::new("Valve").with_attr("className", REWRITE_VALVE_CLASS));
    }
    true
}

/// Finds or creates an AJP connector bound to loopback on `port`.
pub fn wire_ajp_connector(doc: &mut Document, port: u16) -> bool {
    let Some(service) = primary_service_mut(doc) else {
        log_warn!("[server.xml] No <Service> found; AJP connector not added");
        return false;
    };
    let index = match service.child_index(is_ajp_connector) {
        Some(index) => index,
        None => insert_connector(service, Element::new("Connector")),
    };
    let Some(connector) = service.child_at_mut(index) else {
        return false;
    };
    connector.set_attr("protocol", AJP_PROTOCOL);
    connector.set_attr("port", port.to_string());
    connector.set_attr("address", "127.0.0.1");
    connector.set_attr("secretRequired", "false");
    true
}
