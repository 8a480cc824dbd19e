// End-to-end checks of the provisioning pipeline through the public API,
// with a fake certificate tool standing in for keytool.

use serverbox::libs::errors::ProvisionError;
use serverbox::libs::keystore::{CertificateRequest, CertificateTool, KEYSTORE_FILE, PASSWORD_FILE};
use serverbox::libs::paths::rewrite_config_path;
use serverbox::libs::server_xml::transforms::{REWRITE_VALVE_CLASS, is_https_connector};
use serverbox::libs::server_xml::{Document, Element, ServerXmlPatcher};
use serverbox::schemas::server_config::{DEFAULT_HTTPS_PORT, ServerConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[derive(Default)]
struct FakeKeytool;

impl CertificateTool for FakeKeytool {
    fn generate(&self, request: &CertificateRequest<'_>) -> Result<(), ProvisionError> {
        fs::write(request.keystore_path, b"pkcs12").map_err(|e| ProvisionError::Io {
            path: request.keystore_path.to_path_buf(),
            source: e,
        })
    }
}

const MINIMAL_BASE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Server port="8005" shutdown="SHUTDOWN">
  <Service name="Catalina">
    <Connector port="8080" connectionTimeout="20000"/>
    <Engine name="Catalina" defaultHost="localhost">
      <Host name="localhost" appBase="webapps" unpackWARs="true"/>
    </Engine>
  </Service>
</Server>
"#;

fn service(doc: &Document) -> &Element {
    doc.root.find_child("Service").expect("service")
}

fn connectors(doc: &Document) -> Vec<&Element> {
    service(doc)
        .child_elements()
        .filter(|e| e.name == "Connector")
        .collect()
}

fn default_host(doc: &Document) -> &Element {
    service(doc)
        .find_child("Engine")
        .and_then(|e| e.find_child("Host"))
        .expect("host")
}

fn redirect_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.port = 8080;
    config.shutdown_port = None;
    config.host = "localhost".to_string();
    config.https.enabled = true;
    config.https.port = None;
    config.https.redirect = true;
    config
}

fn list_tree(root: &Path) -> Vec<String> {
    let mut entries = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            entries.push(path.strip_prefix(root).unwrap().display().to_string());
            if path.is_dir() {
                pending.push(path);
            }
        }
    }
    entries.sort();
    entries
}

#[test]
fn https_redirect_scenario() {
    let project = TempDir::new().unwrap();
    let instance = TempDir::new().unwrap();
    let patcher = ServerXmlPatcher::new(FakeKeytool);
    let base = Document::parse(MINIMAL_BASE).unwrap();

    let doc = patcher
        .patch(&base, &redirect_config(), project.path(), instance.path(), true)
        .unwrap();

    assert_eq!(doc.root.attr("port"), Some("9080"));

    let all = connectors(&doc);
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].attr("port"), Some("8080"));
    assert_eq!(all[0].attr("connectionTimeout"), Some("20000"));
    assert!(is_https_connector(all[1]));
    let https_port = DEFAULT_HTTPS_PORT.to_string();
    assert_eq!(all[1].attr("port"), Some(https_port.as_str()));

    let keystore_path = instance.path().join("certs").join(KEYSTORE_FILE);
    let password = fs::read_to_string(instance.path().join("certs").join(PASSWORD_FILE)).unwrap();
    let certificate = all[1]
        .find_child("SSLHostConfig")
        .and_then(|s| s.find_child("Certificate"))
        .unwrap();
    assert_eq!(
        certificate.attr("certificateKeystoreFile"),
        Some(keystore_path.to_string_lossy().as_ref())
    );
    assert_eq!(certificate.attr("certificateKeystorePassword"), Some(password.as_str()));
    assert_eq!(certificate.attr("certificateKeystoreType"), Some("PKCS12"));
    assert!(keystore_path.is_file());

    let host = default_host(&doc);
    assert!(host
        .child_elements()
        .any(|e| e.name == "Valve" && e.attr("className") == Some(REWRITE_VALVE_CLASS)));
    let context = host.find_child("Context").unwrap();
    assert_eq!(context.attr("path"), Some(""));
    let doc_base = context.attr("docBase").unwrap();
    assert!(Path::new(doc_base).is_absolute());
    assert_eq!(Path::new(doc_base), project.path());

    let rules = fs::read_to_string(rewrite_config_path(instance.path(), "Catalina", "localhost")).unwrap();
    assert!(rules.contains(&format!("https://localhost:{}/$1", DEFAULT_HTTPS_PORT)));
}

#[test]
fn patching_twice_converges() {
    let project = TempDir::new().unwrap();
    let instance = TempDir::new().unwrap();
    let patcher = ServerXmlPatcher::new(FakeKeytool);
    let mut config = redirect_config();
    config.ajp.enabled = true;
    let base = Document::parse(MINIMAL_BASE).unwrap();

    let once = patcher
        .patch(&base, &config, project.path(), instance.path(), true)
        .unwrap();
    let twice = patcher
        .patch(&once, &config, project.path(), instance.path(), true)
        .unwrap();

    assert_eq!(once, twice);
    assert_eq!(once.to_xml_string(), twice.to_xml_string());
    assert_eq!(connectors(&twice).len(), 3);
    assert_eq!(default_host(&twice).child_elements().count(), 2);
}

#[test]
fn shutdown_port_tracks_http_port() {
    let project = TempDir::new().unwrap();
    let patcher = ServerXmlPatcher::new(FakeKeytool);
    let base = Document::parse(MINIMAL_BASE).unwrap();

    for port in [80u16, 8080, 8888, 20000, 64535] {
        let config = ServerConfig {
            port,
            ..Default::default()
        };
        let doc = patcher
            .patch(&base, &config, project.path(), project.path(), false)
            .unwrap();
        let expected = (port + 1000).to_string();
        assert_eq!(doc.root.attr("port"), Some(expected.as_str()));
        assert_ne!(doc.root.attr("port"), Some(port.to_string().as_str()));
    }
}

#[test]
fn https_disabled_adds_nothing_and_removes_nothing() {
    let project = TempDir::new().unwrap();
    let instance = TempDir::new().unwrap();
    let patcher = ServerXmlPatcher::new(FakeKeytool);

    let plain = Document::parse(MINIMAL_BASE).unwrap();
    let doc = patcher
        .patch(&plain, &ServerConfig::default(), project.path(), instance.path(), true)
        .unwrap();
    assert!(connectors(&doc).iter().all(|c| !is_https_connector(c)));

    let with_tls = MINIMAL_BASE.replace(
        "<Engine ",
        r#"<Connector port="9443" scheme="https" SSLEnabled="true"/>
    <Engine "#,
    );
    let base = Document::parse(&with_tls).unwrap();
    let doc = patcher
        .patch(&base, &ServerConfig::default(), project.path(), instance.path(), true)
        .unwrap();
    let all = connectors(&doc);
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].attr("port"), Some("9443"));
    assert!(!instance.path().join("certs").exists());
}

#[test]
fn dry_run_writes_nothing() {
    let project = TempDir::new().unwrap();
    let instance = TempDir::new().unwrap();
    let before = list_tree(instance.path());
    let patcher = ServerXmlPatcher::new(FakeKeytool);

    let mut config = redirect_config();
    config.ajp.enabled = true;
    let xml = patcher
        .patch_text(MINIMAL_BASE, &config, project.path(), instance.path(), false)
        .unwrap();

    assert_eq!(list_tree(instance.path()), before);
    let reparsed = Document::parse(&xml).unwrap();
    let https = connectors(&reparsed).into_iter().find(|c| is_https_connector(c)).unwrap();
    let planned = https
        .find_child("SSLHostConfig")
        .and_then(|s| s.find_child("Certificate"))
        .and_then(|c| c.attr("certificateKeystoreFile"))
        .unwrap();
    assert!(!Path::new(planned).exists());
}

#[test]
fn unparsable_base_is_rejected() {
    let dir = TempDir::new().unwrap();
    let patcher = ServerXmlPatcher::new(FakeKeytool);
    let err = patcher
        .patch_text("<Server><Service>", &ServerConfig::default(), dir.path(), dir.path(), false)
        .unwrap_err();
    assert!(matches!(err, ProvisionError::Xml(_)));
}
