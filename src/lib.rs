//! Provisioning engine for Lucee application-server instances.
//!
//! Given a [`ServerConfig`](schemas::server_config::ServerConfig), a vendor
//! `server.xml`, a project directory and an instance directory, the
//! [`ServerXmlPatcher`](libs::server_xml::ServerXmlPatcher) produces the
//! instance's `server.xml` and, when asked to, its keystore, keystore password
//! and HTTPS redirect rules. The crate also carries the key-path config access
//! and the cached runtime version catalog the command line uses.

pub mod libs;
pub mod logger;
pub mod schemas;
