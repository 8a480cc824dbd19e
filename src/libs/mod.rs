// The provisioning library. Everything the CLI does goes through here.

// Error types shared by the modules below.
pub mod errors;
// Reading and writing `lucee.json` (and its YAML/TOML variants).
pub mod config_loading;
// Dotted key-path access to a `ServerConfig`.
pub mod config_keys;
// Self-signed keystore and password provisioning.
pub mod keystore;
// Tool home and instance directory layout.
pub mod paths;
// server.xml parsing, transforms and the patcher.
pub mod server_xml;
pub mod utilities;
// Installable runtime versions with an on-disk cache.
pub mod version_catalog;
