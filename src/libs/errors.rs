// Error types for the provisioning library.
//
// Only two conditions are fatal while patching an instance: the webroot cannot
// be resolved, or the certificate tool fails. Everything else degrades and is
// logged. `ConfigError` and `CatalogError` cover config files and the version
// registry, and `XmlError` covers a base document that is not well-formed.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop an instance from being provisioned.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("cannot resolve webroot '{webroot}' against project directory {}: {reason}", .project_dir.display())]
    WebrootResolution {
        webroot: String,
        project_dir: PathBuf,
        reason: String,
    },

    #[error("certificate tool '{program}' could not be started: {source}")]
    CertificateToolSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("certificate tool '{program}' exited with {status}: {stderr}")]
    CertificateToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Xml(#[from] XmlError),
}

impl ProvisionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ProvisionError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A base configuration document that could not be read as XML.
#[derive(Debug, Error)]
#[error("malformed XML at byte {position}: {message}")]
pub struct XmlError {
    pub position: u64,
    pub message: String,
}

/// Errors while reading or writing a `ServerConfig` file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("failed to serialize config for {}: {message}", .path.display())]
    Serialize { path: PathBuf, message: String },

    #[error("failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unsupported config file format: {} (expected .json, .yaml, .yml or .toml)", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// Failures inside the version catalog. These never reach callers of
/// `available_versions`; they decide which fallback is used.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("version registry request failed: {0}")]
    Fetch(String),

    #[error("version registry returned unusable data: {0}")]
    Parse(String),

    #[error("version cache unavailable: {0}")]
    Cache(String),
}
