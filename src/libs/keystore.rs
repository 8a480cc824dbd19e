// This module provisions the TLS material an HTTPS connector needs: a PKCS#12
// keystore with a self-signed certificate and the password protecting it.
//
// Both live in `<instance>/certs/`. They are only valid as a pair, so the
// provisioner treats "password without keystore" and "keystore without
// password" as states to repair, not to trust. Certificate generation is
// delegated to a `CertificateTool` (the JDK's `keytool` by default) so the
// XML wiring can be tested without a JDK.

use crate::libs::errors::ProvisionError;
use crate::libs::paths::certs_dir;
use crate::libs::utilities::file_operations::{restrict_to_owner, write_atomic};
use crate::schemas::server_config::ServerConfig;
use crate::{log_debug, log_info, log_warn};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use colored::Colorize;
use rand::RngCore;
use rand::rngs::OsRng;
use std::env;
use std::fs;
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const KEYSTORE_FILE: &str = "keystore.p12";
pub const PASSWORD_FILE: &str = "keystore.pass";
/// Alias of the key entry inside the keystore, referenced from server.xml.
pub const KEY_ALIAS: &str = "lucee";
pub const KEYSTORE_TYPE: &str = "PKCS12";
pub const KEY_SIZE_BITS: u32 = 2048;
pub const VALIDITY_DAYS: u32 = 825;
/// Password reported in dry-run mode. Not key material.
pub const PLANNED_PASSWORD: &str = "<generated-at-provision-time>";

/// Number of random bytes in a generated password (256 bits).
const PASSWORD_BYTES: usize = 32;
/// Environment variable used to hand the password to keytool without putting
/// it on the command line.
const PASSWORD_ENV: &str = "SERVERBOX_KEYSTORE_PASS";

/// Where the keystore is and how to open it. Produced per call, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystoreInfo {
    pub keystore_path: PathBuf,
    pub password: String,
    /// True in dry-run mode: the path is where the keystore would go and the
    /// password is `PLANNED_PASSWORD`.
    pub planned: bool,
}

/// Everything a certificate tool needs to create a self-signed keystore.
#[derive(Debug, Clone)]
pub struct CertificateRequest<'a> {
    pub keystore_path: &'a Path,
    pub password: &'a str,
    pub alias: &'a str,
    pub common_name: &'a str,
    /// `dns:<name>` / `ip:<addr>` entries.
    pub subject_alt_names: Vec<String>,
    pub key_size_bits: u32,
    pub validity_days: u32,
}

/// Creates a PKCS#12 keystore holding one self-signed key pair.
pub trait CertificateTool {
    fn generate(&self, request: &CertificateRequest<'_>) -> Result<(), ProvisionError>;
}

/// Runs the JDK's `keytool`.
#[derive(Debug, Clone)]
pub struct KeytoolGenerator {
    program: PathBuf,
}

impl KeytoolGenerator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Prefers `$JAVA_HOME/bin/keytool`, otherwise relies on `PATH`.
    pub fn locate() -> Self {
        if let Some(java_home) = env::var_os("JAVA_HOME") {
            let candidate = Path::new(&java_home).join("bin").join(keytool_file_name());
            if candidate.is_file() {
                return Self::new(candidate);
            }
        }
        Self::new(keytool_file_name())
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command-line arguments for a request. The password itself is read by
    /// keytool from `PASSWORD_ENV`.
    pub fn arguments(request: &CertificateRequest<'_>) -> Vec<String> {
        vec![
            "-genkeypair".to_string(),
            "-noprompt".to_string(),
            "-alias".to_string(),
            request.alias.to_string(),
            "-keyalg".to_string(),
            "RSA".to_string(),
            "-keysize".to_string(),
            request.key_size_bits.to_string(),
            "-storetype".to_string(),
            KEYSTORE_TYPE.to_string(),
            "-keystore".to_string(),
            request.keystore_path.to_string_lossy().into_owned(),
            "-validity".to_string(),
            request.validity_days.to_string(),
            "-dname".to_string(),
            format!("CN={}", request.common_name),
            "-ext".to_string(),
            format!("SAN={}", request.subject_alt_names.join(",")),
            "-storepass:env".to_string(),
            PASSWORD_ENV.to_string(),
            "-keypass:env".to_string(),
            PASSWORD_ENV.to_string(),
        ]
    }
}

fn keytool_file_name() -> &'static str {
    if cfg!(windows) { "keytool.exe" } else { "keytool" }
}

impl CertificateTool for KeytoolGenerator {
    fn generate(&self, request: &CertificateRequest<'_>) -> Result<(), ProvisionError> {
        let program = self.program.display().to_string();
        log_debug!("[Keystore] Running {} for {}", program, request.keystore_path.display());

        let output = Command::new(&self.program)
            .args(Self::arguments(request))
            .env(PASSWORD_ENV, request.password)
            .output()
            .map_err(|source| ProvisionError::CertificateToolSpawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            return Err(ProvisionError::CertificateToolFailed {
                program,
                status: output.status.to_string(),
                // keytool reports some errors on stdout.
                stderr: if stderr.is_empty() { stdout } else { stderr },
            });
        }
        Ok(())
    }
}

/// SAN entries for a host: always `localhost` and `127.0.0.1`, plus the
/// configured host when it is something else.
pub fn subject_alt_names(host: &str) -> Vec<String> {
    let mut names = vec!["dns:localhost".to_string()];
    let host = host.trim();
    if !host.is_empty() && host != "localhost" && host != "127.0.0.1" {
        if host.parse::<IpAddr>().is_ok() {
            names.push(format!("ip:{}", host));
        } else {
            names.push(format!("dns:{}", host));
        }
    }
    names.push("ip:127.0.0.1".to_string());
    names
}

/// 256 bits from the OS random source, URL-safe base64 without padding.
pub fn generate_password() -> String {
    let mut bytes = [0u8; PASSWORD_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Makes sure an instance has a usable keystore and password.
pub struct KeystoreProvisioner<T> {
    tool: T,
}

impl<T: CertificateTool> KeystoreProvisioner<T> {
    pub fn new(tool: T) -> Self {
        Self { tool }
    }

    /// Ensures `<instance>/certs/keystore.p12` and `keystore.pass` exist.
    ///
    /// # Arguments
    /// * `instance_dir`: The instance directory.
    /// * `config`: Supplies the host for the certificate's CN and SANs.
    /// * `write_files`: `false` for a dry run, which touches nothing on disk and
    ///   returns the planned path with a placeholder password.
    ///
    /// # Returns
    /// * `Ok(KeystoreInfo)` with the real password read from (or written to) disk.
    /// * `Err(ProvisionError)` if the certificate tool fails or the files
    ///   cannot be written. A failed call leaves neither a fresh password nor
    ///   a keystore behind.
    pub fn ensure_keystore(
        &self,
        instance_dir: &Path,
        config: &ServerConfig,
        write_files: bool,
    ) -> Result<KeystoreInfo, ProvisionError> {
        let certs = certs_dir(instance_dir);
        let keystore_path = certs.join(KEYSTORE_FILE);
        let password_path = certs.join(PASSWORD_FILE);

        if !write_files {
            log_debug!("[Keystore] Dry run, planning keystore at {}", keystore_path.display());
            return Ok(KeystoreInfo {
                keystore_path,
                password: PLANNED_PASSWORD.to_string(),
                planned: true,
            });
        }

        fs::create_dir_all(&certs).map_err(|e| ProvisionError::io(&certs, e))?;

        let stored_password = read_password(&password_path)?;
        let keystore_exists = keystore_path.is_file();

        let password = match (stored_password, keystore_exists) {
            (Some(password), true) => {
                log_debug!("[Keystore] Reusing keystore at {}", keystore_path.display());
                password
            }
            (Some(password), false) => {
                log_info!("[Keystore] Keystore missing, generating it with the stored password");
                self.generate(&keystore_path, &password, config)?;
                password
            }
            (None, exists) => {
                if exists {
                    // Without its password the old keystore cannot be opened.
                    log_warn!(
                        "[Keystore] {} has no password file; regenerating both",
                        keystore_path.display().to_string().yellow()
                    );
                    fs::remove_file(&keystore_path).map_err(|e| ProvisionError::io(&keystore_path, e))?;
                }
                let password = generate_password();
                write_atomic(&password_path, password.as_bytes())
                    .map_err(|e| ProvisionError::io(&password_path, e))?;
                restrict_to_owner(&password_path);

                if let Err(e) = self.generate(&keystore_path, &password, config) {
                    // Keep the pair consistent: no password without its keystore.
                    let _ = fs::remove_file(&password_path);
                    return Err(e);
                }
                password
            }
        };

        restrict_to_owner(&password_path);
        restrict_to_owner(&keystore_path);

        Ok(KeystoreInfo {
            keystore_path,
            password,
            planned: false,
        })
    }

    fn generate(&self, keystore_path: &Path, password: &str, config: &ServerConfig) -> Result<(), ProvisionError> {
        let common_name = if config.host.trim().is_empty() {
            "localhost"
        } else {
            config.host.trim()
        };
        let request = CertificateRequest {
            keystore_path,
            password,
            alias: KEY_ALIAS,
            common_name,
            subject_alt_names: subject_alt_names(&config.host),
            key_size_bits: KEY_SIZE_BITS,
            validity_days: VALIDITY_DAYS,
        };
        self.tool.generate(&request)?;

        if !keystore_path.is_file() {
            return Err(ProvisionError::CertificateToolFailed {
                program: "certificate tool".to_string(),
                status: "success".to_string(),
                stderr: format!("no keystore was written to {}", keystore_path.display()),
            });
        }
        log_info!(
            "[Keystore] Generated self-signed certificate for {} at {}",
            common_name.bold(),
            keystore_path.display().to_string().green()
        );
        Ok(())
    }
}

/// Reads the stored password. A missing or blank file means "no password".
fn read_password(path: &Path) -> Result<Option<String>, ProvisionError> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let trimmed = contents.trim();
            Ok(if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            })
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ProvisionError::io(path, e)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Writes a marker file instead of a real keystore and records what it was asked.
    #[derive(Default)]
    pub(crate) struct RecordingTool {
        pub(crate) requests: RefCell<Vec<(PathBuf, String, Vec<String>)>>,
        pub(crate) fail: bool,
    }

    impl CertificateTool for RecordingTool {
        fn generate(&self, request: &CertificateRequest<'_>) -> Result<(), ProvisionError> {
            self.requests.borrow_mut().push((
                request.keystore_path.to_path_buf(),
                request.password.to_string(),
                request.subject_alt_names.clone(),
            ));
            if self.fail {
                return Err(ProvisionError::CertificateToolFailed {
                    program: "fake-keytool".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "boom".to_string(),
                });
            }
            fs::write(request.keystore_path, b"fake-p12").unwrap();
            Ok(())
        }
    }

    fn https_config(host: &str) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.host = host.to_string();
        config.https.enabled = true;
        config
    }

    #[test]
    fn explicit_keytool_program_is_kept() {
        let tool = KeytoolGenerator::new("/opt/jdk/bin/keytool");
        assert_eq!(tool.program(), Path::new("/opt/jdk/bin/keytool"));
    }

    #[test]
    fn dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let instance = dir.path().join("inst");
        let provisioner = KeystoreProvisioner::new(RecordingTool::default());

        let info = provisioner.ensure_keystore(&instance, &https_config("localhost"), false).unwrap();

        assert!(info.planned);
        assert_eq!(info.password, PLANNED_PASSWORD);
        assert_eq!(info.keystore_path, instance.join("certs").join(KEYSTORE_FILE));
        assert!(!instance.exists());
        assert!(provisioner.tool.requests.borrow().is_empty());
    }

    #[test]
    fn first_call_creates_both_files() {
        let dir = TempDir::new().unwrap();
        let provisioner = KeystoreProvisioner::new(RecordingTool::default());

        let info = provisioner.ensure_keystore(dir.path(), &https_config("localhost"), true).unwrap();

        assert!(!info.planned);
        assert!(info.keystore_path.is_file());
        let stored = fs::read_to_string(dir.path().join("certs").join(PASSWORD_FILE)).unwrap();
        assert_eq!(stored, info.password);
        // 32 bytes of base64 without padding.
        assert_eq!(info.password.len(), 43);
        assert!(!info.password.contains('+') && !info.password.contains('/'));
    }

    #[cfg(unix)]
    #[test]
    fn files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let provisioner = KeystoreProvisioner::new(RecordingTool::default());
        let info = provisioner.ensure_keystore(dir.path(), &https_config("localhost"), true).unwrap();

        for path in [info.keystore_path.clone(), dir.path().join("certs").join(PASSWORD_FILE)] {
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{}", path.display());
        }
    }

    #[test]
    fn second_call_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let provisioner = KeystoreProvisioner::new(RecordingTool::default());
        let config = https_config("localhost");

        let first = provisioner.ensure_keystore(dir.path(), &config, true).unwrap();
        let second = provisioner.ensure_keystore(dir.path(), &config, true).unwrap();

        assert_eq!(first, second);
        assert_eq!(provisioner.tool.requests.borrow().len(), 1);
    }

    #[test]
    fn missing_keystore_reuses_stored_password() {
        let dir = TempDir::new().unwrap();
        let certs = dir.path().join("certs");
        fs::create_dir_all(&certs).unwrap();
        fs::write(certs.join(PASSWORD_FILE), "existing-secret\n").unwrap();
        let provisioner = KeystoreProvisioner::new(RecordingTool::default());

        let info = provisioner.ensure_keystore(dir.path(), &https_config("localhost"), true).unwrap();

        assert_eq!(info.password, "existing-secret");
        assert_eq!(provisioner.tool.requests.borrow()[0].1, "existing-secret");
    }

    #[test]
    fn orphaned_keystore_is_regenerated() {
        let dir = TempDir::new().unwrap();
        let certs = dir.path().join("certs");
        fs::create_dir_all(&certs).unwrap();
        fs::write(certs.join(KEYSTORE_FILE), b"old").unwrap();
        let provisioner = KeystoreProvisioner::new(RecordingTool::default());

        let info = provisioner.ensure_keystore(dir.path(), &https_config("localhost"), true).unwrap();

        assert_eq!(fs::read(&info.keystore_path).unwrap(), b"fake-p12");
        assert_eq!(fs::read_to_string(certs.join(PASSWORD_FILE)).unwrap(), info.password);
    }

    #[test]
    fn tool_failure_leaves_no_partial_state() {
        let dir = TempDir::new().unwrap();
        let provisioner = KeystoreProvisioner::new(RecordingTool {
            fail: true,
            ..Default::default()
        });

        let err = provisioner
            .ensure_keystore(dir.path(), &https_config("localhost"), true)
            .unwrap_err();

        assert!(matches!(err, ProvisionError::CertificateToolFailed { .. }));
        assert!(!dir.path().join("certs").join(PASSWORD_FILE).exists());
        assert!(!dir.path().join("certs").join(KEYSTORE_FILE).exists());
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let dir = TempDir::new().unwrap();
        let provisioner = KeystoreProvisioner::new(KeytoolGenerator::new(
            dir.path().join("definitely-not-keytool"),
        ));
        let err = provisioner
            .ensure_keystore(dir.path(), &https_config("localhost"), true)
            .unwrap_err();
        assert!(matches!(err, ProvisionError::CertificateToolSpawn { .. }));
        assert!(!dir.path().join("certs").join(PASSWORD_FILE).exists());
    }

    #[test]
    fn sans_cover_localhost_host_and_loopback() {
        assert_eq!(subject_alt_names("localhost"), vec!["dns:localhost", "ip:127.0.0.1"]);
        assert_eq!(
            subject_alt_names("shop.test"),
            vec!["dns:localhost", "dns:shop.test", "ip:127.0.0.1"]
        );
        assert_eq!(
            subject_alt_names("10.0.0.5"),
            vec!["dns:localhost", "ip:10.0.0.5", "ip:127.0.0.1"]
        );
    }

    #[test]
    fn keytool_arguments_never_contain_the_password() {
        let request = CertificateRequest {
            keystore_path: Path::new("/i/certs/keystore.p12"),
            password: "s3cret",
            alias: KEY_ALIAS,
            common_name: "localhost",
            subject_alt_names: subject_alt_names("localhost"),
            key_size_bits: KEY_SIZE_BITS,
            validity_days: VALIDITY_DAYS,
        };
        let args = KeytoolGenerator::arguments(&request);
        assert!(!args.iter().any(|a| a.contains("s3cret")));
        assert!(args.contains(&"SAN=dns:localhost,ip:127.0.0.1".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-validity" && w[1] == "825"));
        assert!(args.windows(2).any(|w| w[0] == "-storetype" && w[1] == "PKCS12"));
    }
}
