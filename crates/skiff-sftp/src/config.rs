//! Configuration for one SFTP file source.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use skiff_core::{Error, Result};

fn default_port() -> u16 {
    22
}

/// Connection settings for an SFTP file source.
///
/// Owned by the caller and read-only for the lifetime of a connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SftpConfig {
    /// Remote host name or address
    pub host: String,

    /// Remote port (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Remote username
    pub username: String,

    /// Authentication mode and its credentials
    pub auth: AuthMethod,
}

/// Authentication mode. Exactly one mode is active by construction; no
/// mode ever falls back to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AuthMethod {
    /// Username + password
    Password { password: String },

    /// Username + key files. `public_key_path` is accepted for parity with
    /// other tooling; the SSH library derives the public half from the
    /// private key.
    KeyFile {
        #[serde(default)]
        public_key_path: Option<PathBuf>,
        private_key_path: PathBuf,
        #[serde(default)]
        passphrase: Option<String>,
    },

    /// Username only; credential material lives in an external SSH agent
    Agent,
}

impl AuthMethod {
    /// Map a configured mode name to a strategy. Any unrecognized name is
    /// a fatal configuration error naming the protocol, raised before any
    /// network activity.
    pub fn from_name(
        name: &str,
        password: Option<String>,
        private_key_path: Option<PathBuf>,
        public_key_path: Option<PathBuf>,
        passphrase: Option<String>,
    ) -> Result<Self> {
        match name {
            "password" => password
                .map(|password| AuthMethod::Password { password })
                .ok_or_else(|| {
                    Error::Config("SFTP password authentication requires a password".into())
                }),
            "keyfile" | "key" => private_key_path
                .map(|private_key_path| AuthMethod::KeyFile {
                    public_key_path,
                    private_key_path,
                    passphrase,
                })
                .ok_or_else(|| {
                    Error::Config(
                        "SFTP key-file authentication requires a private key path".into(),
                    )
                }),
            "agent" => Ok(AuthMethod::Agent),
            other => Err(Error::Config(format!(
                "unknown SFTP authentication method '{other}'"
            ))),
        }
    }

    /// Name of the active mode, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            AuthMethod::Password { .. } => "password",
            AuthMethod::KeyFile { .. } => "keyfile",
            AuthMethod::Agent => "agent",
        }
    }
}

impl SftpConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read SFTP config file: {e}")))?;

        let config: SftpConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse SFTP config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::Config("SFTP host must not be empty".into()));
        }

        if self.username.is_empty() {
            return Err(Error::Config("SFTP username must not be empty".into()));
        }

        if let AuthMethod::KeyFile {
            private_key_path, ..
        } = &self.auth
        {
            if private_key_path.as_os_str().is_empty() {
                return Err(Error::Config(
                    "SFTP private key path must not be empty".into(),
                ));
            }
        }

        Ok(())
    }
}
