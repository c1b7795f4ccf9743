//! Authentication strategies: password, key file, agent.

use std::sync::Arc;

use russh::client;
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key};
use skiff_core::{Error, Result};
use tracing::debug;

use crate::config::AuthMethod;
use crate::session::ConnectorHandler;

/// Run exactly one strategy for the configured mode. No strategy falls
/// back to another; a caller wanting a different mode reconnects with a
/// different configuration.
pub(crate) async fn authenticate(
    handle: &mut client::Handle<ConnectorHandler>,
    username: &str,
    method: &AuthMethod,
) -> Result<()> {
    match method {
        AuthMethod::Password { password } => {
            debug!(username, "authenticating with password");
            let outcome = handle
                .authenticate_password(username, password)
                .await
                .map_err(|e| Error::Authentication(format!("password exchange failed: {e}")))?;

            if !outcome.success() {
                return Err(Error::Authentication(format!(
                    "server rejected password for user '{username}'"
                )));
            }
            Ok(())
        }

        AuthMethod::KeyFile {
            private_key_path,
            passphrase,
            ..
        } => {
            debug!(username, key = %private_key_path.display(), "authenticating with key file");
            let has_passphrase = passphrase.as_deref().is_some_and(|p| !p.is_empty());

            let key = match load_secret_key(private_key_path, passphrase.as_deref()) {
                Ok(key) => key,
                Err(e) => {
                    return Err(key_failure(
                        has_passphrase,
                        format!(
                            "could not load private key {}: {e}",
                            private_key_path.display()
                        ),
                    ));
                }
            };

            let hash_alg = handle
                .best_supported_rsa_hash()
                .await
                .map_err(|e| Error::Connection(format!("hash negotiation failed: {e}")))?
                .flatten();

            let outcome = match handle
                .authenticate_publickey(
                    username,
                    PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                )
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    return Err(key_failure(has_passphrase, format!("key exchange failed: {e}")));
                }
            };

            if !outcome.success() {
                return Err(key_failure(
                    has_passphrase,
                    format!("server rejected key for user '{username}'"),
                ));
            }
            Ok(())
        }

        AuthMethod::Agent => {
            debug!(username, "authenticating via SSH agent");
            let mut agent = russh::keys::agent::client::AgentClient::connect_env()
                .await
                .map_err(|e| Error::Authentication(format!("could not reach SSH agent: {e}")))?;

            let identities = agent.request_identities().await.map_err(|e| {
                Error::Authentication(format!("listing agent identities failed: {e}"))
            })?;

            if identities.is_empty() {
                return Err(Error::Authentication("SSH agent holds no identities".into()));
            }

            let hash_alg = handle
                .best_supported_rsa_hash()
                .await
                .map_err(|e| Error::Connection(format!("hash negotiation failed: {e}")))?
                .flatten();

            for identity in identities {
                match handle
                    .authenticate_publickey_with(username, identity, hash_alg, &mut agent)
                    .await
                {
                    Ok(outcome) if outcome.success() => return Ok(()),
                    Ok(_) => continue,
                    Err(e) => {
                        debug!("agent identity rejected: {e}");
                        continue;
                    }
                }
            }

            Err(Error::Authentication(format!(
                "server rejected every agent identity for user '{username}'"
            )))
        }
    }
}

/// Key-file failures are re-classified when a passphrase is involved:
/// passphrase-protected keys in legacy cipher/KDF formats are known not to
/// work with some platform and library combinations, and that is by far
/// the most common cause. Without a passphrase the failure stays generic.
pub(crate) fn key_failure(passphrase_configured: bool, detail: String) -> Error {
    if passphrase_configured {
        Error::Authentication(format!(
            "{detail}; passphrase-protected private keys in legacy cipher formats are not \
             supported on some platforms. Re-encrypt the key in the OpenSSH format \
             (ssh-keygen -p -o) or remove the passphrase"
        ))
    } else {
        Error::Authentication(detail)
    }
}
