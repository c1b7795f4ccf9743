//! SFTP session lifecycle: connect, authenticate, subsystem setup,
//! disconnect.

use std::sync::Arc;
use std::time::Duration;

use russh::client;
use russh::keys::ssh_key;
use russh_sftp::client::SftpSession;
use skiff_core::{Error, Result};
use tracing::debug;

use crate::auth;
use crate::config::SftpConfig;

/// Timeout for the SSH handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Inactivity timeout for an established session.
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

/// SSH client handler.
///
/// Host keys are accepted and their fingerprint logged; key management is
/// left to the deployment, matching how this connector has always been
/// operated behind an orchestrator.
pub(crate) struct ConnectorHandler {
    host: String,
    port: u16,
}

impl client::Handler for ConnectorHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        debug!(
            host = %self.host,
            port = self.port,
            fingerprint = %server_public_key.fingerprint(Default::default()),
            "accepting server host key"
        );
        Ok(true)
    }
}

/// An SFTP-backed remote file source.
///
/// Two-tier session: the raw SSH transport handle and, derived from it
/// exactly once after successful authentication, the SFTP subsystem the
/// filesystem operations target. Neither tier survives [`disconnect`].
///
/// [`disconnect`]: SftpSource::disconnect_session
pub struct SftpSource {
    config: SftpConfig,
    handle: Option<client::Handle<ConnectorHandler>>,
    sftp: Option<SftpSession>,
}

impl std::fmt::Debug for SftpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpSource")
            .field("config", &self.config)
            .field("handle", &self.handle.as_ref().map(|_| ".."))
            .field("sftp", &self.sftp.as_ref().map(|_| ".."))
            .finish()
    }
}

impl SftpSource {
    /// Create a connector for the given configuration. No network activity
    /// happens until [`SftpSource::connect`].
    pub fn new(config: SftpConfig) -> Self {
        Self {
            config,
            handle: None,
            sftp: None,
        }
    }

    /// Lifecycle hook 1: establish the SSH transport.
    pub async fn connect(&mut self) -> Result<()> {
        let config = Arc::new(client::Config {
            inactivity_timeout: Some(INACTIVITY_TIMEOUT),
            ..Default::default()
        });

        let handler = ConnectorHandler {
            host: self.config.host.clone(),
            port: self.config.port,
        };

        debug!(host = %self.config.host, port = self.config.port, "connecting");

        let address = (self.config.host.as_str(), self.config.port);
        let handle = tokio::time::timeout(
            CONNECT_TIMEOUT,
            client::connect(config, address, handler),
        )
        .await
        .map_err(|_| {
            Error::Connection(format!(
                "SSH connect to {}:{} timed out after {}s",
                self.config.host,
                self.config.port,
                CONNECT_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| {
            Error::Connection(format!(
                "SSH connect to {}:{} failed: {e}",
                self.config.host, self.config.port
            ))
        })?;

        self.handle = Some(handle);
        Ok(())
    }

    /// Lifecycle hook 2: run exactly one authentication strategy, selected
    /// by the configured mode.
    pub async fn authenticate(&mut self) -> Result<()> {
        let username = self.config.username.clone();
        let method = self.config.auth.clone();
        let handle = self.handle.as_mut().ok_or_else(|| {
            Error::Connection("cannot authenticate before the transport is connected".into())
        })?;

        auth::authenticate(handle, &username, &method).await
    }

    /// Lifecycle hook 3: derive the SFTP subsystem from the authenticated
    /// transport. Valid exactly once per connection.
    pub async fn open_subsystem(&mut self) -> Result<()> {
        if self.sftp.is_some() {
            return Err(Error::Connection(
                "SFTP subsystem is already open for this connection".into(),
            ));
        }

        let handle = self.handle.as_ref().ok_or_else(|| {
            Error::Connection("cannot open the SFTP subsystem before authentication".into())
        })?;

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Connection(format!("failed to open SSH channel: {e}")))?;

        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| Error::Connection(format!("failed to request SFTP subsystem: {e}")))?;

        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| Error::Connection(format!("failed to start SFTP session: {e}")))?;

        debug!("SFTP subsystem ready");
        self.sftp = Some(sftp);
        Ok(())
    }

    /// Sequence the lifecycle hooks up to the ready state. Retry policy
    /// stays with the caller.
    pub async fn connect_ready(config: SftpConfig) -> Result<Self> {
        config.validate()?;

        let mut source = Self::new(config);
        source.connect().await?;
        source.authenticate().await?;
        source.open_subsystem().await?;
        Ok(source)
    }

    /// The derived filesystem-subsystem handle; an error before the
    /// connection is ready or after disconnect.
    pub(crate) fn sftp(&self) -> Result<&SftpSession> {
        self.sftp.as_ref().ok_or_else(|| {
            Error::Connection("SFTP session is not ready (not connected or already closed)".into())
        })
    }

    /// Read access to the configuration this connector was built with.
    pub fn config(&self) -> &SftpConfig {
        &self.config
    }

    /// Deterministically release both session tiers, best-effort. Release
    /// failures are logged and suppressed so they never mask an operation
    /// outcome.
    pub(crate) async fn disconnect_session(&mut self) -> Result<()> {
        if let Some(sftp) = self.sftp.take() {
            if let Err(e) = sftp.close().await {
                debug!("SFTP session close failed: {e}");
            }
        }

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await
            {
                debug!("SSH disconnect failed: {e}");
            }
        }

        Ok(())
    }
}
