//! The remote file-source capability contract.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DirectoryEntry, FileStat, TransferOperation};

/// An authenticated remote filesystem session with a uniform operation set.
///
/// Implemented once per protocol; the orchestrator selects the connector
/// from configuration at construction time and invokes operations only
/// after the connector reached its ready state. The `&mut self` receivers
/// encode the concurrency model: one connector runs one operation at a
/// time, and every operation suspends the caller until the remote session
/// responds. Callers wanting parallel transfers use independent connector
/// instances.
///
/// On ambiguous low-level failures a connector classifies the cause before
/// reporting upward; operation methods therefore fail with
/// [`crate::Error::Operation`] carrying a human-meaningful message.
#[async_trait]
pub trait FileSource: Send {
    /// Protocol name used in configuration errors and diagnostics.
    fn protocol_name(&self) -> &'static str;

    /// Enumerate a remote directory.
    ///
    /// `.` and `..` are never returned; entries whose name begins with the
    /// hidden-file marker are skipped unless `show_hidden` is set. Order
    /// follows the underlying enumeration order.
    async fn list_directory(
        &mut self,
        path: &str,
        show_hidden: bool,
    ) -> Result<Vec<DirectoryEntry>>;

    /// Upload one local file to the remote path of `operation`.
    async fn upload_file(&mut self, operation: &TransferOperation) -> Result<()>;

    /// Download one remote file to the local path of `operation`.
    async fn download_file(&mut self, operation: &TransferOperation) -> Result<()>;

    /// Delete a remote file.
    async fn delete_file(&mut self, path: &str) -> Result<()>;

    /// Create a remote directory.
    async fn make_directory(&mut self, path: &str) -> Result<()>;

    /// Remove a remote directory. Semantics for non-empty directories are
    /// whatever the remote session implements.
    async fn remove_directory(&mut self, path: &str) -> Result<()>;

    /// Rename `source` to `destination`.
    async fn rename(&mut self, source: &str, destination: &str) -> Result<()>;

    /// Change the permission mode of a remote path.
    async fn change_permissions(&mut self, mode: u32, path: &str) -> Result<()>;

    /// Copy `source` to `destination` on the remote side. Protocols without
    /// a native copy primitive emulate this by staging through a local
    /// temporary file.
    async fn copy_file(&mut self, source: &str, destination: &str) -> Result<()>;

    /// Stat a remote path; `Ok(None)` is the explicit "unavailable" value
    /// when the probe itself fails.
    async fn stat(&mut self, path: &str) -> Result<Option<FileStat>>;

    /// Deterministically release the session, both the filesystem subsystem
    /// and the transport underneath it. Best-effort: release failures are
    /// suppressed. The connector is unusable afterwards.
    async fn disconnect(&mut self) -> Result<()>;
}
