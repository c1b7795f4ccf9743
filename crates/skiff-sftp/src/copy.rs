//! Remote-to-remote copy emulation.
//!
//! SFTP has no copy primitive, so a copy is a download into a scoped
//! local staging file followed by an upload that re-applies the source's
//! permission bits.

use std::path::Path;

use async_trait::async_trait;
use skiff_core::{FileStat, PERMISSION_MASK, Result};
use tempfile::NamedTempFile;

/// The narrow transfer seam the emulator composes. Implemented by the
/// connector against the live session and by mocks in tests.
#[async_trait]
pub(crate) trait StagedTransfer {
    /// Download `remote` into the local staging path.
    async fn fetch(&self, remote: &str, local: &Path) -> Result<()>;

    /// Upload the staging path to `remote`, creating it with `mode` when
    /// given.
    async fn store(&self, local: &Path, remote: &str, mode: Option<u32>) -> Result<()>;

    /// Stat `remote`; `None` when the probe fails.
    async fn stat(&self, remote: &str) -> Option<FileStat>;
}

/// Copy `source` to `destination` through a local staging file.
///
/// The staging file is scoped to this call: [`NamedTempFile`] removes it
/// on drop, so it is released on every exit path before any error
/// propagates. A failed removal is suppressed by the drop implementation
/// and never masks the primary outcome. Any sub-step failure aborts the
/// whole copy; there is no retry here.
pub(crate) async fn copy_via_staging<T: StagedTransfer + Sync>(
    transfers: &T,
    source: &str,
    destination: &str,
) -> Result<()> {
    let staging = NamedTempFile::new()?;

    transfers.fetch(source, staging.path()).await?;

    // Re-apply the source's permission bits, masked to the permission-
    // relevant portion; an unavailable stat degrades to server defaults.
    let mode = transfers
        .stat(source)
        .await
        .and_then(|stat| stat.permissions)
        .map(|bits| bits & PERMISSION_MASK);

    transfers.store(staging.path(), destination, mode).await?;
    Ok(())
}
