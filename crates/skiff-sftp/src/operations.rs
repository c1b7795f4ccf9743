//! Filesystem operations against the SFTP subsystem.
//!
//! Each operation is one session call; the work is in turning an opaque
//! failure into a classified [`OperationError`] before it leaves this
//! module.

use std::path::Path;

use async_trait::async_trait;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::{FileAttributes, OpenFlags};
use skiff_core::{
    DirectoryEntry, Error, FileSource, FileStat, OperationError, Result, TransferOperation, path,
};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::classify::{self, PathProbes, Reprobe};
use crate::copy::{self, StagedTransfer};
use crate::session::SftpSource;

const OP_LIST: &str = "list directory";
const OP_UPLOAD: &str = "upload file";
const OP_DOWNLOAD: &str = "download file";
const OP_DELETE: &str = "delete file";
const OP_MKDIR: &str = "make directory";
const OP_RMDIR: &str = "remove directory";
const OP_RENAME: &str = "rename";
const OP_CHMOD: &str = "change permissions";
const OP_COPY: &str = "copy file";

/// Reserved names never surface; hidden entries only when requested.
fn keep_entry(name: &str, show_hidden: bool) -> bool {
    if name == "." || name == ".." {
        return false;
    }
    show_hidden || !name.starts_with('.')
}

fn stat_from_attrs(attrs: &FileAttributes) -> FileStat {
    FileStat {
        permissions: attrs.permissions,
        size: attrs.size,
        modified: attrs.mtime,
    }
}

/// A failed staged transfer names the hidden staging file; relabel it to
/// the remote endpoints of the copy before it surfaces.
fn relabel_copy_error(
    mut error: OperationError,
    source: &str,
    destination: &str,
) -> OperationError {
    error.operation = OP_COPY.to_string();
    error.path = source.to_string();
    error.secondary_path = Some(destination.to_string());
    error
}

/// Decide the failure message for a directory creation. An entry already
/// present at the target path answers directly; the probe cascade never
/// runs in that case.
async fn mkdir_failure_cause<P: PathProbes + Sync + ?Sized>(
    probes: &P,
    path: &str,
    status: Option<String>,
) -> String {
    if probes.exists(path).await {
        return format!("file exists at {path}");
    }
    if let Some(cause) = status {
        return cause;
    }
    match classify::determine_file_error(probes, path, false).await {
        Some(cause) => cause.message(path),
        None => format!("unknown error creating directory {path}"),
    }
}

/// Live probes for the classifier cascade, one SFTP request per predicate.
#[async_trait]
impl PathProbes for SftpSession {
    async fn exists(&self, path: &str) -> bool {
        self.metadata(path).await.is_ok()
    }

    async fn readable(&self, path: &str) -> bool {
        match self.metadata(path).await {
            Ok(attrs) if attrs.file_type().is_dir() => self.read_dir(path).await.is_ok(),
            Ok(_) => match self.open_with_flags(path, OpenFlags::READ).await {
                Ok(mut file) => {
                    // Dropping the handle does not guarantee a close packet;
                    // send one so the probe leaves nothing open server-side.
                    let _ = file.shutdown().await;
                    true
                }
                Err(_) => false,
            },
            Err(_) => false,
        }
    }

    async fn writable(&self, path: &str) -> bool {
        match self.metadata(path).await {
            Ok(attrs) if attrs.file_type().is_dir() => {
                // Directories cannot be opened for writing; the owner-write
                // bit is the best signal available, unreported modes pass.
                attrs
                    .permissions
                    .map(|mode| mode & 0o200 != 0)
                    .unwrap_or(true)
            }
            _ => match self.open_with_flags(path, OpenFlags::WRITE).await {
                Ok(mut file) => {
                    let _ = file.shutdown().await;
                    true
                }
                Err(_) => false,
            },
        }
    }
}

impl SftpSource {
    /// Stat a remote path; `None` is the explicit "unavailable" value.
    pub(crate) async fn stat_remote(&self, path: &str) -> Option<FileStat> {
        let sftp = self.sftp().ok()?;
        sftp.metadata(path)
            .await
            .ok()
            .map(|attrs| stat_from_attrs(&attrs))
    }

    /// Classify the current state of a remote path the way the failure
    /// path would. `Ok(None)` means no issue was detected.
    pub async fn diagnose(&self, path: &str, expect_exists: bool) -> Result<Option<String>> {
        let sftp = self.sftp()?;
        Ok(classify::determine_file_error(sftp, path, expect_exists)
            .await
            .map(|cause| cause.message(path)))
    }

    /// The reporting hook: known raw-failure phrases implicate one side of
    /// the transfer; re-probe that side and fold the stat outcome into a
    /// binary verdict. Everything else passes through unchanged.
    async fn refine_operation_error(&self, mut error: OperationError) -> Error {
        match classify::reprobe_for(&error.message) {
            Reprobe::Remote => {
                let target = error
                    .secondary_path
                    .clone()
                    .unwrap_or_else(|| error.path.clone());
                let found = self.stat_remote(&target).await.is_some();
                error.message = classify::fold_stat_probe(found).to_string();
            }
            Reprobe::Local => {
                let found = tokio::fs::metadata(&error.path).await.is_ok();
                error.message = classify::fold_stat_probe(found).to_string();
            }
            Reprobe::FoldToDenied => {
                error.message = "permission denied".to_string();
            }
            Reprobe::Keep => {}
        }
        Error::Operation(error)
    }

    /// Single streamed download. Raw failures carry recognizable phrases
    /// for the reporting hook; no classification happens here.
    async fn raw_download(&self, operation: &TransferOperation) -> Result<()> {
        let sftp = self.sftp()?;
        let remote = operation.remote_path.as_str();

        let mut remote_file = sftp
            .open_with_flags(remote, OpenFlags::READ)
            .await
            .map_err(|e| {
                Error::Operation(OperationError::new(
                    OP_DOWNLOAD,
                    remote,
                    format!("{} {remote}: {e}", classify::REMOTE_RECEIVE_FAILURE),
                ))
            })?;

        let mut local_file = tokio::fs::File::create(&operation.local_path)
            .await
            .map_err(|e| {
                Error::Operation(OperationError::new(
                    OP_DOWNLOAD,
                    remote,
                    format!(
                        "failure creating local file {}: {e}",
                        operation.local_path.display()
                    ),
                ))
            })?;

        tokio::io::copy(&mut remote_file, &mut local_file)
            .await
            .map_err(|e| {
                Error::Operation(OperationError::new(
                    OP_DOWNLOAD,
                    remote,
                    format!("{} {remote}: {e}", classify::REMOTE_RECEIVE_FAILURE),
                ))
            })?;

        let _ = remote_file.shutdown().await;
        local_file.flush().await?;
        debug!(remote, local = %operation.local_path.display(), "downloaded file");
        Ok(())
    }

    /// Single streamed upload, applying the operation's permission mode
    /// when it carries one.
    async fn raw_upload(&self, operation: &TransferOperation) -> Result<()> {
        let sftp = self.sftp()?;
        let local = operation.local_path.display().to_string();
        let remote = operation.remote_path.as_str();

        let mut local_file = tokio::fs::File::open(&operation.local_path)
            .await
            .map_err(|e| {
                Error::Operation(
                    OperationError::new(
                        OP_UPLOAD,
                        &local,
                        format!("{} {local}: {e}", classify::LOCAL_READ_FAILURE),
                    )
                    .with_secondary(remote),
                )
            })?;

        let flags = OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE;
        let open_result = match operation.mode {
            Some(mode) => {
                let mut attrs = FileAttributes::default();
                attrs.permissions = Some(mode);
                sftp.open_with_flags_and_attributes(remote, flags, attrs)
                    .await
            }
            None => sftp.open_with_flags(remote, flags).await,
        };

        let mut remote_file = open_result.map_err(|e| {
            Error::Operation(
                OperationError::new(
                    OP_UPLOAD,
                    &local,
                    format!("{} {remote}: {e}", classify::REMOTE_CREATE_FAILURE),
                )
                .with_secondary(remote),
            )
        })?;

        let copy_outcome = tokio::io::copy(&mut local_file, &mut remote_file).await;
        let shutdown_outcome = remote_file.shutdown().await;

        for outcome in [copy_outcome.map(|_| ()), shutdown_outcome] {
            outcome.map_err(|e| {
                Error::Operation(
                    OperationError::new(
                        OP_UPLOAD,
                        &local,
                        format!("{} {remote}: {e}", classify::REMOTE_CREATE_FAILURE),
                    )
                    .with_secondary(remote),
                )
            })?;
        }

        debug!(local = %local, remote, "uploaded file");
        Ok(())
    }

    async fn download_refined(&self, operation: &TransferOperation) -> Result<()> {
        match self.raw_download(operation).await {
            Err(Error::Operation(error)) => Err(self.refine_operation_error(error).await),
            other => other,
        }
    }

    async fn upload_refined(&self, operation: &TransferOperation) -> Result<()> {
        match self.raw_upload(operation).await {
            Err(Error::Operation(error)) => Err(self.refine_operation_error(error).await),
            other => other,
        }
    }
}

#[async_trait]
impl StagedTransfer for SftpSource {
    async fn fetch(&self, remote: &str, local: &Path) -> Result<()> {
        self.download_refined(&TransferOperation::new(local, remote))
            .await
    }

    async fn store(&self, local: &Path, remote: &str, mode: Option<u32>) -> Result<()> {
        let mut operation = TransferOperation::new(local, remote);
        if let Some(mode) = mode {
            operation = operation.with_mode(mode);
        }
        self.upload_refined(&operation).await
    }

    async fn stat(&self, remote: &str) -> Option<FileStat> {
        self.stat_remote(remote).await
    }
}

#[async_trait]
impl FileSource for SftpSource {
    fn protocol_name(&self) -> &'static str {
        "SFTP"
    }

    async fn list_directory(
        &mut self,
        dir_path: &str,
        show_hidden: bool,
    ) -> Result<Vec<DirectoryEntry>> {
        let sftp = self.sftp()?;

        let entries = match sftp.read_dir(dir_path).await {
            Ok(entries) => entries,
            Err(e) => {
                let message = match classify::status_cause(&e, dir_path) {
                    Some(cause) => cause,
                    None => match classify::determine_file_error(sftp, dir_path, true).await {
                        Some(cause) => cause.message(dir_path),
                        None => format!("{} {dir_path}: {e}", classify::DIR_OPEN_FAILURE),
                    },
                };
                let error = OperationError::new(OP_LIST, dir_path, message);
                return Err(self.refine_operation_error(error).await);
            }
        };

        // The subsystem materializes the enumeration before returning, so
        // no remote directory handle outlives this call, even on error.
        let mut listing = Vec::new();
        for entry in entries {
            let name = entry.file_name();
            if !keep_entry(&name, show_hidden) {
                continue;
            }

            let full_path = path::join(dir_path, &name);
            let stat = self.stat_remote(&full_path).await;
            listing.push(DirectoryEntry { name, stat });
        }

        Ok(listing)
    }

    async fn upload_file(&mut self, operation: &TransferOperation) -> Result<()> {
        self.upload_refined(operation).await
    }

    async fn download_file(&mut self, operation: &TransferOperation) -> Result<()> {
        self.download_refined(operation).await
    }

    async fn delete_file(&mut self, file_path: &str) -> Result<()> {
        let sftp = self.sftp()?;
        match sftp.remove_file(file_path).await {
            Ok(()) => {
                debug!(path = file_path, "deleted remote file");
                Ok(())
            }
            Err(e) => {
                let message = match classify::status_cause(&e, file_path) {
                    Some(cause) => cause,
                    None => match classify::determine_file_error(sftp, file_path, true).await {
                        Some(cause) => cause.message(file_path),
                        // A parent directory without write permission is
                        // the common unclassifiable case.
                        None => format!("permission denied deleting {file_path}"),
                    },
                };
                Err(Error::Operation(OperationError::new(
                    OP_DELETE, file_path, message,
                )))
            }
        }
    }

    async fn make_directory(&mut self, dir_path: &str) -> Result<()> {
        let sftp = self.sftp()?;
        match sftp.create_dir(dir_path).await {
            Ok(()) => {
                debug!(path = dir_path, "created remote directory");
                Ok(())
            }
            Err(e) => {
                let status = classify::status_cause(&e, dir_path);
                let message = mkdir_failure_cause(sftp, dir_path, status).await;
                Err(Error::Operation(OperationError::new(
                    OP_MKDIR, dir_path, message,
                )))
            }
        }
    }

    async fn remove_directory(&mut self, dir_path: &str) -> Result<()> {
        let sftp = self.sftp()?;
        sftp.remove_dir(dir_path).await.map_err(|e| {
            Error::Operation(OperationError::new(OP_RMDIR, dir_path, e.to_string()))
        })?;
        debug!(path = dir_path, "removed remote directory");
        Ok(())
    }

    async fn rename(&mut self, source: &str, destination: &str) -> Result<()> {
        let sftp = self.sftp()?;
        match sftp.rename(source, destination).await {
            Ok(()) => {
                debug!(source, destination, "renamed remote path");
                Ok(())
            }
            Err(_) => {
                // The source is expected to exist; the destination commonly
                // is not, so its existence probe is skipped.
                let message = if let Some(cause) =
                    classify::determine_file_error(sftp, source, true).await
                {
                    cause.message(source)
                } else if let Some(cause) =
                    classify::determine_file_error(sftp, destination, false).await
                {
                    cause.message(destination)
                } else {
                    format!("unknown error moving {source} to {destination}")
                };
                Err(Error::Operation(
                    OperationError::new(OP_RENAME, source, message).with_secondary(destination),
                ))
            }
        }
    }

    async fn change_permissions(&mut self, mode: u32, target_path: &str) -> Result<()> {
        let sftp = self.sftp()?;
        let mut attrs = FileAttributes::default();
        attrs.permissions = Some(mode);
        sftp.set_metadata(target_path, attrs).await.map_err(|e| {
            Error::Operation(OperationError::new(OP_CHMOD, target_path, e.to_string()))
        })?;
        let mode_octal = format!("{mode:o}");
        debug!(path = target_path, mode = %mode_octal, "changed permissions");
        Ok(())
    }

    async fn copy_file(&mut self, source: &str, destination: &str) -> Result<()> {
        match copy::copy_via_staging(self, source, destination).await {
            Ok(()) => {
                debug!(source, destination, "copied remote file via local staging");
                Ok(())
            }
            Err(Error::Operation(error)) => {
                // Keep the classified message but name the copy operation
                // and both remote endpoints, never the staging file.
                Err(Error::Operation(relabel_copy_error(
                    error,
                    source,
                    destination,
                )))
            }
            Err(other) => Err(other),
        }
    }

    async fn stat(&mut self, target_path: &str) -> Result<Option<FileStat>> {
        self.sftp()?;
        Ok(self.stat_remote(target_path).await)
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.disconnect_session().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_and_hidden_entries_are_filtered() {
        let raw = [".", "..", ".hidden", "a.txt", "b.txt"];
        let listed: Vec<&str> = raw
            .iter()
            .copied()
            .filter(|name| keep_entry(name, false))
            .collect();
        assert_eq!(listed, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn hidden_entries_surface_when_requested() {
        let raw = [".", "..", ".hidden", "a.txt"];
        let listed: Vec<&str> = raw
            .iter()
            .copied()
            .filter(|name| keep_entry(name, true))
            .collect();
        // Reserved names stay filtered; enumeration order is preserved.
        assert_eq!(listed, vec![".hidden", "a.txt"]);
    }

    #[test]
    fn stat_conversion_keeps_reported_fields() {
        let mut attrs = FileAttributes::default();
        attrs.permissions = Some(0o100600);
        attrs.size = Some(42);
        let stat = stat_from_attrs(&attrs);
        assert_eq!(stat.permission_bits(), Some(0o600));
        assert_eq!(stat.size, Some(42));
        assert_eq!(stat.modified, None);
    }

    #[test]
    fn copy_failures_name_both_remote_endpoints() {
        // A failed upload leg carries the local staging path; the copy
        // must surface its own remote endpoints instead.
        let staged = OperationError::new("upload file", "/tmp/.tmpQx31Zr", "permission denied")
            .with_secondary("/dst");
        let surfaced = relabel_copy_error(staged, "/src", "/dst");
        assert_eq!(surfaced.to_string(), "copy file /src -> /dst: permission denied");
    }

    #[test]
    fn copy_failures_on_the_download_leg_keep_the_source_primary() {
        let staged =
            OperationError::new("download file", "/src", "no such file or directory /src");
        let surfaced = relabel_copy_error(staged, "/src", "/dst");
        assert_eq!(surfaced.operation, "copy file");
        assert_eq!(surfaced.path, "/src");
        assert_eq!(surfaced.secondary_path.as_deref(), Some("/dst"));
    }

    use std::sync::Mutex;

    /// Probes with fixed answers that record which predicates ran.
    struct RecordingProbes {
        exists: bool,
        readable: bool,
        writable: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingProbes {
        fn with(exists: bool, readable: bool, writable: bool) -> Self {
            Self {
                exists,
                readable,
                writable,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PathProbes for RecordingProbes {
        async fn exists(&self, _path: &str) -> bool {
            self.calls.lock().unwrap().push("exists");
            self.exists
        }

        async fn readable(&self, _path: &str) -> bool {
            self.calls.lock().unwrap().push("readable");
            self.readable
        }

        async fn writable(&self, _path: &str) -> bool {
            self.calls.lock().unwrap().push("writable");
            self.writable
        }
    }

    #[tokio::test]
    async fn mkdir_on_existing_path_skips_the_cascade() {
        let probes = RecordingProbes::with(true, true, true);
        let message = mkdir_failure_cause(&probes, "/srv/present", None).await;
        assert_eq!(message, "file exists at /srv/present");
        // Only the direct existence check ran.
        assert_eq!(probes.calls(), vec!["exists"]);
    }

    #[tokio::test]
    async fn mkdir_prefers_a_structured_status_over_probing() {
        let probes = RecordingProbes::with(false, true, true);
        let message =
            mkdir_failure_cause(&probes, "/srv/new", Some("permission denied /srv/new".into()))
                .await;
        assert_eq!(message, "permission denied /srv/new");
        assert_eq!(probes.calls(), vec!["exists"]);
    }

    #[tokio::test]
    async fn mkdir_falls_through_to_the_cascade() {
        let probes = RecordingProbes::with(false, true, false);
        let message = mkdir_failure_cause(&probes, "/srv/new", None).await;
        assert_eq!(message, "permission denied writing /srv/new");
    }

    #[tokio::test]
    async fn inconclusive_mkdir_failure_stays_generic() {
        let probes = RecordingProbes::with(false, true, true);
        let message = mkdir_failure_cause(&probes, "/srv/new", None).await;
        assert_eq!(message, "unknown error creating directory /srv/new");
    }
}
