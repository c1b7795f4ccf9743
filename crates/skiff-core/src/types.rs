//! Shared data model for remote file sources.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Permission-relevant bits of a file mode (setuid/setgid/sticky + rwx).
pub const PERMISSION_MASK: u32 = 0o7777;

/// File-type bits of a Unix mode.
const FILE_TYPE_MASK: u32 = 0o170000;
const DIRECTORY_TYPE: u32 = 0o040000;

/// Structured metadata for one remote file, as far as the remote reported it.
///
/// Every field is optional because SFTP servers are free to omit attributes;
/// a missing [`FileStat`] altogether (see [`DirectoryEntry::stat`]) means the
/// stat probe itself failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// Full mode bits, including file type, when reported
    pub permissions: Option<u32>,
    /// Size in bytes
    pub size: Option<u64>,
    /// Modification time, seconds since the Unix epoch
    pub modified: Option<u32>,
}

impl FileStat {
    /// Permission bits masked to the permission-relevant portion.
    pub fn permission_bits(&self) -> Option<u32> {
        self.permissions.map(|mode| mode & PERMISSION_MASK)
    }

    /// Whether the mode bits identify a directory.
    pub fn is_dir(&self) -> bool {
        self.permissions
            .map(|mode| mode & FILE_TYPE_MASK == DIRECTORY_TYPE)
            .unwrap_or(false)
    }
}

/// One listed directory entry. Reserved names (`.`, `..`) are never
/// materialized as entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    /// `None` when the per-entry stat probe failed
    pub stat: Option<FileStat>,
}

/// Immutable description of one upload or download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOperation {
    pub local_path: PathBuf,
    pub remote_path: String,
    /// Permission bits to apply on upload; only meaningful for uploads that
    /// must preserve source permissions (copy emulation)
    pub mode: Option<u32>,
}

impl TransferOperation {
    pub fn new(local_path: impl AsRef<Path>, remote_path: impl Into<String>) -> Self {
        Self {
            local_path: local_path.as_ref().to_path_buf(),
            remote_path: remote_path.into(),
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_bits_are_masked() {
        let stat = FileStat {
            permissions: Some(0o100644),
            size: Some(12),
            modified: None,
        };
        assert_eq!(stat.permission_bits(), Some(0o644));
        assert!(!stat.is_dir());
    }

    #[test]
    fn directory_type_bits() {
        let stat = FileStat {
            permissions: Some(0o040755),
            size: None,
            modified: None,
        };
        assert!(stat.is_dir());
        assert_eq!(stat.permission_bits(), Some(0o755));
    }

    #[test]
    fn transfer_operation_mode_defaults_to_none() {
        let op = TransferOperation::new("/tmp/a", "/remote/a");
        assert_eq!(op.mode, None);
        assert_eq!(op.with_mode(0o644).mode, Some(0o644));
    }
}
