//! Post-hoc classification of opaque remote failures.
//!
//! Many SFTP servers answer a failing request with a bare `Failure` status
//! and no cause. When that happens the connector probes filesystem
//! predicates after the fact and reports the first mismatch as the cause.
//! The probes inspect state after the failing call, so the diagnosis is
//! inherently racy with respect to concurrent changes to the same path;
//! that race is accepted, not worked around.

use async_trait::async_trait;
use russh_sftp::protocol::StatusCode;

/// Human-meaningful cause for a failed remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCause {
    NotFound,
    DeniedRead,
    DeniedWrite,
}

impl FileCause {
    /// Render the cause against the path it was probed for.
    pub fn message(self, path: &str) -> String {
        match self {
            FileCause::NotFound => format!("no such file or directory {path}"),
            FileCause::DeniedRead => format!("permission denied reading {path}"),
            FileCause::DeniedWrite => format!("permission denied writing {path}"),
        }
    }
}

/// Filesystem predicates the classifier cascades over.
///
/// Abstracted so the cascade is a pure function of probe outcomes and can
/// be unit tested without a live session.
#[async_trait]
pub trait PathProbes {
    async fn exists(&self, path: &str) -> bool;
    async fn readable(&self, path: &str) -> bool;
    async fn writable(&self, path: &str) -> bool;
}

/// Probe cascade: existence (skipped when the path is not expected to
/// exist, e.g. a rename destination), then readability, then writability.
/// Returns `None` when every probe passes despite the reported failure,
/// meaning the root cause is unknown.
pub async fn determine_file_error<P: PathProbes + Sync + ?Sized>(
    probes: &P,
    path: &str,
    expect_exists: bool,
) -> Option<FileCause> {
    if expect_exists && !probes.exists(path).await {
        return Some(FileCause::NotFound);
    }

    if !probes.readable(path).await {
        return Some(FileCause::DeniedRead);
    }

    if !probes.writable(path).await {
        return Some(FileCause::DeniedWrite);
    }

    None
}

/// When a request fails with a structured status the server did explain
/// itself; use that directly instead of probing.
pub(crate) fn status_cause(error: &russh_sftp::client::error::Error, path: &str) -> Option<String> {
    match error {
        russh_sftp::client::error::Error::Status(status) => match status.status_code {
            StatusCode::NoSuchFile => Some(format!("no such file or directory {path}")),
            StatusCode::PermissionDenied => Some(format!("permission denied {path}")),
            _ => None,
        },
        _ => None,
    }
}

// Phrases the transfer executor and lister embed in raw failures. The
// reporting hook keys off these to decide which side of the transfer to
// re-probe before handing the error upward.
pub(crate) const REMOTE_RECEIVE_FAILURE: &str = "unable to receive remote file";
pub(crate) const REMOTE_CREATE_FAILURE: &str = "failure creating remote file";
pub(crate) const LOCAL_READ_FAILURE: &str = "unable to read source file";
pub(crate) const DIR_OPEN_FAILURE: &str = "failed to open directory";

/// What the reporting hook should do with a raw failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reprobe {
    /// Stat the remote target; both "not found" and "permission denied"
    /// produce the same raw failure for remote files
    Remote,
    /// Stat the local source; same ambiguity on the local side
    Local,
    /// Unexplained directory-open failure; fold straight to a denial
    FoldToDenied,
    /// Message is already meaningful, keep it
    Keep,
}

/// Pattern-match the known raw-failure phrases.
pub fn reprobe_for(raw_message: &str) -> Reprobe {
    if raw_message.contains(REMOTE_RECEIVE_FAILURE) || raw_message.contains(REMOTE_CREATE_FAILURE)
    {
        Reprobe::Remote
    } else if raw_message.contains(LOCAL_READ_FAILURE) {
        Reprobe::Local
    } else if raw_message.contains(DIR_OPEN_FAILURE) {
        Reprobe::FoldToDenied
    } else {
        Reprobe::Keep
    }
}

/// Fold a stat probe outcome into the binary verdict: a path that cannot
/// even be statted is gone, one that can is being withheld.
pub fn fold_stat_probe(stat_succeeded: bool) -> &'static str {
    if stat_succeeded {
        "permission denied"
    } else {
        "no such file or directory"
    }
}
