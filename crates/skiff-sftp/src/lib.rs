//! # Skiff SFTP
//!
//! SFTP connector for skiff remote file sources.
//!
//! Every public operation is a single call into an authenticated
//! `russh`/`russh-sftp` session. The distinguishing work is on the failure
//! path: many SFTP servers report failures as an opaque status with no
//! usable cause, so this connector reconstructs a classified diagnosis
//! after the fact by probing remote (or, for uploads, local) filesystem
//! state. Remote-to-remote copy, which the protocol lacks, is emulated by
//! staging through a scoped local temporary file.

mod auth;
pub mod classify;
pub mod config;
mod copy;
mod operations;
mod session;

pub use config::{AuthMethod, SftpConfig};
pub use session::SftpSource;
