//! # Skiff Core
//!
//! Protocol-agnostic contract for remote file sources.
//!
//! A file source is an authenticated remote filesystem capability with a
//! fixed operation set: list, upload, download, delete, make/remove
//! directory, rename, change permissions, copy. Protocol connectors
//! (SFTP today) implement the [`FileSource`] trait once each; an
//! orchestrator selects the connector from configuration at construction
//! time and drives the connect → authenticate → ready → disconnect
//! lifecycle.

pub mod error;
pub mod path;
pub mod source;
pub mod types;

pub use error::{Error, OperationError, Result};
pub use source::FileSource;
pub use types::{DirectoryEntry, FileStat, PERMISSION_MASK, TransferOperation};
