//! Locking subsystem for docstore.
//!
//! One exclusive lock guards one backing document. The lock must be visible
//! to other processes, not only to other threads, so it is an OS advisory
//! lock on a dedicated lock file next to the document (`doc.xml.lock`).
//!
//! # Lock Files
//!
//! The lock file is created on first acquisition and never removed. While a
//! lock is held it contains JSON metadata about the holder:
//! - `owner`: The owner of the lock (e.g., `user@HOST`)
//! - `pid`: The process ID
//! - `thread`: The holding thread
//! - `acquired_at`: RFC3339 timestamp
//!
//! The content is cleared again on release. It is informational only; the
//! OS lock is the sole source of truth.
//!
//! # States
//!
//! `UNLOCKED -> lock() -> LOCKED -> unlock() -> UNLOCKED`. Calling `unlock()`
//! from a thread that does not hold the lock is a misuse error.

mod manager;
mod metadata;
mod token;

#[cfg(test)]
mod tests;

pub use manager::{FileLock, LockStatus};
pub use metadata::LockMetadata;
pub use token::LockToken;
