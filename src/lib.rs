//! docstore: a file-backed XML document store with cross-process locking.
//!
//! A [`Storage`] owns one XML file on disk. Callers take an exclusive lock,
//! read the document with [`Storage::xml`] or edit it with
//! [`Storage::apply`], and release the lock. The lock is an OS advisory lock
//! on a sibling lock file, so threads of one process and separate processes
//! exclude each other the same way. Each new lock session re-reads the file,
//! and every edit is written back atomically before it becomes visible.

pub mod config;
pub mod directives;
pub mod document;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod query;
pub mod storage;

pub use config::Config;
pub use directives::{Directive, Directives};
pub use document::Document;
pub use error::{Result, StoreError};
pub use storage::{Session, Storage};
