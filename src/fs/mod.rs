//! Filesystem utilities for docstore.
//!
//! Atomic writes keep a reader from ever observing a half-written document.

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_file};
