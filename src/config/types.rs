//! Configuration types and defaults for docstore.

use serde::{Deserialize, Serialize};

/// When a new lock session refreshes the in-memory document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Re-read the backing file on the first `xml()`/`apply()` of a session.
    #[default]
    Lazy,
    /// Re-read the backing file as part of `lock()`.
    Eager,
}

// Default value functions for serde
pub(crate) fn default_root_element() -> String {
    "github".to_string()
}
pub(crate) fn default_lock_suffix() -> String {
    ".lock".to_string()
}
pub(crate) fn default_true() -> bool {
    true
}
