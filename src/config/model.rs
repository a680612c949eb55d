//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for a document store.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the root element of a new document (default: "github").
    #[serde(default = "default_root_element")]
    pub root_element: String,

    /// Appended to the backing path to name the lock file (default: ".lock").
    #[serde(default = "default_lock_suffix")]
    pub lock_suffix: String,

    /// When a new lock session re-reads the backing file.
    #[serde(default)]
    pub reload: ReloadPolicy,

    /// Whether persisted files start with an XML declaration.
    #[serde(default = "default_true")]
    pub xml_declaration: bool,

    /// Upper bound on lock waits for CLI commands. Unset waits forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_element: default_root_element(),
            lock_suffix: default_lock_suffix(),
            reload: ReloadPolicy::default(),
            xml_declaration: default_true(),
            lock_timeout_ms: None,
        }
    }
}
