//! Lock tokens.

use super::metadata::LockMetadata;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::ThreadId;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Proof that a lock session was granted.
///
/// Every successful acquisition produces a token with a fresh `session` id,
/// so a cache tagged with the id of an older session is known to be stale.
#[derive(Debug, Clone)]
pub struct LockToken {
    session: u64,
    thread_id: ThreadId,
    metadata: LockMetadata,
}

impl LockToken {
    pub(super) fn issue() -> Self {
        Self {
            session: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            thread_id: std::thread::current().id(),
            metadata: LockMetadata::current(),
        }
    }

    /// Process-unique id of the lock session this token belongs to.
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Holder metadata recorded in the lock file.
    pub fn metadata(&self) -> &LockMetadata {
        &self.metadata
    }

    /// Whether the calling thread is the one that acquired the lock.
    pub fn is_current_thread(&self) -> bool {
        self.thread_id == std::thread::current().id()
    }
}
