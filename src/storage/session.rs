//! RAII lock sessions.

use super::Storage;
use crate::directives::Directives;
use crate::document::Document;
use crate::error::Result;
use std::marker::PhantomData;
use tracing::warn;

/// Holds the lock on a [`Storage`] until dropped.
///
/// The lock belongs to the thread that took it, so a session cannot be sent
/// to another thread.
#[derive(Debug)]
pub struct Session<'a> {
    storage: &'a Storage,
    released: bool,
    _not_send: PhantomData<*const ()>,
}

impl<'a> Session<'a> {
    pub(super) fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            released: false,
            _not_send: PhantomData,
        }
    }

    /// See [`Storage::xml`].
    pub fn xml(&self) -> Result<Document> {
        self.storage.xml()
    }

    /// See [`Storage::apply`].
    pub fn apply(&self, directives: &Directives) -> Result<Document> {
        self.storage.apply(directives)
    }

    /// Release the lock now, reporting any error.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.storage.unlock()
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.storage.unlock()
        {
            warn!("failed to release lock on drop: {}", e);
        }
    }
}
