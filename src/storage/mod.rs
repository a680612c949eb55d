//! The document store.
//!
//! A [`Storage`] binds one backing XML file to one [`FileLock`]. The document
//! may only be read or edited by the thread holding the lock, and every new
//! lock session starts from what is on disk, so edits made by an earlier
//! holder in another thread or process are always visible.
//!
//! ```no_run
//! use docstore::directives::Directives;
//! use docstore::storage::Storage;
//!
//! let storage = Storage::new("store.xml");
//! storage.lock()?;
//! storage.apply(&Directives::new().xpath("/github").add("test").set("hello, world"))?;
//! let values = storage.xml()?.xpath("/github/test/text()")?;
//! storage.unlock()?;
//! assert_eq!(values, vec!["hello, world"]);
//! # Ok::<(), docstore::error::StoreError>(())
//! ```

mod session;


pub use session::Session;

use crate::config::{Config, ReloadPolicy};
use crate::directives::{self, Directives};
use crate::document::Document;
use crate::error::{Result, StoreError};
use crate::fs::atomic_write_file;
use crate::locks::{FileLock, LockStatus, LockToken};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// A lock-guarded XML document backed by a file.
#[derive(Debug)]
pub struct Storage {
    path: PathBuf,
    config: Config,
    lock: FileLock,
    cache: Mutex<Option<Cached>>,
}

/// The document as seen by one lock session.
#[derive(Debug)]
struct Cached {
    session: u64,
    document: Document,
}

impl Storage {
    /// Create a store for `path` with the default configuration.
    ///
    /// Nothing is read or written until the lock is taken.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = Config::default();
        let lock = FileLock::new(config.lock_path_for(&path));
        Self {
            path,
            config,
            lock,
            cache: Mutex::new(None),
        }
    }

    /// Create a store for `path` with an explicit configuration.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UserError`] if the configuration is invalid
    pub fn with_config(path: impl Into<PathBuf>, config: Config) -> Result<Self> {
        config.validate()?;
        let path = path.into();
        let lock = FileLock::new(config.lock_path_for(&path));
        Ok(Self {
            path,
            config,
            lock,
            cache: Mutex::new(None),
        })
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The lock file guarding the backing file.
    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    /// The configuration this store was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Block until the calling thread holds the lock.
    ///
    /// With [`ReloadPolicy::Eager`] the document is loaded before returning;
    /// if that fails the lock is released again and the error returned.
    pub fn lock(&self) -> Result<()> {
        let token = self.lock.lock()?;
        self.acquired(&token)
    }

    /// Take the lock if nobody else holds it. Returns whether it was taken.
    pub fn try_lock(&self) -> Result<bool> {
        match self.lock.try_lock()? {
            Some(token) => self.acquired(&token).map(|()| true),
            None => Ok(false),
        }
    }

    /// Take the lock, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::TimeoutError`] if the lock was not granted in time
    pub fn lock_timeout(&self, timeout: Duration) -> Result<()> {
        let token = self.lock.lock_timeout(timeout)?;
        self.acquired(&token)
    }

    /// Release the lock held by the calling thread.
    ///
    /// # Errors
    ///
    /// - [`StoreError::MisuseError`] if the calling thread does not hold it
    pub fn unlock(&self) -> Result<()> {
        self.lock.unlock()?;
        self.cache().take();
        Ok(())
    }

    /// Whether the calling thread holds the lock.
    pub fn is_locked(&self) -> bool {
        self.lock.is_held_by_current_thread()
    }

    /// Who holds the lock on this store, in any process.
    pub fn status(&self) -> Result<LockStatus> {
        FileLock::inspect(self.lock_path())
    }

    /// Acquire the lock and return a guard that releases it on drop.
    pub fn session(&self) -> Result<Session<'_>> {
        self.lock()?;
        Ok(Session::new(self))
    }

    /// Like [`Storage::session`], waiting at most `timeout` for the lock.
    pub fn session_timeout(&self, timeout: Duration) -> Result<Session<'_>> {
        self.lock_timeout(timeout)?;
        Ok(Session::new(self))
    }

    /// Snapshot of the current document.
    ///
    /// The first call in a lock session reads the backing file; later calls
    /// return the cached view, including edits made by [`Storage::apply`].
    ///
    /// # Errors
    ///
    /// - [`StoreError::MisuseError`] if the calling thread does not hold the lock
    /// - [`StoreError::DocumentError`] if the backing file cannot be loaded
    pub fn xml(&self) -> Result<Document> {
        let token = self.lock.holder("xml()")?;
        let mut cache = self.cache();
        Ok(self.current(&mut cache, &token)?.clone())
    }

    /// Apply `directives` and persist the result.
    ///
    /// The edits run against a copy of the cached document. Only once the
    /// new document has been written to disk does it replace the cached one,
    /// so a failing directive or a failed write changes neither.
    ///
    /// # Errors
    ///
    /// - [`StoreError::MisuseError`] if the calling thread does not hold the lock
    /// - [`StoreError::DirectiveError`] if a directive fails
    /// - [`StoreError::PersistError`] if the document cannot be written
    #[instrument(skip_all, fields(path = %self.path.display()), level = "debug")]
    pub fn apply(&self, directives: &Directives) -> Result<Document> {
        let token = self.lock.holder("apply()")?;
        let mut cache = self.cache();

        let mut document = self.current(&mut cache, &token)?.clone();
        directives::apply(&mut document, directives)?;

        let xml = document
            .to_xml(self.config.xml_declaration)
            .map_err(|e| StoreError::PersistError(e.to_string()))?;
        atomic_write_file(&self.path, &xml)?;
        debug!(directives = directives.len(), bytes = xml.len(), "document persisted");

        *cache = Some(Cached {
            session: token.session(),
            document: document.clone(),
        });
        Ok(document)
    }

    fn acquired(&self, token: &LockToken) -> Result<()> {
        if self.config.reload == ReloadPolicy::Lazy {
            return Ok(());
        }

        let mut cache = self.cache();
        if let Err(e) = self.current(&mut cache, token) {
            drop(cache);
            if let Err(unlock_err) = self.lock.unlock() {
                warn!("failed to release lock after load error: {}", unlock_err);
            }
            return Err(e);
        }
        Ok(())
    }

    /// The document for `token`'s session, loading it if the cache belongs
    /// to an earlier session.
    fn current<'a>(
        &self,
        cache: &'a mut Option<Cached>,
        token: &LockToken,
    ) -> Result<&'a Document> {
        let stale = cache
            .as_ref()
            .is_none_or(|cached| cached.session != token.session());
        if stale {
            let document = Document::load(&self.path, &self.config.root_element)?;
            debug!(
                path = %self.path.display(),
                session = token.session(),
                "document loaded"
            );
            *cache = Some(Cached {
                session: token.session(),
                document,
            });
        }

        match cache {
            Some(cached) => Ok(&cached.document),
            None => Err(StoreError::DocumentError(format!(
                "no document loaded for '{}'",
                self.path.display()
            ))),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Option<Cached>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
