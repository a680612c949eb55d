//! The file lock manager.

use super::metadata::LockMetadata;
use super::token::LockToken;
use crate::error::{Result, StoreError};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Polling interval used by [`FileLock::lock_timeout`].
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How often [`FileLock::try_lock`] retries when the lock is taken but no
/// holder is recorded, and how long it waits in between.
const UNRECORDED_RETRIES: u32 = 20;
const UNRECORDED_RETRY_DELAY: Duration = Duration::from_millis(1);

/// Whether a lock file is currently held by anyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    /// Nobody holds the lock.
    Unlocked,
    /// Somebody holds the lock. The metadata is missing if the holder was
    /// caught halfway through recording itself.
    Locked(Option<LockMetadata>),
}

/// Exclusive, cross-process lock bound to one lock file.
///
/// Each acquisition opens its own handle on the lock file and takes an OS
/// advisory lock on it (`flock` on Unix, `LockFileEx` on Windows). Two threads
/// of one process therefore exclude each other exactly like two processes do.
///
/// The lock is not re-entrant: a thread that already holds it and calls
/// [`FileLock::lock`] again blocks forever.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    held: Mutex<Option<Held>>,
}

#[derive(Debug)]
struct Held {
    file: File,
    token: LockToken,
}

impl FileLock {
    /// Create a lock manager for the given lock file. No I/O happens until
    /// the first acquisition.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            held: Mutex::new(None),
        }
    }

    /// Path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the lock is granted.
    ///
    /// There is no built-in timeout; see [`FileLock::lock_timeout`] for a
    /// bounded wait.
    ///
    /// # Errors
    ///
    /// - [`StoreError::LockError`] if the lock file cannot be created or the
    ///   OS lock cannot be taken
    #[instrument(skip(self), fields(path = %self.path.display()), level = "debug")]
    pub fn lock(&self) -> Result<LockToken> {
        let file = self.open()?;
        file.lock_exclusive().map_err(|e| {
            StoreError::LockError(format!("cannot lock '{}': {}", self.path.display(), e))
        })?;
        Ok(self.grant(file))
    }

    /// Try to acquire the lock without blocking.
    ///
    /// Returns `Ok(None)` if another thread or process holds it.
    ///
    /// The OS lock can be busy for an instant without a holder: while
    /// [`FileLock::inspect`] probes it, or between a holder's acquisition and
    /// its record. Contention without a recorded holder is retried briefly
    /// before giving up.
    #[instrument(skip(self), fields(path = %self.path.display()), level = "debug")]
    pub fn try_lock(&self) -> Result<Option<LockToken>> {
        let file = self.open()?;
        for _ in 0..UNRECORDED_RETRIES {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Some(self.grant(file))),
                Err(e) if is_contended(&e) => {
                    if !matches!(LockMetadata::from_file(&self.path), Ok(None)) {
                        return Ok(None);
                    }
                    thread::sleep(UNRECORDED_RETRY_DELAY);
                }
                Err(e) => {
                    return Err(StoreError::LockError(format!(
                        "cannot lock '{}': {}",
                        self.path.display(),
                        e
                    )));
                }
            }
        }
        Ok(None)
    }

    /// Acquire the lock, giving up after `timeout`.
    ///
    /// Polls [`FileLock::try_lock`], so an expired wait leaves nothing behind
    /// for other waiters.
    ///
    /// # Errors
    ///
    /// - [`StoreError::TimeoutError`] if the deadline passes first
    /// - [`StoreError::LockError`] on I/O failure
    pub fn lock_timeout(&self, timeout: Duration) -> Result<LockToken> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(token) = self.try_lock()? {
                return Ok(token);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(StoreError::TimeoutError(timeout));
            }
            thread::sleep(LOCK_POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Release the lock held by the calling thread.
    ///
    /// # Errors
    ///
    /// - [`StoreError::MisuseError`] if the calling thread does not hold it
    /// - [`StoreError::LockError`] if the OS lock cannot be released
    #[instrument(skip(self), fields(path = %self.path.display()), level = "debug")]
    pub fn unlock(&self) -> Result<()> {
        let held = {
            let mut state = self.state();
            if !state.as_ref().is_some_and(|h| h.token.is_current_thread()) {
                return Err(self.not_held("unlock()"));
            }
            state.take()
        };

        match held {
            Some(held) => release(held, &self.path),
            None => Ok(()),
        }
    }

    /// Token of the current session, whichever thread holds it.
    pub fn token(&self) -> Option<LockToken> {
        self.state().as_ref().map(|h| h.token.clone())
    }

    /// Token of the current session if the calling thread holds it.
    ///
    /// `operation` names the guarded call in the error message.
    ///
    /// # Errors
    ///
    /// - [`StoreError::MisuseError`] if the calling thread does not hold the lock
    pub fn holder(&self, operation: &str) -> Result<LockToken> {
        match self.state().as_ref() {
            Some(held) if held.token.is_current_thread() => Ok(held.token.clone()),
            _ => Err(self.not_held(operation)),
        }
    }

    /// Whether the calling thread holds the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.state()
            .as_ref()
            .is_some_and(|h| h.token.is_current_thread())
    }

    /// Report whether a lock file is held, by anyone in any process.
    ///
    /// Never creates the lock file. An empty record means unlocked and is
    /// answered without touching the OS lock. A non-empty record is checked
    /// with a shared probe, since a crashed holder leaves its record behind;
    /// the probe is released at once.
    pub fn inspect(path: &Path) -> Result<LockStatus> {
        let recorded = match LockMetadata::from_file(path) {
            Ok(None) => return Ok(LockStatus::Unlocked),
            Ok(Some(metadata)) => Some(metadata),
            // Record caught halfway through being written.
            Err(e) => {
                debug!("unreadable lock record: {}", e);
                None
            }
        };

        let file = match OpenOptions::new().read(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LockStatus::Unlocked),
            Err(e) => {
                return Err(StoreError::LockError(format!(
                    "cannot open '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        match FileExt::try_lock_shared(&file) {
            Ok(()) => {
                FileExt::unlock(&file).map_err(|e| {
                    StoreError::LockError(format!("cannot unlock '{}': {}", path.display(), e))
                })?;
                debug!("stale lock record in '{}'", path.display());
                Ok(LockStatus::Unlocked)
            }
            Err(e) if is_contended(&e) => Ok(LockStatus::Locked(recorded)),
            Err(e) => Err(StoreError::LockError(format!(
                "cannot probe '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    fn open(&self) -> Result<File> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::LockError(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| {
                StoreError::LockError(format!("cannot open {}: {}", self.path.display(), e))
            })
    }

    /// Record a freshly locked handle as the current session.
    fn grant(&self, file: File) -> LockToken {
        let token = LockToken::issue();
        if let Err(e) = record(&file, token.metadata()) {
            warn!(
                "failed to record lock holder in '{}': {}",
                self.path.display(),
                e
            );
        }

        debug!(session = token.session(), "lock acquired");
        *self.state() = Some(Held {
            file,
            token: token.clone(),
        });
        token
    }

    fn state(&self) -> MutexGuard<'_, Option<Held>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn not_held(&self, operation: &str) -> StoreError {
        StoreError::MisuseError(format!(
            "{} called without holding the lock on '{}'",
            operation,
            self.path.display()
        ))
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let held = self
            .held
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(held) = held
            && let Err(e) = release(held, &self.path)
        {
            warn!("{}", e);
        }
    }
}

/// Clear the holder record and give the OS lock back.
///
/// The lock file itself stays: removing it would let a waiter that already
/// opened it lock an orphaned inode while a newcomer locks a fresh one.
fn release(held: Held, path: &Path) -> Result<()> {
    let session = held.token.session();
    if let Err(e) = held.file.set_len(0) {
        warn!("failed to clear lock holder in '{}': {}", path.display(), e);
    }

    FileExt::unlock(&held.file).map_err(|e| {
        StoreError::LockError(format!("failed to release lock '{}': {}", path.display(), e))
    })?;

    debug!(session = session, "lock released");
    Ok(())
}

fn record(mut file: &File, metadata: &LockMetadata) -> Result<()> {
    let json = metadata.to_json()?;
    file.set_len(0)
        .and_then(|()| file.seek(SeekFrom::Start(0)))
        .and_then(|_| file.write_all(json.as_bytes()))
        .and_then(|()| file.flush())
        .map_err(|e| StoreError::LockError(e.to_string()))
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
