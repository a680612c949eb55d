//! Tests for the locks subsystem.

use super::*;
use crate::error::StoreError;
use chrono::{Duration as ChronoDuration, Utc};
use serial_test::serial;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn lock_in(dir: &TempDir) -> FileLock {
    FileLock::new(dir.path().join("doc.xml.lock"))
}

#[test]
fn test_lock_metadata_creation() {
    let meta = LockMetadata::current();

    assert!(!meta.owner.is_empty());
    assert!(meta.owner.contains('@'));
    assert_eq!(meta.pid, std::process::id());
    assert!(!meta.thread.is_empty());
    assert!(meta.age().num_minutes() < 1);
}

#[test]
fn test_lock_metadata_serialization() {
    let meta = LockMetadata::current();
    let json = meta.to_json().unwrap();

    assert!(json.contains("owner"));
    assert!(json.contains("acquired_at"));

    let parsed: LockMetadata = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, meta);
}

#[test]
fn test_lock_metadata_age_string() {
    let mut meta = LockMetadata::current();
    assert!(meta.age_string().ends_with('s'));

    meta.acquired_at = Utc::now() - ChronoDuration::minutes(5);
    assert!(meta.age_string().starts_with("5m"));

    meta.acquired_at = Utc::now() - ChronoDuration::hours(2);
    assert!(meta.age_string().starts_with("2h"));
}

#[test]
fn test_metadata_from_missing_or_empty_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("x.lock");

    assert_eq!(LockMetadata::from_file(&path).unwrap(), None);

    std::fs::write(&path, "").unwrap();
    assert_eq!(LockMetadata::from_file(&path).unwrap(), None);

    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(
        LockMetadata::from_file(&path),
        Err(StoreError::LockError(_))
    ));
}

#[test]
fn test_lock_and_unlock() {
    let temp_dir = TempDir::new().unwrap();
    let lock = lock_in(&temp_dir);

    assert!(!lock.is_held_by_current_thread());
    let token = lock.lock().unwrap();
    assert!(lock.is_held_by_current_thread());
    assert!(token.is_current_thread());
    assert!(lock.path().exists());

    lock.unlock().unwrap();
    assert!(!lock.is_held_by_current_thread());
    assert!(lock.token().is_none());

    // Re-acquirable after release, and the lock file is kept.
    lock.lock().unwrap();
    lock.unlock().unwrap();
    assert!(lock.path().exists());
}

#[test]
fn test_each_session_gets_a_new_id() {
    let temp_dir = TempDir::new().unwrap();
    let lock = lock_in(&temp_dir);

    let first = lock.lock().unwrap();
    lock.unlock().unwrap();
    let second = lock.lock().unwrap();
    lock.unlock().unwrap();

    assert!(second.session() > first.session());
}

#[test]
fn test_lock_creates_missing_directories() {
    let temp_dir = TempDir::new().unwrap();
    let lock = FileLock::new(temp_dir.path().join("a").join("b").join("doc.xml.lock"));

    lock.lock().unwrap();
    assert!(temp_dir.path().join("a").join("b").is_dir());
    lock.unlock().unwrap();
}

#[test]
fn test_lock_fails_when_path_unwritable() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("plain-file");
    std::fs::write(&blocker, "").unwrap();

    // A regular file cannot act as a directory.
    let lock = FileLock::new(blocker.join("doc.xml.lock"));

    assert!(matches!(lock.lock(), Err(StoreError::LockError(_))));
    assert!(matches!(lock.try_lock(), Err(StoreError::LockError(_))));
    assert!(!lock.is_held_by_current_thread());
}

#[test]
fn test_unlock_without_lock_is_misuse() {
    let temp_dir = TempDir::new().unwrap();
    let lock = lock_in(&temp_dir);

    let err = lock.unlock().unwrap_err();
    assert!(matches!(err, StoreError::MisuseError(_)));
    assert!(err.to_string().contains("unlock()"));
}

#[test]
fn test_unlock_from_other_thread_is_misuse() {
    let temp_dir = TempDir::new().unwrap();
    let lock = Arc::new(lock_in(&temp_dir));
    lock.lock().unwrap();

    let other = Arc::clone(&lock);
    let result = thread::spawn(move || other.unlock()).join().unwrap();
    assert!(matches!(result, Err(StoreError::MisuseError(_))));

    // Still ours.
    assert!(lock.is_held_by_current_thread());
    lock.unlock().unwrap();
}

#[test]
fn test_holder_requires_calling_thread() {
    let temp_dir = TempDir::new().unwrap();
    let lock = Arc::new(lock_in(&temp_dir));

    assert!(matches!(
        lock.holder("xml()"),
        Err(StoreError::MisuseError(_))
    ));

    let token = lock.lock().unwrap();
    assert_eq!(lock.holder("xml()").unwrap().session(), token.session());

    let other = Arc::clone(&lock);
    let from_other = thread::spawn(move || other.holder("xml()").is_err())
        .join()
        .unwrap();
    assert!(from_other);

    lock.unlock().unwrap();
}

#[test]
fn test_try_lock_sees_other_instance() {
    let temp_dir = TempDir::new().unwrap();
    let first = lock_in(&temp_dir);
    let second = lock_in(&temp_dir);

    first.lock().unwrap();
    assert!(second.try_lock().unwrap().is_none());

    first.unlock().unwrap();
    assert!(second.try_lock().unwrap().is_some());
    second.unlock().unwrap();
}

#[test]
fn test_try_lock_sees_other_thread_on_same_instance() {
    let temp_dir = TempDir::new().unwrap();
    let lock = Arc::new(lock_in(&temp_dir));
    lock.lock().unwrap();

    let other = Arc::clone(&lock);
    let got = thread::spawn(move || other.try_lock().unwrap().is_some())
        .join()
        .unwrap();
    assert!(!got);

    lock.unlock().unwrap();
}

#[test]
#[serial]
fn test_blocked_waiter_proceeds_after_unlock() {
    let temp_dir = TempDir::new().unwrap();
    let lock = Arc::new(lock_in(&temp_dir));
    lock.lock().unwrap();

    let (tx, rx) = mpsc::channel();
    let waiter = Arc::clone(&lock);
    let handle = thread::spawn(move || {
        waiter.lock().unwrap();
        tx.send(Instant::now()).unwrap();
        waiter.unlock().unwrap();
    });

    assert!(
        rx.recv_timeout(Duration::from_secs(1)).is_err(),
        "second lock() must block while the first is held"
    );

    let released_at = Instant::now();
    lock.unlock().unwrap();

    let granted_at = rx
        .recv_timeout(Duration::from_secs(1))
        .expect("second lock() must succeed once released");
    assert!(granted_at.duration_since(released_at) < Duration::from_secs(1));
    handle.join().unwrap();
}

#[test]
#[serial]
fn test_lock_timeout_expires_while_held() {
    let temp_dir = TempDir::new().unwrap();
    let holder = lock_in(&temp_dir);
    let waiter = lock_in(&temp_dir);
    holder.lock().unwrap();

    let started = Instant::now();
    let err = waiter.lock_timeout(Duration::from_millis(200)).unwrap_err();
    assert!(matches!(err, StoreError::TimeoutError(_)));
    assert!(started.elapsed() >= Duration::from_millis(200));

    // The abandoned wait left nothing behind.
    holder.unlock().unwrap();
    waiter.lock_timeout(Duration::from_secs(1)).unwrap();
    waiter.unlock().unwrap();
}

#[test]
#[serial]
fn test_only_one_holder_at_a_time() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("doc.xml.lock");
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let lock = FileLock::new(&path);
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            thread::spawn(move || {
                for _ in 0..5 {
                    lock.lock().unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(2));
                    inside.fetch_sub(1, Ordering::SeqCst);
                    lock.unlock().unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
}

#[test]
fn test_holder_recorded_while_held() {
    let temp_dir = TempDir::new().unwrap();
    let lock = lock_in(&temp_dir);

    assert_eq!(FileLock::inspect(lock.path()).unwrap(), LockStatus::Unlocked);

    let token = lock.lock().unwrap();
    match FileLock::inspect(lock.path()).unwrap() {
        LockStatus::Locked(Some(meta)) => assert_eq!(&meta, token.metadata()),
        other => panic!("expected recorded holder, got {:?}", other),
    }

    lock.unlock().unwrap();
    assert_eq!(FileLock::inspect(lock.path()).unwrap(), LockStatus::Unlocked);
    assert_eq!(LockMetadata::from_file(lock.path()).unwrap(), None);
}

#[test]
#[serial]
fn test_inspect_does_not_block_try_lock() {
    let temp_dir = TempDir::new().unwrap();
    let lock = lock_in(&temp_dir);
    let path = lock.path().to_path_buf();
    let done = Arc::new(AtomicBool::new(false));

    let watcher = {
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut probes = 0usize;
            while !done.load(Ordering::SeqCst) {
                FileLock::inspect(&path).unwrap();
                probes += 1;
            }
            probes
        })
    };

    let mut refused = 0;
    for _ in 0..2000 {
        match lock.try_lock().unwrap() {
            Some(_) => lock.unlock().unwrap(),
            None => refused += 1,
        }
    }
    done.store(true, Ordering::SeqCst);
    assert!(watcher.join().unwrap() > 0);

    assert_eq!(refused, 0, "try_lock refused with no other holder");
}

#[test]
fn test_inspect_half_written_record() {
    let temp_dir = TempDir::new().unwrap();
    let lock = lock_in(&temp_dir);
    let _token = lock.lock().unwrap();

    std::fs::write(lock.path(), "{\"owner\": \"someone@ho").unwrap();

    assert_eq!(
        FileLock::inspect(lock.path()).unwrap(),
        LockStatus::Locked(None)
    );
    lock.unlock().unwrap();
}

#[test]
fn test_inspect_ignores_stale_record() {
    let temp_dir = TempDir::new().unwrap();
    let lock = lock_in(&temp_dir);
    std::fs::write(lock.path(), LockMetadata::current().to_json().unwrap()).unwrap();

    assert_eq!(FileLock::inspect(lock.path()).unwrap(), LockStatus::Unlocked);
    let token = lock.try_lock().unwrap();
    assert!(token.is_some());
    lock.unlock().unwrap();
}

#[test]
fn test_drop_releases_lock() {
    let temp_dir = TempDir::new().unwrap();
    {
        let lock = lock_in(&temp_dir);
        lock.lock().unwrap();
    }

    let again = lock_in(&temp_dir);
    assert!(again.try_lock().unwrap().is_some());
    again.unlock().unwrap();
}
