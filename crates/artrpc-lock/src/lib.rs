//! Advisory session lock for artrpc
//!
//! A run rewrites the scratch script, executes it and reloads the store. Two
//! hosts doing that against the same home directory would clobber each
//! other's script, so the whole sequence runs under an exclusive `fd-lock` on
//! `<home>/.artrpc.lock`. The lock is advisory: it coordinates artrpc
//! processes, nothing else.
//!
//! The lock file is never deleted. While held it records who holds it; after
//! release it names the last holder.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, Write};
use std::process;
use thiserror::Error;
use tracing::debug;

/// Holder information written into the lock file on acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Process ID that took the lock
    pub pid: u32,
    /// When the lock was taken
    pub acquired_at: DateTime<Utc>,
    /// artrpc version that took the lock
    pub version: String,
}

impl LockInfo {
    fn current() -> Self {
        Self {
            pid: process::id(),
            acquired_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Failed to open lock file {path}: {source}")]
    Open {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to acquire lock {path}: {source}")]
    Acquire {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to record lock holder in {path}: {source}")]
    Record {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Lock file {path} is corrupted: {source}")]
    Corrupted {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// An open handle on the session lock file.
///
/// Opening does not lock anything; [`with_exclusive`](Self::with_exclusive)
/// holds the lock for exactly the duration of its closure.
pub struct SessionLock {
    path: Utf8PathBuf,
    inner: RwLock<File>,
}

impl SessionLock {
    /// Open (creating if needed) the lock file at `path`.
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self, LockError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            inner: RwLock::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Run `f` while holding the lock, blocking until it is free.
    pub fn with_exclusive<T>(&mut self, f: impl FnOnce() -> T) -> Result<T, LockError> {
        debug!(path = %self.path, "Waiting for session lock");
        let mut guard = self.inner.write().map_err(|source| LockError::Acquire {
            path: self.path.clone(),
            source,
        })?;
        record_holder(&mut guard, &self.path)?;
        debug!(path = %self.path, "Session lock acquired");

        let result = f();

        drop(guard);
        debug!(path = %self.path, "Session lock released");
        Ok(result)
    }

}

impl std::fmt::Debug for SessionLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLock")
            .field("path", &self.path)
            .field("inner", &"<RwLock>")
            .finish()
    }
}

fn record_holder(file: &mut File, path: &Utf8Path) -> Result<(), LockError> {
    let record = |source: io::Error| LockError::Record {
        path: path.to_owned(),
        source,
    };
    let json =
        serde_json::to_vec(&LockInfo::current()).map_err(|e| record(io::Error::other(e)))?;

    file.set_len(0).map_err(record)?;
    file.rewind().map_err(record)?;
    file.write_all(&json).map_err(record)?;
    file.flush().map_err(record)
}

/// Current (or most recent) holder recorded in the lock file at `path`.
///
/// `Ok(None)` when the file is missing or has never been locked.
pub fn last_holder(path: &Utf8Path) -> Result<Option<LockInfo>, LockError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LockError::Open {
                path: path.to_owned(),
                source,
            });
        }
    };
    if content.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| LockError::Corrupted {
            path: path.to_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn lock_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("home").join(".artrpc.lock")).unwrap()
    }

    #[test]
    fn test_open_creates_file_and_parent() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);

        let lock = SessionLock::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(lock.path(), path.as_path());
        assert_eq!(last_holder(&path).unwrap(), None);
    }

    #[test]
    fn test_with_exclusive_returns_closure_value_and_records_holder() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);
        let mut lock = SessionLock::open(&path).unwrap();

        let value = lock.with_exclusive(|| 40 + 2).unwrap();

        assert_eq!(value, 42);
        let holder = last_holder(&path).unwrap().unwrap();
        assert_eq!(holder.pid, process::id());
        assert_eq!(holder.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_waiter_runs_after_holder_releases() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);
        let mut holder = SessionLock::open(&path).unwrap();
        let (tx, rx) = mpsc::channel();

        let waiter_path = path.clone();
        let waiter = holder
            .with_exclusive(|| {
                let waiter_tx = tx.clone();
                let handle = thread::spawn(move || {
                    let mut lock = SessionLock::open(&waiter_path).unwrap();
                    lock.with_exclusive(|| waiter_tx.send("waiter").unwrap()).unwrap();
                });
                thread::sleep(Duration::from_millis(100));
                tx.send("holder").unwrap();
                handle
            })
            .unwrap();
        waiter.join().unwrap();

        let order: Vec<_> = rx.try_iter().collect();
        assert_eq!(order, vec!["holder", "waiter"]);
    }

    #[test]
    fn test_corrupted_holder_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(&dir);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        assert!(matches!(last_holder(&path), Err(LockError::Corrupted { .. })));
    }

    #[test]
    fn test_missing_lock_file_has_no_holder() {
        let dir = TempDir::new().unwrap();
        assert_eq!(last_holder(&lock_path(&dir)).unwrap(), None);
    }
}
