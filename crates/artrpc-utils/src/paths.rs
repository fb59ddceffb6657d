//! On-disk layout of an artrpc home directory.
//!
//! ```text
//! <home>/                 default ~/.arturo, override ARTRPC_HOME
//! ├── config.toml         optional
//! ├── .artrpc.lock        session lock
//! ├── _code.art           scratch script, overwritten on every code() call
//! └── stores/
//!     └── rpc.json        the shared store document
//! ```

use camino::Utf8PathBuf;
use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

// Thread-local override used only in tests to avoid process-global env races.
thread_local! {
    static THREAD_HOME: RefCell<Option<Utf8PathBuf>> = const { RefCell::new(None) };
}

/// Environment variable that relocates the home directory.
pub const HOME_ENV: &str = "ARTRPC_HOME";
/// Home directory name under the user's home.
pub const DEFAULT_HOME_DIR: &str = ".arturo";
pub const STORES_DIR: &str = "stores";
/// Logical store name used when none is configured.
pub const DEFAULT_STORE_NAME: &str = "rpc";
pub const DEFAULT_SCRIPT_NAME: &str = "_code.art";
pub const LOCK_FILE_NAME: &str = ".artrpc.lock";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Could not determine the user's home directory; set {HOME_ENV}")]
    NoHomeDirectory,

    #[error("Path is not valid UTF-8: {}", path.display())]
    NonUtf8Path { path: PathBuf },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Resolve the home directory.
///
/// Precedence:
/// 1) thread-local test override
/// 2) env `ARTRPC_HOME`
/// 3) `~/.arturo`
pub fn artrpc_home() -> Result<Utf8PathBuf, LayoutError> {
    if let Some(tl) = THREAD_HOME.with(|tl| tl.borrow().clone()) {
        return Ok(tl);
    }
    if let Ok(p) = std::env::var(HOME_ENV) {
        return Ok(Utf8PathBuf::from(p));
    }
    default_home()
}

/// `~/.arturo`, ignoring `ARTRPC_HOME` (the thread-local test override still
/// applies).
pub fn default_home() -> Result<Utf8PathBuf, LayoutError> {
    if let Some(tl) = THREAD_HOME.with(|tl| tl.borrow().clone()) {
        return Ok(tl);
    }
    let home = dirs::home_dir().ok_or(LayoutError::NoHomeDirectory)?;
    to_utf8(home.join(DEFAULT_HOME_DIR))
}

/// Convert a `PathBuf` into a `Utf8PathBuf`, keeping the original on failure.
pub fn to_utf8(path: PathBuf) -> Result<Utf8PathBuf, LayoutError> {
    Utf8PathBuf::from_path_buf(path).map_err(|path| LayoutError::NonUtf8Path { path })
}

/// mkdir -p; treat `AlreadyExists` as success (removes TOCTTOU races)
pub fn ensure_dir_all<P: AsRef<std::path::Path>>(p: P) -> io::Result<()> {
    match std::fs::create_dir_all(&p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Concrete paths for one session (home + store name + scratch script name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub home: Utf8PathBuf,
    pub stores_dir: Utf8PathBuf,
    pub store_path: Utf8PathBuf,
    pub script_path: Utf8PathBuf,
    pub lock_path: Utf8PathBuf,
}

impl Layout {
    #[must_use]
    pub fn new(home: impl Into<Utf8PathBuf>, store_name: &str, script_name: &str) -> Self {
        let home = home.into();
        let stores_dir = home.join(STORES_DIR);
        Self {
            store_path: stores_dir.join(format!("{store_name}.json")),
            script_path: home.join(script_name),
            lock_path: home.join(LOCK_FILE_NAME),
            stores_dir,
            home,
        }
    }

    /// Layout with the default `rpc` store and `_code.art` scratch script.
    #[must_use]
    pub fn with_defaults(home: impl Into<Utf8PathBuf>) -> Self {
        Self::new(home, DEFAULT_STORE_NAME, DEFAULT_SCRIPT_NAME)
    }

    #[must_use]
    pub fn config_path(&self) -> Utf8PathBuf {
        self.home.join(CONFIG_FILE_NAME)
    }

    /// Create the home and stores directories if they are missing.
    pub fn ensure(&self) -> Result<(), LayoutError> {
        for dir in [&self.home, &self.stores_dir] {
            ensure_dir_all(dir).map_err(|source| LayoutError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn store_exists(&self) -> bool {
        self.store_path.exists()
    }
}

/// RAII guard for isolated home that clears thread-local state on drop
#[cfg(any(test, feature = "test-utils"))]
pub struct HomeGuard {
    inner: tempfile::TempDir,
}

#[cfg(any(test, feature = "test-utils"))]
impl HomeGuard {
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        self.inner.path()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Drop for HomeGuard {
    fn drop(&mut self) {
        THREAD_HOME.with(|tl| *tl.borrow_mut() = None);
    }
}

/// Point [`artrpc_home`] at a fresh temp directory for the current thread.
#[cfg(any(test, feature = "test-utils"))]
#[must_use]
pub fn with_isolated_home() -> HomeGuard {
    let inner = tempfile::TempDir::new().expect("failed to create temp home");
    let path = Utf8PathBuf::from_path_buf(inner.path().to_path_buf())
        .expect("temp dir path is not UTF-8");
    THREAD_HOME.with(|tl| *tl.borrow_mut() = Some(path));
    HomeGuard { inner }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = Layout::with_defaults("/home/u/.arturo");
        assert_eq!(layout.stores_dir, Utf8PathBuf::from("/home/u/.arturo/stores"));
        assert_eq!(layout.store_path, Utf8PathBuf::from("/home/u/.arturo/stores/rpc.json"));
        assert_eq!(layout.script_path, Utf8PathBuf::from("/home/u/.arturo/_code.art"));
        assert_eq!(layout.lock_path, Utf8PathBuf::from("/home/u/.arturo/.artrpc.lock"));
        assert_eq!(layout.config_path(), Utf8PathBuf::from("/home/u/.arturo/config.toml"));
    }

    #[test]
    fn test_partitioned_layout() {
        let layout = Layout::new("/h", "worker-2", "_code.worker-2.art");
        assert_eq!(layout.store_path, Utf8PathBuf::from("/h/stores/worker-2.json"));
        assert_eq!(layout.script_path, Utf8PathBuf::from("/h/_code.worker-2.art"));
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let guard = with_isolated_home();
        let layout = Layout::with_defaults(artrpc_home().unwrap().join("nested"));

        layout.ensure().unwrap();
        layout.ensure().unwrap();

        assert!(layout.stores_dir.is_dir());
        assert!(guard.path().join("nested").is_dir());
        assert!(!layout.store_exists());
    }

    #[test]
    fn test_isolated_home_is_thread_local() {
        let guard = with_isolated_home();
        let home = artrpc_home().unwrap();
        assert_eq!(home.as_std_path(), guard.path());
        drop(guard);
        assert_ne!(artrpc_home().ok(), Some(home));
    }
}
