//! Locating the interpreter on the search path.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Program name probed when no explicit executable is configured.
pub const DEFAULT_EXECUTABLE: &str = "arturo";

/// First executable file called `name` on `PATH`.
#[must_use]
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let search_path = env::var_os("PATH")?;
    let cwd = env::current_dir().ok()?;
    find_executable_in(name, search_path, cwd)
}

/// Same probe over an explicit search path (`PATH` syntax).
pub(crate) fn find_executable_in(
    name: &str,
    search_path: impl AsRef<OsStr>,
    cwd: impl AsRef<Path>,
) -> Option<PathBuf> {
    which::which_in(name, Some(search_path), cwd).ok()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn test_finds_executable_in_search_path() {
        let dir = TempDir::new().unwrap();
        let expected = write_file(dir.path(), DEFAULT_EXECUTABLE, 0o755);

        let found = find_executable_in(DEFAULT_EXECUTABLE, dir.path(), dir.path());

        assert_eq!(found, Some(expected));
    }

    #[test]
    fn test_skips_non_executable_file() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), DEFAULT_EXECUTABLE, 0o644);

        assert_eq!(find_executable_in(DEFAULT_EXECUTABLE, dir.path(), dir.path()), None);
    }

    #[test]
    fn test_first_directory_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let expected = write_file(first.path(), DEFAULT_EXECUTABLE, 0o755);
        write_file(second.path(), DEFAULT_EXECUTABLE, 0o755);
        let search = std::env::join_paths([first.path(), second.path()]).unwrap();

        assert_eq!(
            find_executable_in(DEFAULT_EXECUTABLE, &search, first.path()),
            Some(expected)
        );
    }
}
