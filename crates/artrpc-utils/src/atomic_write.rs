//! Atomic file writes: temp file in the target directory, fsync, rename.
//!
//! Both the store document and the scratch script go through here so a crash
//! mid-write never leaves a truncated file behind for the interpreter (or the
//! next host run) to read.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

#[cfg(target_os = "windows")]
use std::{thread, time::Duration};

/// Failures of [`write_file_atomic`], each carrying the path involved.
#[derive(Debug, Error)]
pub enum AtomicWriteError {
    #[error("Failed to create parent directory {path}: {source}")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create temporary file in {dir}: {source}")]
    TempFile {
        dir: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write temporary file for {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to rename temporary file onto {path}: {source}")]
    Persist {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Atomically replace `path` with `content`.
///
/// The bytes are written verbatim. Returns the number of rename retries that
/// were needed (always 0 outside Windows).
pub fn write_file_atomic(path: &Utf8Path, content: &[u8]) -> Result<u32, AtomicWriteError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };

    fs::create_dir_all(dir).map_err(|source| AtomicWriteError::CreateDir {
        path: dir.to_owned(),
        source,
    })?;

    let mut temp_file = NamedTempFile::new_in(dir).map_err(|source| AtomicWriteError::TempFile {
        dir: dir.to_owned(),
        source,
    })?;

    temp_file
        .write_all(content)
        .and_then(|()| temp_file.as_file().sync_all())
        .map_err(|source| AtomicWriteError::Write {
            path: path.to_owned(),
            source,
        })?;

    atomic_rename(temp_file, path.as_std_path()).map_err(|source| AtomicWriteError::Persist {
        path: path.to_owned(),
        source,
    })
}

/// Rename with bounded exponential backoff (≤ 250ms total); virus scanners
/// and indexers transiently hold handles on Windows.
#[cfg(target_os = "windows")]
fn atomic_rename(mut temp_file: NamedTempFile, target: &Path) -> io::Result<u32> {
    use std::io::ErrorKind;

    const MAX_RETRIES: u32 = 5;
    const INITIAL_DELAY_MS: u64 = 10;
    const MAX_TOTAL_DELAY_MS: u64 = 250;

    let mut retry_count = 0;
    let mut total_delay_ms = 0;

    loop {
        match temp_file.persist(target) {
            Ok(_) => return Ok(retry_count),
            Err(persist_error) => {
                let retryable = matches!(
                    persist_error.error.kind(),
                    ErrorKind::PermissionDenied | ErrorKind::Other
                );
                if retry_count >= MAX_RETRIES || !retryable {
                    return Err(persist_error.error);
                }

                let delay_ms = INITIAL_DELAY_MS * 2_u64.pow(retry_count);
                if total_delay_ms + delay_ms > MAX_TOTAL_DELAY_MS {
                    let remaining = MAX_TOTAL_DELAY_MS.saturating_sub(total_delay_ms);
                    if remaining > 0 {
                        thread::sleep(Duration::from_millis(remaining));
                    }
                    return persist_error
                        .file
                        .persist(target)
                        .map(|_| retry_count + 1)
                        .map_err(|e| e.error);
                }

                thread::sleep(Duration::from_millis(delay_ms));
                total_delay_ms += delay_ms;
                retry_count += 1;
                temp_file = persist_error.file;
            }
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn atomic_rename(temp_file: NamedTempFile, target: &Path) -> io::Result<u32> {
    temp_file.persist(target).map(|_| 0).map_err(|e| e.error)
}
