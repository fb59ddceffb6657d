//! Moving the store between disk and host memory.

use artrpc_utils::write_file_atomic;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use tracing::debug;

use crate::{RunMetadata, Store, StoreError};

const INDENT: &[u8] = b"    ";

/// Owns the in-memory view of one store document.
///
/// Disk is only written by [`commit`](Self::commit). Reloading after a run and
/// overlaying its result are purely in-memory, so whatever the interpreter
/// persisted stays on disk exactly as it wrote it.
#[derive(Debug, Clone)]
pub struct StoreSynchronizer {
    path: Utf8PathBuf,
    store: Store,
}

impl StoreSynchronizer {
    /// Start with an empty in-memory store; nothing is read yet.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            store: Store::new(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Replace the in-memory view from disk.
    ///
    /// Returns `Ok(false)` and leaves memory untouched when the file does not
    /// exist. A file that exists but cannot be parsed is an error.
    pub fn load(&mut self) -> Result<bool, StoreError> {
        match self.read_document() {
            Ok(store) => {
                debug!(path = %self.path, "Loaded store");
                self.store = store;
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                debug!(path = %self.path, "Store file absent; keeping in-memory view");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Parse the on-disk document without touching the in-memory view.
    pub fn read_document(&self) -> Result<Store, StoreError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    /// Persist the in-memory view, or `replacement` which then becomes it.
    ///
    /// The whole file is rewritten (4-space indented JSON) through a temp file
    /// and rename.
    pub fn commit(&mut self, replacement: Option<Store>) -> Result<(), StoreError> {
        if let Some(store) = replacement {
            self.store = store;
        }

        let bytes = encode_pretty(&self.store).map_err(|source| StoreError::Encode {
            path: self.path.clone(),
            source,
        })?;
        write_file_atomic(&self.path, &bytes).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path, bytes = bytes.len(), "Committed store");
        Ok(())
    }

    /// Record the most recent run's result in memory only.
    pub fn overlay_run_result(&mut self, meta: &RunMetadata) {
        self.store.apply_run_metadata(meta);
    }
}

fn encode_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut ser)?;
    Ok(buf)
}
