use artrpc_utils::AtomicWriteError;
use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// Failures reading or persisting the store document.
///
/// None of these are defaulted away: a missing or malformed document on an
/// explicit read, or a failed commit, always reaches the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read store {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Store {path} is not a valid store document: {source}")]
    Malformed {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode store for {path}: {source}")]
    Encode {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write store {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: AtomicWriteError,
    },
}

impl StoreError {
    /// True when the document simply does not exist yet.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }

    #[must_use]
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            Self::Read { path, .. }
            | Self::Malformed { path, .. }
            | Self::Encode { path, .. }
            | Self::Write { path, .. } => path,
        }
    }
}
