//! Error taxonomy for the library. The CLI wraps these in `anyhow`.

use std::io;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the index store, the integrity ledger and backup sync.
///
/// A checksum mismatch is not an error: it is recorded in the ledger as `damaged`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("inconsistent: {0}")]
    Inconsistent(String),

    /// Two distinct filenames resolve to the same short ID.
    #[error("id collision: {id} is claimed by {existing:?} and {incoming:?}")]
    IdCollision {
        id: String,
        existing: String,
        incoming: String,
    },

    #[error("insufficient space on {}: need {needed} bytes, available {available}", path.display())]
    InsufficientSpace {
        path: PathBuf,
        needed: u64,
        available: u64,
    },

    #[error("index store {} is locked by another process", path.display())]
    Locked { path: PathBuf },

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed json in {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("index store error: {0}")]
    Store(#[from] rusqlite::Error),
}

impl Error {
    pub fn decode(what: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Decode {
            what: what.into(),
            source,
        }
    }
}

/// Attach the offending path to an `io::Result`.
pub trait PathContext<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> PathContext<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
