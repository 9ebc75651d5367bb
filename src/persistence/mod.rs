//! Persistence of the produced files: the verbatim JSON copy and the archive

pub mod archive;

pub use archive::ZipArchiver;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Error types for file persistence
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read archive input {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive input {} has no file name", path.display())]
    NoFileName { path: PathBuf },

    #[error("Failed to build archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Archive task failed: {0}")]
    Task(String),
}

/// Write `bytes` to `path`, replacing any existing file
pub async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| PersistError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Trait for archive backends
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Bundle `paths` into one archive at `output`, each under its base name
    async fn archive(&self, paths: &[PathBuf], output: &Path) -> Result<(), PersistError>;
}
