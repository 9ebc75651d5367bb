//! ZIP archiver

use crate::persistence::{Archiver, PersistError};
use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Deflate level used for every entry
pub const COMPRESSION_LEVEL: i64 = 9;

/// Writes a flat ZIP archive with maximal deflate compression
///
/// Entries are stored under the base name of their source path. All inputs
/// are opened before the output is created, so an unreadable input leaves no
/// archive behind.
#[derive(Debug, Clone, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    pub fn new() -> Self {
        Self
    }

    /// Blocking body of [`Archiver::archive`]
    pub fn archive_blocking(&self, paths: &[PathBuf], output: &Path) -> Result<(), PersistError> {
        let mut inputs = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| PersistError::NoFileName { path: path.clone() })?;
            let file = File::open(path).map_err(|source| PersistError::Read {
                path: path.clone(),
                source,
            })?;
            inputs.push((path, name, file));
        }

        let archive_err = |source| PersistError::Archive {
            path: output.to_path_buf(),
            source,
        };

        let out = File::create(output).map_err(|source| PersistError::Write {
            path: output.to_path_buf(),
            source,
        })?;
        let mut zip = ZipWriter::new(out);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(COMPRESSION_LEVEL));

        for (path, name, mut file) in inputs {
            zip.start_file(name.as_str(), options).map_err(archive_err)?;
            let copied = std::io::copy(&mut file, &mut zip).map_err(|source| PersistError::Read {
                path: path.clone(),
                source,
            })?;
            debug!("Added {} ({} bytes) as {}", path.display(), copied, name);
        }

        zip.finish().map_err(archive_err)?;
        Ok(())
    }
}

#[async_trait]
impl Archiver for ZipArchiver {
    async fn archive(&self, paths: &[PathBuf], output: &Path) -> Result<(), PersistError> {
        let archiver = self.clone();
        let count = paths.len();
        let paths = paths.to_vec();
        let output_path = output.to_path_buf();

        tokio::task::spawn_blocking(move || archiver.archive_blocking(&paths, &output_path))
            .await
            .map_err(|e| PersistError::Task(e.to_string()))??;

        info!("Archived {} file(s) into {}", count, output.display());
        Ok(())
    }
}
