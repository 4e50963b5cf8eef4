//! Archive detection and extraction.
//!
//! - `format.rs` - magic-byte detection
//! - `sanitize.rs` - entry name cleanup and zip-slip rejection
//! - `zip_archive.rs` / `tar_archive.rs` / `sevenz_archive.rs` - per-format extraction

pub mod format;
pub mod sanitize;
mod sevenz_archive;
mod tar_archive;
mod zip_archive;

pub use format::{detect_format, detect_path, ArchiveFormat, TarCompression};
pub use sanitize::{replace_illegal_chars, sanitize_entry_path};

use crate::config::ExtractConfig;
use crate::error::ExtractError;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// The archive capability the walker consumes.
///
/// `detect` answers "is this an archive?" without treating a negative answer
/// as an error; `extract_as` writes every entry below `destination` and
/// returns how many entries were written.
pub trait ArchiveProbe: Send + Sync {
    fn detect(&self, path: &Path) -> io::Result<Option<ArchiveFormat>>;

    fn extract_as(
        &self,
        archive: &Path,
        format: ArchiveFormat,
        destination: &Path,
    ) -> Result<usize, ExtractError>;

    fn is_archive(&self, path: &Path) -> io::Result<bool> {
        Ok(self.detect(path)?.is_some())
    }

    fn extract(&self, archive: &Path, destination: &Path) -> Result<usize, ExtractError> {
        let format = self
            .detect(archive)
            .map_err(|e| ExtractError::io(archive, e))?
            .ok_or_else(|| ExtractError::UnsupportedFormat {
                path: archive.to_path_buf(),
            })?;
        self.extract_as(archive, format, destination)
    }
}

/// Probe backed by the `zip`, `tar`, `flate2` and `sevenz-rust` crates.
#[derive(Debug, Clone)]
pub struct DefaultProbe {
    placeholder: String,
}

impl DefaultProbe {
    pub fn new<S: Into<String>>(placeholder: S) -> Self {
        Self {
            placeholder: placeholder.into(),
        }
    }

    pub fn from_config(config: &ExtractConfig) -> Self {
        Self::new(config.placeholder.clone())
    }
}

impl Default for DefaultProbe {
    fn default() -> Self {
        Self::from_config(&ExtractConfig::default())
    }
}

impl ArchiveProbe for DefaultProbe {
    fn detect(&self, path: &Path) -> io::Result<Option<ArchiveFormat>> {
        detect_path(path)
    }

    fn extract_as(
        &self,
        archive: &Path,
        format: ArchiveFormat,
        destination: &Path,
    ) -> Result<usize, ExtractError> {
        let file = File::open(archive).map_err(|e| ExtractError::io(archive, e))?;
        let reader = BufReader::new(file);

        match format {
            ArchiveFormat::Zip => zip_archive::extract(reader, archive, destination, &self.placeholder),
            ArchiveFormat::SevenZip => {
                sevenz_archive::extract(reader, archive, destination, &self.placeholder)
            }
            ArchiveFormat::Tar(TarCompression::None) => {
                tar_archive::extract(reader, archive, destination, &self.placeholder)
            }
            ArchiveFormat::Tar(TarCompression::Gzip) => tar_archive::extract(
                GzDecoder::new(reader),
                archive,
                destination,
                &self.placeholder,
            ),
        }
    }
}

pub(crate) fn create_entry_dir(path: &Path) -> Result<(), ExtractError> {
    if !path.is_dir() {
        fs::create_dir_all(path).map_err(|e| ExtractError::io(path, e))?;
    }
    Ok(())
}

/// Streams one file entry to `target`, replacing any existing file.
///
/// Read errors come from the archive stream and are reported as a malformed
/// archive; write errors are I/O failures on the target.
pub(crate) fn write_entry<R: Read + ?Sized>(
    entry: &mut R,
    archive: &Path,
    target: &Path,
) -> Result<u64, ExtractError> {
    if let Some(parent) = target.parent() {
        create_entry_dir(parent)?;
    }

    let file = File::create(target).map_err(|e| ExtractError::io(target, e))?;
    let mut writer = BufWriter::new(file);
    let mut buffer = vec![0u8; 64 * 1024];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = match entry.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ExtractError::malformed(
                    archive,
                    format!("failed reading entry {}: {}", target.display(), e),
                ))
            }
        };

        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| ExtractError::io(target, e))?;
        total_bytes += bytes_read as u64;
    }

    writer.flush().map_err(|e| ExtractError::io(target, e))?;
    Ok(total_bytes)
}
