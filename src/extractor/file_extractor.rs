use crate::config::ExtractConfig;
use crate::error::{MirrorError, Result};
use filetime::FileTime;
use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Copies ordinary files into the destination tree.
///
/// Every copy is written to a temporary file beside the target and then
/// renamed over it, so an existing destination file is either left intact or
/// fully replaced. Permission bits and (optionally) the modification time
/// follow the source.
pub struct FileOperations {
    preserve_mtime: bool,
    buffer_size: usize,
}

impl FileOperations {
    pub fn new() -> Self {
        Self {
            preserve_mtime: true,
            buffer_size: 64 * 1024, // 64KB buffer
        }
    }

    pub fn from_config(config: &ExtractConfig) -> Self {
        Self::new().with_preserve_mtime(config.preserve_mtime)
    }

    pub fn with_preserve_mtime(mut self, preserve: bool) -> Self {
        self.preserve_mtime = preserve;
        self
    }

    /// Copies `source` to `dest`, replacing whatever is there, and returns
    /// the number of bytes written.
    pub fn copy_file(&self, source: &Path, dest: &Path) -> Result<u64> {
        let metadata = fs::metadata(source)?;
        if !metadata.is_file() {
            return Err(MirrorError::InvalidPath {
                path: format!("Source is not a file: {}", source.display()),
            });
        }

        let parent = dest.parent().ok_or_else(|| MirrorError::InvalidPath {
            path: format!("Destination has no parent folder: {}", dest.display()),
        })?;
        fs::create_dir_all(parent)?;

        let staging = NamedTempFile::new_in(parent)?;
        let total_bytes = self.copy_with_buffer(source, staging.as_file())?;
        // Staging files are created owner-only; carry the source mode over.
        staging.as_file().set_permissions(metadata.permissions())?;

        staging.persist(dest).map_err(|e| MirrorError::Io(e.error))?;

        if self.preserve_mtime {
            let mtime = FileTime::from_last_modification_time(&metadata);
            if let Err(e) = filetime::set_file_mtime(dest, mtime) {
                tracing::warn!("Could not set modification time on {}: {}", dest.display(), e);
            }
        }

        Ok(total_bytes)
    }

    fn copy_with_buffer(&self, source: &Path, dest: &fs::File) -> Result<u64> {
        let source_file = fs::File::open(source)?;

        let mut reader = BufReader::with_capacity(self.buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(self.buffer_size, dest);

        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; 8192]; // 8KB chunks

        loop {
            let bytes_read = reader.read(&mut buffer)?;

            if bytes_read == 0 {
                break;
            }

            writer.write_all(&buffer[..bytes_read])?;
            total_bytes += bytes_read as u64;
        }

        writer.flush()?;

        Ok(total_bytes)
    }
}

impl Default for FileOperations {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_copy_creates_parent_folders() {
        let source_dir = TempDir::new().unwrap();
        let dest_dir = TempDir::new().unwrap();

        let source = source_dir.path().join("README.md");
        fs::write(&source, "# Test").unwrap();
        let dest = dest_dir.path().join("docs").join("nested").join("README.md");

        let copied = FileOperations::new().copy_file(&source, &dest).unwrap();

        assert_eq!(copied, 6);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "# Test");
    }

    #[test]
    fn test_copy_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        let dest = dir.path().join("out").join("a.txt");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, "old content that is longer").unwrap();
        fs::write(&source, "new").unwrap();

        FileOperations::new().copy_file(&source, &dest).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
        // Only the target remains, no staging files.
        assert_eq!(fs::read_dir(dest.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_copy_preserves_mtime() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("old.txt");
        let dest = dir.path().join("copy").join("old.txt");
        fs::write(&source, "data").unwrap();

        let past = SystemTime::now() - Duration::from_secs(60 * 60 * 24 * 30);
        filetime::set_file_mtime(&source, FileTime::from_system_time(past)).unwrap();

        FileOperations::new().copy_file(&source, &dest).unwrap();

        let source_mtime = FileTime::from_last_modification_time(&fs::metadata(&source).unwrap());
        let dest_mtime = FileTime::from_last_modification_time(&fs::metadata(&dest).unwrap());
        assert_eq!(source_mtime.unix_seconds(), dest_mtime.unix_seconds());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_keeps_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let script = dir.path().join("run.sh");
        let notes = dir.path().join("a.txt");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::write(&notes, "notes").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        fs::set_permissions(&notes, fs::Permissions::from_mode(0o644)).unwrap();

        let ops = FileOperations::new();
        let out = dir.path().join("out");
        ops.copy_file(&script, &out.join("run.sh")).unwrap();
        ops.copy_file(&notes, &out.join("a.txt")).unwrap();

        let mode = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&out.join("run.sh")), 0o755);
        assert_eq!(mode(&out.join("a.txt")), 0o644);
    }

    #[test]
    fn test_copy_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = FileOperations::new().copy_file(&dir.path().join("missing"), &dir.path().join("out"));

        assert!(matches!(result, Err(MirrorError::Io(_))));
    }

    #[test]
    fn test_copy_rejects_directory_source() {
        let dir = TempDir::new().unwrap();
        let result = FileOperations::new().copy_file(dir.path(), &dir.path().join("out"));

        assert!(matches!(result, Err(MirrorError::InvalidPath { .. })));
    }
}
