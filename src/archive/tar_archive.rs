use super::{create_entry_dir, sanitize_entry_path, write_entry};
use crate::error::ExtractError;
use std::io::Read;
use std::path::Path;

pub(super) fn extract<R: Read>(
    reader: R,
    archive: &Path,
    destination: &Path,
    placeholder: &str,
) -> Result<usize, ExtractError> {
    let mut tar = ::tar::Archive::new(reader);
    let entries = tar
        .entries()
        .map_err(|e| ExtractError::malformed(archive, e.to_string()))?;
    let mut written = 0usize;

    for entry in entries {
        let mut entry = entry.map_err(|e| ExtractError::malformed(archive, e.to_string()))?;
        let raw_path = entry
            .path()
            .map_err(|e| ExtractError::malformed(archive, e.to_string()))?
            .into_owned();

        let relative = sanitize_entry_path(&raw_path, placeholder).ok_or_else(|| {
            ExtractError::malformed(
                archive,
                format!("entry escapes the extraction folder: {}", raw_path.display()),
            )
        })?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = destination.join(&relative);
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            create_entry_dir(&target)?;
        } else if entry_type.is_file() {
            write_entry(&mut entry, archive, &target)?;
        } else {
            tracing::debug!(
                "Skipping {:?} entry {} in {}",
                entry_type,
                raw_path.display(),
                archive.display()
            );
            continue;
        }

        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn append_file(builder: &mut ::tar::Builder<Vec<u8>>, name: &str, data: &[u8]) {
        let mut header = ::tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data).unwrap();
    }

    #[test]
    fn test_extracts_nested_entries() {
        let mut builder = ::tar::Builder::new(Vec::new());
        append_file(&mut builder, "docs/readme.md", b"# hi");
        append_file(&mut builder, "top.txt", b"top");
        let bytes = builder.into_inner().unwrap();

        let dest = TempDir::new().unwrap();
        let count = extract(Cursor::new(bytes), Path::new("b.tar"), dest.path(), "-").unwrap();

        assert_eq!(count, 2);
        assert_eq!(fs::read(dest.path().join("docs").join("readme.md")).unwrap(), b"# hi");
        assert_eq!(fs::read(dest.path().join("top.txt")).unwrap(), b"top");
    }

    #[test]
    fn test_symlinks_are_skipped() {
        let mut builder = ::tar::Builder::new(Vec::new());
        let mut header = ::tar::Header::new_gnu();
        header.set_entry_type(::tar::EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        builder
            .append_link(&mut header, "link", "/etc/passwd")
            .unwrap();
        append_file(&mut builder, "real.txt", b"real");
        let bytes = builder.into_inner().unwrap();

        let dest = TempDir::new().unwrap();
        let count = extract(Cursor::new(bytes), Path::new("l.tar"), dest.path(), "-").unwrap();

        assert_eq!(count, 1);
        assert!(!dest.path().join("link").exists());
        assert!(dest.path().join("real.txt").exists());
    }

    #[test]
    fn test_truncated_stream_keeps_earlier_entries() {
        let mut builder = ::tar::Builder::new(Vec::new());
        append_file(&mut builder, "first.txt", b"first");
        append_file(&mut builder, "second.txt", &[7u8; 4096]);
        let mut bytes = builder.into_inner().unwrap();
        // Cut into the data of the second entry.
        bytes.truncate(512 + 512 + 512 + 100);

        let dest = TempDir::new().unwrap();
        let result = extract(Cursor::new(bytes), Path::new("t.tar"), dest.path(), "-");

        assert!(matches!(result, Err(ExtractError::MalformedArchive { .. })));
        assert_eq!(fs::read(dest.path().join("first.txt")).unwrap(), b"first");
    }
}
