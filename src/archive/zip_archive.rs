use super::{create_entry_dir, sanitize_entry_path, write_entry};
use crate::error::ExtractError;
use ::zip::result::ZipError;
use ::zip::ZipArchive;
use std::io::{Read, Seek};
use std::path::Path;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

fn zip_error(archive: &Path, error: ZipError) -> ExtractError {
    match error {
        ZipError::Io(e) => ExtractError::io(archive, e),
        other => ExtractError::malformed(archive, other.to_string()),
    }
}

pub(super) fn extract<R: Read + Seek>(
    reader: R,
    archive: &Path,
    destination: &Path,
    placeholder: &str,
) -> Result<usize, ExtractError> {
    let mut zip = ZipArchive::new(reader).map_err(|e| zip_error(archive, e))?;
    let mut written = 0usize;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| zip_error(archive, e))?;
        let raw_name = entry.name().to_string();

        let relative = sanitize_entry_path(Path::new(&raw_name), placeholder).ok_or_else(|| {
            ExtractError::malformed(
                archive,
                format!("entry escapes the extraction folder: {}", raw_name),
            )
        })?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = destination.join(&relative);

        if entry.is_dir() {
            create_entry_dir(&target)?;
        } else if entry
            .unix_mode()
            .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
        {
            tracing::debug!("Skipping symlink entry {} in {}", raw_name, archive.display());
            continue;
        } else {
            write_entry(&mut entry, archive, &target)?;
        }

        written += 1;
    }

    Ok(written)
}
