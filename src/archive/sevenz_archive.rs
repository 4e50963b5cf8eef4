use super::{create_entry_dir, sanitize_entry_path, write_entry};
use crate::error::ExtractError;
use sevenz_rust::{Password, SevenZReader};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

pub(super) fn extract<R: Read + Seek>(
    mut reader: R,
    archive: &Path,
    destination: &Path,
    placeholder: &str,
) -> Result<usize, ExtractError> {
    let len = reader
        .seek(SeekFrom::End(0))
        .map_err(|e| ExtractError::io(archive, e))?;
    reader.rewind().map_err(|e| ExtractError::io(archive, e))?;

    let mut reader = SevenZReader::new(reader, len, Password::empty())
        .map_err(|e| ExtractError::malformed(archive, e.to_string()))?;

    let mut written = 0usize;
    let mut failure: Option<ExtractError> = None;

    let outcome = reader.for_each_entries(|entry, data| {
        let raw_name = entry.name().to_string();

        if entry.is_anti_item() {
            io::copy(data, &mut io::sink())?;
            return Ok(true);
        }

        let relative = match sanitize_entry_path(Path::new(&raw_name), placeholder) {
            Some(relative) => relative,
            None => {
                failure = Some(ExtractError::malformed(
                    archive,
                    format!("entry escapes the extraction folder: {}", raw_name),
                ));
                return Ok(false);
            }
        };
        if relative.as_os_str().is_empty() {
            io::copy(data, &mut io::sink())?;
            return Ok(true);
        }

        let target = destination.join(&relative);
        let result = if entry.is_directory() {
            create_entry_dir(&target)
        } else {
            write_entry(data, archive, &target).map(|_| ())
        };

        match result {
            Ok(()) => {
                written += 1;
                Ok(true)
            }
            Err(e) => {
                failure = Some(e);
                Ok(false)
            }
        }
    });

    if let Some(error) = failure {
        return Err(error);
    }
    outcome.map_err(|e| ExtractError::malformed(archive, e.to_string()))?;

    Ok(written)
}
