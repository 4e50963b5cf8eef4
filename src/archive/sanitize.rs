use crate::config::ILLEGAL_NAME_CHARS;
use std::path::{Component, Path, PathBuf};

/// Turns an archive entry name into a path relative to the extraction folder.
///
/// Returns `None` when the entry is absolute or climbs out with `..`
/// (zip-slip). An entry made only of `.` components yields an empty path.
pub fn sanitize_entry_path(raw: &Path, placeholder: &str) -> Option<PathBuf> {
    let mut clean = PathBuf::new();

    for component in raw.components() {
        match component {
            Component::Normal(part) => {
                clean.push(replace_illegal_chars(&part.to_string_lossy(), placeholder));
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(clean)
}

pub fn replace_illegal_chars(name: &str, placeholder: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());

    for ch in name.chars() {
        if ILLEGAL_NAME_CHARS.contains(&ch) || ch.is_control() {
            sanitized.push_str(placeholder);
        } else {
            sanitized.push(ch);
        }
    }

    sanitized
}
