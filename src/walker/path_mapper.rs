use crate::config::ExtractConfig;
use crate::error::{MirrorError, Result};
use std::path::{Component, Path, PathBuf};

/// Naming rules shared by every part of the walk.
///
/// Both operations are pure: they never touch the filesystem, so the same
/// inputs always produce the same destination names.
#[derive(Debug, Clone)]
pub struct PathMapper {
    synthetic_suffix: String,
}

impl PathMapper {
    pub fn new<S: Into<String>>(synthetic_suffix: S) -> Self {
        Self {
            synthetic_suffix: synthetic_suffix.into(),
        }
    }

    pub fn from_config(config: &ExtractConfig) -> Self {
        Self::new(config.synthetic_suffix.clone())
    }

    /// `dest_root + (source_path - source_root)`.
    pub fn mirror(&self, source_root: &Path, dest_root: &Path, source_path: &Path) -> Result<PathBuf> {
        let relative = source_path
            .strip_prefix(source_root)
            .map_err(|_| MirrorError::InvalidPath {
                path: format!(
                    "{} is not inside {}",
                    source_path.display(),
                    source_root.display()
                ),
            })?;

        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(MirrorError::InvalidPath {
                path: format!("Path escapes the source folder: {}", source_path.display()),
            });
        }

        Ok(dest_root.join(relative))
    }

    /// Folder name for an archive's contents: the file name minus its last
    /// extension, or the file name plus the synthetic suffix when there is
    /// no extension to strip.
    pub fn archive_extraction_name(&self, archive_file_name: &str) -> String {
        let stem = Path::new(archive_file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| archive_file_name.to_string());

        if stem == archive_file_name || stem.is_empty() {
            format!("{}{}", archive_file_name, self.synthetic_suffix)
        } else {
            stem
        }
    }
}

impl Default for PathMapper {
    fn default() -> Self {
        Self::from_config(&ExtractConfig::default())
    }
}
