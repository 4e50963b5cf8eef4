use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Source folder does not exist: {path}")]
    SourceNotFound { path: String },

    #[error("Source is not a directory: {path}")]
    SourceNotDirectory { path: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Archive nesting depth {depth} exceeds the limit of {max_depth}: {path}")]
    DepthExceeded {
        path: String,
        depth: usize,
        max_depth: usize,
    },

    #[error("Operation was cancelled by user")]
    Cancelled,
}

/// Failure while expanding a single archive.
///
/// Extraction is not transactional: entries written before the failure are
/// left on disk.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO failure on {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed archive {path}: {message}")]
    MalformedArchive { path: PathBuf, message: String },

    #[error("Unsupported archive format: {path}")]
    UnsupportedFormat { path: PathBuf },
}

impl ExtractError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExtractError::IoFailure {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ExtractError::MalformedArchive {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for MirrorError {
    fn user_message(&self) -> String {
        match self {
            MirrorError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            MirrorError::SourceNotFound { path } => {
                format!("Source folder: {} doesn't exist", path)
            }
            MirrorError::SourceNotDirectory { path } => {
                format!("Source path is not a folder: {}", path)
            }
            MirrorError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            MirrorError::Extract(ExtractError::MalformedArchive { path, message }) => {
                format!("Could not read archive {}: {}", path.display(), message)
            }
            MirrorError::DepthExceeded { path, max_depth, .. } => {
                format!(
                    "Archive {} is nested more than {} levels deep",
                    path, max_depth
                )
            }
            MirrorError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            MirrorError::Config { .. } => Some(
                "Check your archive-mirror.toml syntax, or unset ARCHIVE_MIRROR_CONFIG to use the defaults.".to_string()
            ),
            MirrorError::SourceNotFound { .. } | MirrorError::SourceNotDirectory { .. } => Some(
                "Pass an existing folder as the first argument: archive-mirror <source_folder> <target_folder>".to_string()
            ),
            MirrorError::DepthExceeded { .. } => Some(
                "Raise extract.max_nesting_depth in archive-mirror.toml if this nesting is expected.".to_string()
            ),
            MirrorError::Io(_) => Some(
                "Ensure you have read access to the source and write access to the target folder.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for MirrorError {
    fn from(error: toml::de::Error) -> Self {
        MirrorError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
