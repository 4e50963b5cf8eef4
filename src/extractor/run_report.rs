use crate::error::{ExtractError, MirrorError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Outcome of one walk.
///
/// Every directory frame builds its own summary and hands it to its parent,
/// which folds it in with [`RunSummary::merge`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub files_copied: usize,
    pub bytes_copied: u64,
    /// Archives found directly in the source tree.
    pub archives_extracted: usize,
    /// Archives found inside extracted output.
    pub nested_archives_extracted: usize,
    pub entries_extracted: usize,
    pub directories_visited: usize,
    pub files_by_extension: BTreeMap<String, usize>,
    pub failures: Vec<FailureRecord>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    IoFailure,
    MalformedArchive,
    UnsupportedFormat,
    DepthExceeded,
    InvalidPath,
}

impl FailureRecord {
    pub fn new<P: Into<PathBuf>>(path: P, error: &MirrorError) -> Self {
        Self {
            path: path.into(),
            kind: FailureKind::of(error),
            message: error.to_string(),
        }
    }
}

impl FailureKind {
    pub fn of(error: &MirrorError) -> Self {
        match error {
            MirrorError::Extract(ExtractError::MalformedArchive { .. }) => {
                FailureKind::MalformedArchive
            }
            MirrorError::Extract(ExtractError::UnsupportedFormat { .. }) => {
                FailureKind::UnsupportedFormat
            }
            MirrorError::DepthExceeded { .. } => FailureKind::DepthExceeded,
            MirrorError::InvalidPath { .. } => FailureKind::InvalidPath,
            _ => FailureKind::IoFailure,
        }
    }
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: RunSummary) {
        self.files_copied += other.files_copied;
        self.bytes_copied += other.bytes_copied;
        self.archives_extracted += other.archives_extracted;
        self.nested_archives_extracted += other.nested_archives_extracted;
        self.entries_extracted += other.entries_extracted;
        self.directories_visited += other.directories_visited;
        self.merge_extensions(other.files_by_extension);
        self.failures.extend(other.failures);
    }

    pub fn merge_extensions(&mut self, counts: BTreeMap<String, usize>) {
        for (extension, count) in counts {
            *self.files_by_extension.entry(extension).or_insert(0) += count;
        }
    }

    pub fn record_failure<P: Into<PathBuf>>(&mut self, path: P, error: &MirrorError) {
        self.failures.push(FailureRecord::new(path, error));
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn total_archives(&self) -> usize {
        self.archives_extracted + self.nested_archives_extracted
    }

    pub fn save_report_json(&self, path: &Path) -> Result<()> {
        let json_content = serde_json::to_string_pretty(self).map_err(|e| MirrorError::Config {
            message: format!("Failed to serialize report to JSON: {}", e),
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json_content)?;

        Ok(())
    }
}
