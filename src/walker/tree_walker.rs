use crate::archive::{ArchiveFormat, ArchiveProbe};
use crate::config::{Config, ExtractConfig, WalkConfig};
use crate::error::{MirrorError, Result};
use crate::extractor::{FileOperations, RunSummary};
use crate::ui::progress::update_walk_progress;
use crate::ui::GracefulShutdown;
use crate::walker::path_mapper::PathMapper;
use crate::walker::stats::ExtensionTally;
use chrono::Utc;
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::{DirEntry, WalkDir};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Roots of one walk, resolved once up front.
struct WalkRoots {
    source: PathBuf,
    destination: PathBuf,
    /// Destination root when it lies inside the source tree.
    skip: Option<PathBuf>,
}

/// Depth-first mirror of a source tree.
///
/// Ordinary files are copied; archives are expanded into an extraction
/// folder next to where the copy would have gone, and archives found in that
/// output are expanded in turn. A failure on one entry is recorded in the
/// summary and the walk moves on; only cancellation stops it.
pub struct TreeWalker<P: ArchiveProbe> {
    probe: P,
    mapper: PathMapper,
    file_ops: FileOperations,
    extract: ExtractConfig,
    walk: WalkConfig,
    shutdown: GracefulShutdown,
    progress: ProgressBar,
}

impl<P: ArchiveProbe> TreeWalker<P> {
    pub fn new(probe: P, config: &Config) -> Self {
        Self {
            probe,
            mapper: PathMapper::from_config(&config.extract),
            file_ops: FileOperations::from_config(&config.extract),
            extract: config.extract.clone(),
            walk: config.walk.clone(),
            shutdown: GracefulShutdown::detached(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: GracefulShutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Mirrors `source_root` into `dest_root`.
    ///
    /// Fails before writing anything when the source is missing or is not a
    /// directory. Per-entry failures end up in [`RunSummary::failures`].
    pub fn walk(&self, source_root: &Path, dest_root: &Path) -> Result<RunSummary> {
        let started_at = Utc::now();
        let start = Instant::now();

        let roots = self.resolve_roots(source_root, dest_root)?;
        tracing::info!(
            "Mirroring {} into {}",
            roots.source.display(),
            roots.destination.display()
        );

        let mut summary = self.run_walk(&roots)?;

        summary.source = roots.source;
        summary.destination = roots.destination;
        summary.started_at = started_at;
        summary.duration = start.elapsed();

        tracing::info!(
            "Done: {} files copied, {} archives extracted, {} failures",
            summary.files_copied,
            summary.total_archives(),
            summary.failures.len()
        );

        Ok(summary)
    }

    #[cfg(not(feature = "parallel"))]
    fn run_walk(&self, roots: &WalkRoots) -> Result<RunSummary> {
        self.visit_directory(roots, &roots.source)
    }

    #[cfg(feature = "parallel")]
    fn run_walk(&self, roots: &WalkRoots) -> Result<RunSummary> {
        let jobs = if self.walk.jobs == 0 {
            num_cpus::get()
        } else {
            self.walk.jobs
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| MirrorError::Config {
                message: format!("Failed to start {} worker threads: {}", jobs, e),
            })?;

        pool.install(|| self.visit_directory(roots, &roots.source))
    }

    fn resolve_roots(&self, source_root: &Path, dest_root: &Path) -> Result<WalkRoots> {
        if !source_root.exists() {
            return Err(MirrorError::SourceNotFound {
                path: source_root.display().to_string(),
            });
        }
        if !source_root.is_dir() {
            return Err(MirrorError::SourceNotDirectory {
                path: source_root.display().to_string(),
            });
        }

        let source = source_root.canonicalize()?;
        fs::create_dir_all(dest_root)?;
        let destination = dest_root.canonicalize()?;

        if destination == source {
            return Err(MirrorError::InvalidPath {
                path: format!(
                    "Target folder is the source folder: {}",
                    destination.display()
                ),
            });
        }

        let skip = if destination.starts_with(&source) {
            if self.walk.skip_destination_inside_source {
                tracing::warn!(
                    "Target folder {} is inside the source folder and will not be walked",
                    destination.display()
                );
                Some(destination.clone())
            } else {
                None
            }
        } else {
            None
        };

        Ok(WalkRoots {
            source,
            destination,
            skip,
        })
    }

    fn visit_directory(&self, roots: &WalkRoots, dir: &Path) -> Result<RunSummary> {
        self.shutdown.check_shutdown()?;
        let mut summary = RunSummary::new();

        let destination = match self.mapper.mirror(&roots.source, &roots.destination, dir) {
            Ok(destination) => destination,
            Err(e) => {
                self.record(&mut summary, dir, e);
                return Ok(summary);
            }
        };

        let children = self.list_children(dir, &mut summary);
        tracing::info!("In folder: {}, entries: {}", dir.display(), children.len());

        if !destination.is_dir() {
            if let Err(e) = fs::create_dir_all(&destination) {
                self.record(&mut summary, &destination, e.into());
                return Ok(summary);
            }
            tracing::debug!("Folder {} created", destination.display());
        }
        summary.directories_visited += 1;

        let mut files = Vec::new();
        let mut subdirs = Vec::new();
        for entry in children {
            let path = entry.into_path();
            if roots.skip.as_deref() == Some(path.as_path()) {
                continue;
            }
            match classify(&path) {
                EntryKind::File => files.push(path),
                EntryKind::Directory => subdirs.push(path),
                EntryKind::Other(reason) => {
                    tracing::warn!("Skipping {}: {}", path.display(), reason);
                }
            }
        }

        let mut tally = ExtensionTally::new();
        for file in &files {
            self.shutdown.check_shutdown()?;
            update_walk_progress(&self.progress, file);
            tally.tally_file(file);
            self.dispatch_file(roots, file, &mut summary)?;
        }
        summary.merge_extensions(tally.flush_and_reset(dir));

        self.visit_subdirectories(roots, &subdirs, &mut summary)?;

        Ok(summary)
    }

    #[cfg(not(feature = "parallel"))]
    fn visit_subdirectories(
        &self,
        roots: &WalkRoots,
        subdirs: &[PathBuf],
        summary: &mut RunSummary,
    ) -> Result<()> {
        for subdir in subdirs {
            summary.merge(self.visit_directory(roots, subdir)?);
        }
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn visit_subdirectories(
        &self,
        roots: &WalkRoots,
        subdirs: &[PathBuf],
        summary: &mut RunSummary,
    ) -> Result<()> {
        let results: Vec<Result<RunSummary>> = subdirs
            .par_iter()
            .map(|subdir| self.visit_directory(roots, subdir))
            .collect();

        for result in results {
            summary.merge(result?);
        }
        Ok(())
    }

    /// Direct children of `dir`, sorted by name. Unreadable entries are
    /// recorded as failures and left out.
    fn list_children(&self, dir: &Path, summary: &mut RunSummary) -> Vec<DirEntry> {
        let mut children = Vec::new();

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            match entry {
                Ok(entry) => children.push(entry),
                Err(err) => {
                    let path = err.path().unwrap_or(dir).to_path_buf();
                    let error = match err.into_io_error() {
                        Some(io) => MirrorError::Io(io),
                        None => MirrorError::InvalidPath {
                            path: format!("Filesystem loop at {}", path.display()),
                        },
                    };
                    self.record(summary, &path, error);
                }
            }
        }

        children
    }

    fn dispatch_file(&self, roots: &WalkRoots, file: &Path, summary: &mut RunSummary) -> Result<()> {
        let target = match self.mapper.mirror(&roots.source, &roots.destination, file) {
            Ok(target) => target,
            Err(e) => {
                self.record(summary, file, e);
                return Ok(());
            }
        };

        let format = match self.probe.detect(file) {
            Ok(format) => format,
            Err(e) => {
                self.record(summary, file, e.into());
                return Ok(());
            }
        };

        match format {
            None => match self.file_ops.copy_file(file, &target) {
                Ok(bytes) => {
                    tracing::debug!("Copied {} to {}", file.display(), target.display());
                    summary.files_copied += 1;
                    summary.bytes_copied += bytes;
                }
                Err(e) => self.record(summary, file, e),
            },
            Some(format) => {
                let dest_parent = target.parent().unwrap_or(roots.destination.as_path());
                self.expand_archive(file, format, dest_parent, 1, summary)?;
            }
        }

        Ok(())
    }

    /// Extracts `archive` into its extraction folder under `dest_parent`,
    /// then expands archives found in that folder.
    ///
    /// Returns whether this archive's own extraction succeeded; the caller
    /// deletes a nested archive file only in that case. `Err` is reserved
    /// for cancellation.
    fn expand_archive(
        &self,
        archive: &Path,
        format: ArchiveFormat,
        dest_parent: &Path,
        depth: usize,
        summary: &mut RunSummary,
    ) -> Result<bool> {
        self.shutdown.check_shutdown()?;

        if depth > self.extract.max_nesting_depth {
            let error = MirrorError::DepthExceeded {
                path: archive.display().to_string(),
                depth,
                max_depth: self.extract.max_nesting_depth,
            };
            self.record(summary, archive, error);
            return Ok(false);
        }

        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let folder = dest_parent.join(self.mapper.archive_extraction_name(&file_name));

        if let Err(e) = fs::create_dir_all(&folder) {
            self.record(summary, &folder, e.into());
            return Ok(false);
        }

        match self.probe.extract_as(archive, format, &folder) {
            Ok(entries) => {
                tracing::info!(
                    "Extracted: {} entries ({}) to {}",
                    entries,
                    format,
                    folder.display()
                );
                summary.entries_extracted += entries;
                if depth == 1 {
                    summary.archives_extracted += 1;
                } else {
                    summary.nested_archives_extracted += 1;
                }
            }
            Err(e) => {
                self.record(summary, archive, e.into());
                return Ok(false);
            }
        }

        for nested in self.nested_candidates(&folder) {
            self.shutdown.check_shutdown()?;

            let nested_format = match self.probe.detect(&nested) {
                Ok(Some(nested_format)) => nested_format,
                Ok(None) => continue,
                Err(e) => {
                    self.record(summary, &nested, e.into());
                    continue;
                }
            };

            let nested_parent = nested.parent().unwrap_or(folder.as_path()).to_path_buf();
            if self.expand_archive(&nested, nested_format, &nested_parent, depth + 1, summary)? {
                match fs::remove_file(&nested) {
                    Ok(()) => tracing::debug!("Removed nested archive {}", nested.display()),
                    Err(e) => self.record(summary, &nested, e.into()),
                }
            } else {
                tracing::warn!("Keeping nested archive {} after failed expansion", nested.display());
            }
        }

        Ok(true)
    }

    /// Files to probe after an extraction. Collected before any of them is
    /// expanded, so folders created by nested extractions are not rescanned.
    fn nested_candidates(&self, folder: &Path) -> Vec<PathBuf> {
        let max_depth = if self.extract.deep_nested_scan {
            usize::MAX
        } else {
            1
        };

        WalkDir::new(folder)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!("Skipping unreadable extracted entry: {}", err);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(DirEntry::into_path)
            .collect()
    }

    fn record(&self, summary: &mut RunSummary, path: &Path, error: MirrorError) {
        tracing::error!("{}: {}", path.display(), error);
        summary.record_failure(path, &error);
    }
}

enum EntryKind {
    File,
    Directory,
    Other(&'static str),
}

/// Regular files and directories are walked. A symlink to a file is copied
/// through; a symlinked directory is never followed.
fn classify(path: &Path) -> EntryKind {
    let link_metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => return EntryKind::Other("metadata unavailable"),
    };

    let file_type = link_metadata.file_type();
    if file_type.is_dir() {
        return EntryKind::Directory;
    }
    if file_type.is_file() {
        return EntryKind::File;
    }
    if file_type.is_symlink() {
        return match fs::metadata(path) {
            Ok(target) if target.is_file() => EntryKind::File,
            Ok(target) if target.is_dir() => EntryKind::Other("symlinked folders are not followed"),
            Ok(_) => EntryKind::Other("symlink to a special file"),
            Err(_) => EntryKind::Other("broken symlink"),
        };
    }

    EntryKind::Other("not a regular file")
}
