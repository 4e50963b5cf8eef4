pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod ui;
pub mod walker;

// Public API re-exports
pub use cli::Cli;
pub use config::{Config, ExtractConfig, OutputConfig, WalkConfig};
pub use error::{ExtractError, MirrorError, Result, UserFriendlyError};

// Core functionality re-exports
pub use archive::{ArchiveFormat, ArchiveProbe, DefaultProbe, TarCompression};
pub use extractor::{FailureKind, FailureRecord, FileOperations, RunSummary};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};
pub use walker::{ExtensionTally, PathMapper, TreeWalker};

use std::path::Path;

/// Main library interface: one configured mirror run at a time.
pub struct ArchiveMirror {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl ArchiveMirror {
    /// Create an instance that stops cleanly on Ctrl+C.
    pub fn new(config: Config) -> Result<Self> {
        let shutdown = GracefulShutdown::new()?;
        Ok(Self::with_shutdown(config, shutdown))
    }

    /// Create an instance without installing a signal handler.
    pub fn without_signal_handler(config: Config) -> Self {
        Self::with_shutdown(config, GracefulShutdown::detached())
    }

    fn with_shutdown(config: Config, shutdown: GracefulShutdown) -> Self {
        let output = &config.output;
        let output_formatter = OutputFormatter::new(
            OutputMode::from_string(&output.format),
            output.verbose,
            output.quiet,
        );
        let progress_manager = ProgressManager::new(output.show_progress && !output.quiet);

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        }
    }

    /// Mirror `source` into `target`.
    ///
    /// Returns `Err` only for problems that stop the whole run: a missing
    /// source, an unusable target, or cancellation. Failures on single
    /// entries are in the returned summary.
    pub fn run(&self, source: &Path, target: &Path) -> Result<RunSummary> {
        self.shutdown.check_shutdown()?;

        self.output_formatter.start_operation(&format!(
            "Mirroring {} into {}",
            source.display(),
            target.display()
        ));

        let spinner = self.progress_manager.create_walk_spinner("Walking source folder");
        let walker = TreeWalker::new(DefaultProbe::from_config(&self.config.extract), &self.config)
            .with_shutdown(self.shutdown.clone())
            .with_progress(spinner.clone());

        let result = walker.walk(source, target);
        match &result {
            Ok(summary) => ui::progress::finish_progress_with_summary(
                &spinner,
                &format!("Processed {} entries", spinner.position()),
                summary.duration,
            ),
            Err(_) => spinner.abandon(),
        }
        self.progress_manager.clear();
        let summary = result?;

        // The walk already happened; a report that cannot be written does
        // not change the outcome.
        if let Some(report_file) = &self.config.output.report_file {
            match summary.save_report_json(report_file) {
                Ok(()) => self
                    .output_formatter
                    .info(&format!("Report written to {}", report_file.display())),
                Err(e) => {
                    tracing::warn!("Could not write report {}: {}", report_file.display(), e);
                    self.output_formatter.warning(&format!(
                        "Report could not be written to {}: {}",
                        report_file.display(),
                        e.user_message()
                    ));
                }
            }
        }

        self.progress_manager
            .suspend(|| self.output_formatter.print_run_summary(&summary));

        if summary.has_failures() {
            self.output_formatter.warning(&format!(
                "{} entries could not be mirrored",
                summary.failures.len()
            ));
        } else {
            self.output_formatter.success("All entries mirrored");
        }

        Ok(summary)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &MirrorError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Mirror a tree with default settings and no console output.
pub fn mirror_tree(source: &Path, target: &Path) -> Result<RunSummary> {
    let mut config = Config::default();
    config.output.quiet = true;

    ArchiveMirror::without_signal_handler(config).run(source, target)
}

pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.output.quiet = true;
        config
    }

    #[test]
    fn test_instance_starts_running() {
        let mirror = ArchiveMirror::without_signal_handler(quiet_config());
        assert!(mirror.is_running());
        assert_eq!(mirror.config().extract.synthetic_suffix, ".zip");
        assert_eq!(mirror.output_formatter().mode(), OutputMode::Human);
    }

    #[test]
    fn test_shutdown_handling() {
        let dir = TempDir::new().unwrap();
        let mirror = ArchiveMirror::without_signal_handler(quiet_config());

        mirror.request_shutdown();
        assert!(!mirror.is_running());

        let result = mirror.run(dir.path(), &dir.path().join("out"));
        assert!(matches!(result, Err(MirrorError::Cancelled)));
    }

    #[test]
    fn test_run_writes_report_file() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        std::fs::write(src.path().join("a.txt"), "a").unwrap();
        let report = dst.path().join("report.json");

        let mut config = quiet_config();
        config.output.report_file = Some(report.clone());
        let summary = ArchiveMirror::without_signal_handler(config)
            .run(src.path(), &dst.path().join("mirror"))
            .unwrap();

        assert_eq!(summary.files_copied, 1);
        let content = std::fs::read_to_string(report).unwrap();
        assert!(content.contains("\"files_copied\": 1"));
    }

    #[test]
    fn test_unwritable_report_keeps_summary() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        std::fs::write(src.path().join("a.txt"), "a").unwrap();
        let blocker = dst.path().join("not-a-folder");
        std::fs::write(&blocker, "file").unwrap();

        let mut config = quiet_config();
        config.output.report_file = Some(blocker.join("report.json"));
        let summary = ArchiveMirror::without_signal_handler(config)
            .run(src.path(), &dst.path().join("mirror"))
            .unwrap();

        assert_eq!(summary.files_copied, 1);
        assert!(!summary.has_failures());
        assert!(dst.path().join("mirror").join("a.txt").exists());
    }

    #[test]
    fn test_mirror_tree_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = mirror_tree(&dir.path().join("absent"), &dir.path().join("out"));
        assert!(matches!(result, Err(MirrorError::SourceNotFound { .. })));
    }

    #[test]
    fn test_version_info() {
        assert!(!version_info().is_empty());
    }
}
