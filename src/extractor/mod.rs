pub mod file_extractor;
pub mod run_report;

pub use file_extractor::FileOperations;
pub use run_report::{FailureKind, FailureRecord, RunSummary};
