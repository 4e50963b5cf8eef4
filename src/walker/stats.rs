use std::collections::BTreeMap;
use std::path::Path;

/// Per-directory count of file extensions.
///
/// One tally belongs to one directory frame. It is flushed when the walk is
/// done with that directory's files, and the snapshot is handed back to the
/// caller instead of being kept in shared state.
#[derive(Debug, Default)]
pub struct ExtensionTally {
    counts: BTreeMap<String, usize>,
}

impl ExtensionTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tally(&mut self, extension: &str) {
        *self.counts.entry(extension.to_string()).or_insert(0) += 1;
    }

    pub fn tally_file(&mut self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.tally(&extension_of(&name));
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Logs the accumulated counts for `directory`, returns them and starts
    /// over with an empty tally.
    pub fn flush_and_reset(&mut self, directory: &Path) -> BTreeMap<String, usize> {
        let snapshot = std::mem::take(&mut self.counts);

        if !snapshot.is_empty() {
            let rendered: Vec<String> = snapshot
                .iter()
                .map(|(ext, count)| {
                    let label = if ext.is_empty() { "(none)" } else { ext.as_str() };
                    format!("{}={}", label, count)
                })
                .collect();
            tracing::info!(
                "Extensions in {}: {}",
                directory.display(),
                rendered.join(", ")
            );
        }

        snapshot
    }
}

/// Text after the last `.` of a file name, lower-cased; empty when there is
/// no dot.
pub fn extension_of(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(index) => file_name[index + 1..].to_lowercase(),
        None => String::new(),
    }
}
