use crate::error::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "ARCHIVE_MIRROR_CONFIG";

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["archive-mirror.toml", ".archive-mirror.toml"];

/// Characters replaced in archive entry names before they touch the disk.
pub const ILLEGAL_NAME_CHARS: [char; 7] = ['<', '>', ':', '"', '|', '?', '*'];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub extract: ExtractConfig,
    pub walk: WalkConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Appended to the extraction folder name of an archive without extension.
    pub synthetic_suffix: String,
    /// Replacement for characters that are illegal in file names.
    pub placeholder: String,
    pub max_nesting_depth: usize,
    /// Look for nested archives in every subdirectory of an extraction
    /// folder instead of only its top level.
    pub deep_nested_scan: bool,
    pub preserve_mtime: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalkConfig {
    pub skip_destination_inside_source: bool,
    /// Worker threads for the `parallel` feature, 0 means one per CPU.
    pub jobs: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: String,
    pub verbose: u8,
    pub quiet: bool,
    pub show_progress: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_file: Option<PathBuf>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            synthetic_suffix: ".zip".to_string(),
            placeholder: "-".to_string(),
            max_nesting_depth: 16,
            deep_nested_scan: false,
            preserve_mtime: true,
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            skip_destination_inside_source: true,
            jobs: 0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "human".to_string(),
            verbose: 0,
            quiet: false,
            show_progress: false,
            report_file: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(MirrorError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| MirrorError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| MirrorError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                for default_path in &DEFAULT_CONFIG_PATHS {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    /// Loads from `$ARCHIVE_MIRROR_CONFIG` when set, otherwise from the
    /// default locations in the working directory.
    pub fn load_from_env() -> Result<Self> {
        let explicit = std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::load_with_defaults(explicit)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| MirrorError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| MirrorError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let suffix = &self.extract.synthetic_suffix;
        if suffix.len() < 2 || !suffix.starts_with('.') {
            return Err(MirrorError::Config {
                message: format!(
                    "Synthetic suffix must start with '.' and name an extension, got {:?}",
                    suffix
                ),
            });
        }
        if suffix.contains(['/', '\\']) || suffix.contains(ILLEGAL_NAME_CHARS) {
            return Err(MirrorError::Config {
                message: format!("Synthetic suffix contains illegal characters: {:?}", suffix),
            });
        }

        let placeholder = &self.extract.placeholder;
        if placeholder.is_empty()
            || placeholder.contains(['/', '\\'])
            || placeholder.contains(ILLEGAL_NAME_CHARS)
            || placeholder.chars().any(char::is_control)
        {
            return Err(MirrorError::Config {
                message: format!(
                    "Placeholder must be a non-empty, filesystem-safe string, got {:?}",
                    placeholder
                ),
            });
        }

        if self.extract.max_nesting_depth == 0 {
            return Err(MirrorError::Config {
                message: "Maximum archive nesting depth must be greater than 0".to_string(),
            });
        }

        if !matches!(
            self.output.format.to_lowercase().as_str(),
            "human" | "json" | "plain"
        ) {
            return Err(MirrorError::Config {
                message: format!(
                    "Unknown output format {:?} (expected human, json or plain)",
                    self.output.format
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.extract.synthetic_suffix, ".zip");
        assert_eq!(config.extract.placeholder, "-");
        assert_eq!(config.extract.max_nesting_depth, 16);
        assert!(!config.extract.deep_nested_scan);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.extract.synthetic_suffix = "zip".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.extract.placeholder = "?".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.extract.max_nesting_depth = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.format = "yaml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.extract.max_nesting_depth = 3;
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.extract.max_nesting_depth, 3);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[extract]\nsynthetic_suffix = \".unpacked\"\n").unwrap();
        assert_eq!(config.extract.synthetic_suffix, ".unpacked");
        assert_eq!(config.extract.placeholder, "-");
        assert_eq!(config.output.format, "human");
    }

    #[test]
    fn test_missing_config_file() {
        let result = Config::load_from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(MirrorError::Config { .. })));
    }

    #[test]
    fn test_serialized_config_sections() {
        let serialized = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(serialized.contains("[extract]"));
        assert!(serialized.contains("[walk]"));
        assert!(serialized.contains("[output]"));
        assert!(!serialized.contains("report_file"));
    }
}
