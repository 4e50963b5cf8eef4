use crate::config::Config;
use crate::error::Result;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "archive-mirror")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mirror a folder tree, extracting archives instead of copying them")]
#[command(
    long_about = "archive-mirror copies every file under SOURCE_FOLDER into TARGET_FOLDER, \
                  keeping the folder structure. Zip, tar and tar.gz archives are extracted \
                  into a folder named after the archive, and archives found inside them are \
                  extracted as well."
)]
#[command(after_help = "EXAMPLES:\n  \
    archive-mirror ./downloads ./unpacked\n  \
    ARCHIVE_MIRROR_CONFIG=mirror.toml archive-mirror /data/in /data/out\n\n\
    Settings are read from $ARCHIVE_MIRROR_CONFIG, ./archive-mirror.toml or ./.archive-mirror.toml.")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Folder holding the files and archives to mirror
    pub source_folder: PathBuf,

    /// Folder receiving the copies and extracted archives
    pub target_folder: PathBuf,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let config = Config::load_from_env()?;
        config.validate()?;
        Ok(config)
    }
}

/// One-line usage string, printed when an argument is missing.
pub fn usage() -> String {
    Cli::command().render_usage().to_string()
}
