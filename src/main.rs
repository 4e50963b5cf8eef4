use anyhow::Context;
use archive_mirror::{cli, ArchiveMirror, Cli, MirrorError, OutputFormatter, OutputMode};
use clap::error::ErrorKind;
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::MissingRequiredArgument
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) =>
        {
            print_usage();
            return 0;
        }
        Err(e) => e.exit(),
    };

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            print_startup_error(&e);
            return exit_code(&e);
        }
    };

    if let Err(e) = setup_logging(config.output.verbose, config.output.quiet) {
        eprintln!("Warning: {:#}", e);
    }
    tracing::debug!("Effective configuration: {:?}", config);

    let mirror = match ArchiveMirror::new(config) {
        Ok(mirror) => mirror,
        Err(e) => {
            print_startup_error(&e);
            return exit_code(&e);
        }
    };

    match mirror.run(&cli.source_folder, &cli.target_folder) {
        Ok(summary) => {
            if summary.has_failures() {
                2 // Completed, some entries failed
            } else {
                0
            }
        }
        Err(e) => {
            mirror.handle_error(&e);
            exit_code(&e)
        }
    }
}

fn exit_code(error: &MirrorError) -> i32 {
    match error {
        MirrorError::Cancelled => 130, // Interrupted (SIGINT)
        MirrorError::SourceNotFound { .. } | MirrorError::SourceNotDirectory { .. } => 3,
        _ => 1,
    }
}

fn print_usage() {
    eprintln!(
        "Please pass the source folder as the first argument and the target folder \
         for the mirrored and extracted files as the second argument"
    );
    eprintln!("{}", cli::usage());
}

fn print_startup_error(error: &MirrorError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

fn setup_logging(verbose: u8, quiet: bool) -> anyhow::Result<()> {
    let default_directive = if quiet {
        "archive_mirror=warn"
    } else if verbose > 0 {
        "archive_mirror=debug"
    } else {
        "archive_mirror=info"
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .context("invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&MirrorError::Cancelled), 130);
        assert_eq!(
            exit_code(&MirrorError::SourceNotFound {
                path: "/missing".to_string()
            }),
            3
        );
        assert_eq!(
            exit_code(&MirrorError::Config {
                message: "bad".to_string()
            }),
            1
        );
    }
}
