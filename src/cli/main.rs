use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser, Debug)]
#[clap(
    name = "lumina",
    version,
    about = "Note and file workspace with AI summaries"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Directory holding the workspace data
    #[clap(long, value_parser)]
    pub data_dir: Option<PathBuf>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the lumina application
    #[clap(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_and_subcommand() {
        let cli = Cli::try_parse_from([
            "lumina",
            "--data-dir",
            "/tmp/ws",
            "-v",
            "list",
            "--favorites",
            "--search",
            "alpha",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/ws")));
        assert!(cli.verbose);
        match cli.command {
            Commands::List {
                favorites, search, ..
            } => {
                assert!(favorites);
                assert_eq!(search.as_deref(), Some("alpha"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn upload_takes_a_path_and_optional_mime() {
        let cli = Cli::try_parse_from(["lumina", "upload", "chart.png", "--mime", "image/png"])
            .unwrap();
        match cli.command {
            Commands::Upload { path, mime } => {
                assert_eq!(path, PathBuf::from("chart.png"));
                assert_eq!(mime.as_deref(), Some("image/png"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
