//! CLI for the dl downloader.

mod commands;
mod progress;
mod signal;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dl_core::config;
use std::path::PathBuf;

use commands::{run_completions, run_config, run_download, run_version};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// 128 + SIGINT.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Top-level CLI: `dl --url <URL>` downloads; subcommands manage settings.
#[derive(Debug, Parser)]
#[command(name = "dl", version)]
#[command(about = "dl: command-line file downloader with concurrent ranged requests", long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(flatten)]
    pub download: DownloadArgs,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Address of the file to download, e.g. https://example.com/foo.jpg
    #[arg(short = 'u', long, required = true)]
    pub url: Option<String>,

    /// Destination file name with extension, e.g. foo.jpg
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Destination directory ("." for the current directory); disables subfolders.
    #[arg(short = 'p', long)]
    pub path: Option<PathBuf>,

    /// Number of concurrent range requests (default from config, 5).
    #[arg(short = 'c', long = "concurrent", value_name = "N")]
    pub concurrent: Option<usize>,

    /// Print every recorded error and log at debug level.
    #[arg(short = 'd', long)]
    pub debug: bool,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Set configuration values.
    Config(ConfigArgs),

    /// Print shell completions to stdout.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Display application version.
    Version,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Default destination directory ("." for the current directory).
    #[arg(short = 'p', long)]
    pub path: Option<PathBuf>,

    /// Subfolder mapping as label:.ext1,.ext2, e.g. video:.mp4,.mkv
    #[arg(short = 's', long = "subpath", value_name = "MAP")]
    pub subpath: Option<String>,

    /// Default number of concurrent range requests.
    #[arg(short = 'c', long = "concurrent", value_name = "N")]
    pub concurrent: Option<usize>,

    /// Enable or disable auto-update, e.g. -a true
    #[arg(short = 'a', long = "auto-update", value_name = "BOOL")]
    pub auto_update: Option<bool>,

    /// Print the resulting configuration.
    #[arg(short = 'd', long)]
    pub debug: bool,
}

impl Cli {
    pub fn verbose(&self) -> bool {
        match &self.command {
            Some(CliCommand::Config(args)) => args.debug,
            Some(_) => false,
            None => self.download.debug,
        }
    }

    /// Dispatches and returns the process exit code.
    pub async fn run(self) -> Result<i32> {
        let cwd = std::env::current_dir().context("failed to determine current directory")?;

        match self.command {
            Some(CliCommand::Config(args)) => {
                let path = config::config_path()?;
                if let Some(rendered) = run_config(&args, &path, &cwd)? {
                    println!("{}", rendered);
                }
            }
            Some(CliCommand::Completions { shell }) => run_completions(shell),
            Some(CliCommand::Version) => run_version(),
            None => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                return run_download(&self.download, &cfg, &cwd).await;
            }
        }
        Ok(EXIT_OK)
    }
}

#[cfg(test)]
mod tests;
