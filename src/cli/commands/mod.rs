//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod download;
mod helpers;
mod query;
mod upload;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, ConfigOverrides, LoadOptions};

#[derive(Parser)]
#[command(name = "imap-data-access")]
#[command(about = "Query, download and upload IMAP data files on the Science Data Center")]
#[command(version)]
pub struct Cli {
    /// API key for uploads (overrides IMAP_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Local data directory; must already exist (overrides IMAP_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Data access service URL (overrides IMAP_DATA_ACCESS_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the archive for files matching the given filters
    Query(query::QueryArgs),

    /// Download a file into the local data directory
    Download {
        /// Filename or archive path of the file (e.g. imap_swe_l0_sci_20240105_v001.pkts)
        file_path: String,
    },

    /// Upload a local file to the archive
    Upload {
        /// Path to the local file; its name must follow the archive naming convention
        file_path: PathBuf,
    },
}

/// Logging level requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Verbose,
    Debug,
}

/// Scan raw arguments for logging flags (for early logging setup).
pub fn verbosity() -> Verbosity {
    verbosity_from_args(std::env::args())
}

fn verbosity_from_args<I: IntoIterator<Item = String>>(args: I) -> Verbosity {
    let mut level = Verbosity::Quiet;
    for arg in args {
        match arg.as_str() {
            "--debug" => return Verbosity::Debug,
            "-v" | "--verbose" => level = Verbosity::Verbose,
            _ => {}
        }
    }
    level
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        overrides: ConfigOverrides {
            data_dir: cli.data_dir,
            data_access_url: cli.url,
            api_key: cli.api_key,
        },
    };

    match cli.command {
        Commands::Query(args) => {
            // Filters are checked before configuration or network access.
            let params = args.into_params()?;
            let (settings, _) = load_settings_with_options(options).await?;
            query::cmd_query(&settings, &params).await
        }
        Commands::Download { file_path } => {
            let (settings, _) = load_settings_with_options(options).await?;
            download::cmd_download(&settings, &file_path).await
        }
        Commands::Upload { file_path } => {
            let (settings, _) = load_settings_with_options(options).await?;
            upload::cmd_upload(&settings, &file_path).await
        }
    }
}
