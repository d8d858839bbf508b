//! CLI for the VDM video download manager.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vdm_core::config::{self, VdmConfig};

use commands::{run_clear_history, run_history, run_info, run_serve, run_status};

/// Top-level CLI for the VDM video download manager.
#[derive(Debug, Parser)]
#[command(name = "vdm")]
#[command(about = "VDM: video download job service", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/vdm/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the HTTP service.
    Serve {
        /// Address to listen on (overrides `bind_addr`).
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
        /// Directory for downloaded artifacts (overrides `downloads_dir`).
        #[arg(long, value_name = "DIR")]
        downloads_dir: Option<PathBuf>,
    },

    /// List completed downloads, most recent first.
    History {
        /// Maximum number of rows (default: `history_limit`).
        #[arg(long, value_name = "N")]
        limit: Option<u32>,
    },

    /// Delete all download history.
    ClearHistory,

    /// Show the persisted state of a job.
    Status {
        /// Job identifier (UUID).
        id: String,
    },

    /// Print metadata for a video URL as JSON.
    Info {
        /// Source video URL.
        url: String,
    },
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = cli.load_config()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Serve {
                bind,
                downloads_dir,
            } => run_serve(cfg, bind, downloads_dir).await?,
            CliCommand::History { limit } => run_history(&cfg, limit).await?,
            CliCommand::ClearHistory => run_clear_history(&cfg).await?,
            CliCommand::Status { id } => run_status(&cfg, &id).await?,
            CliCommand::Info { url } => run_info(&cfg, &url).await?,
        }

        Ok(())
    }

    fn load_config(&self) -> Result<VdmConfig> {
        match &self.config {
            Some(path) => config::load_from_path(path),
            None => config::load_or_init(),
        }
    }
}
