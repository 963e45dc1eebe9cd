use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(about = "Windlog: scraped wind observations, merged and kept per owner.")]
pub struct Cli {
    #[arg(env = "WINDLOG_DATABASE_URL", short, long, default_value = "windlog.db")]
    pub database_url: String,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline once and print the run status.
    Refresh(OwnerArgs),
    /// Run now, then on a fixed interval until interrupted.
    Watch {
        #[command(flatten)]
        owner: OwnerArgs,
        /// Seconds between runs (defaults to WINDLOG_REFRESH_INTERVAL_SECS).
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Write the retained history as CSV.
    Export {
        #[command(flatten)]
        owner: OwnerArgs,
        /// Output file (stdout when omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the most recent retained observations.
    Show {
        #[command(flatten)]
        owner: OwnerArgs,
        #[arg(long, default_value_t = 15)]
        limit: usize,
    },
    /// Serve the HTTP API.
    Http {
        #[arg(env = "WINDLOG_SERVER_ADDRESS")]
        address: std::net::SocketAddr,
        /// Owners refreshed in the background while serving.
        #[arg(long)]
        watch: Vec<String>,
    },
}

#[derive(Debug, Parser)]
pub struct OwnerArgs {
    /// Owner whose history is read and updated.
    #[arg(env = "WINDLOG_OWNER", long)]
    pub owner: String,
}
