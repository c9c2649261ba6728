//! `uplink` entry point: upload a file, or receive uploads.

mod app;
mod config;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Single-file TCP upload client and receiver.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Configuration file (default: ~/.config/uplink/uplink.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload one file to the server.
    Send {
        /// File name, e.g. 00042.SST.
        file: String,

        /// Directory holding the file.
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Server address, overriding the configuration.
        #[arg(short, long)]
        server: Option<SocketAddr>,
    },
    /// Accept uploads and store them until interrupted.
    Receive {
        /// Address to listen on.
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Directory to store uploads in.
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = config::Config::load(cli.config.as_deref())?;

    let rt = tokio::runtime::Runtime::new()?;
    match cli.command {
        Command::Send { file, dir, server } => {
            if let Some(dir) = dir {
                config.outbox = dir;
            }
            if let Some(server) = server {
                config.upload.server = server;
            }
            rt.block_on(app::send(&config, &file))
        }
        Command::Receive { bind, dir } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(dir) = dir {
                config.inbox = dir;
            }
            rt.block_on(app::receive(&config))
        }
    }
}
