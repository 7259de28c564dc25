//! framecast CLI - frame streaming server and watch client.
//!
//! See the `framecast` library for the core functionality.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use framecast::constants::DEFAULT_INITIAL_BATCH;
use framecast::{Config, Server, WatchOptions};
use mimalloc::MiMalloc;
use tokio_util::sync::CancellationToken;

/// mimalloc outperforms the system allocator under many small per-batch allocations.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "framecast")]
#[command(version)]
#[command(about = "Stream computed animation frames over WebSocket")]
struct Cli {
    /// Config file (defaults to FRAMECAST_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the frame server until Ctrl-C
    Serve {
        /// Address to listen on, overriding the config
        #[arg(long)]
        addr: Option<String>,
    },
    /// Connect to a server and print what it streams
    Watch {
        /// Server URL, e.g. ws://127.0.0.1:8080/tick
        url: String,
        /// Frames to request after each batch
        #[arg(long, default_value_t = DEFAULT_INITIAL_BATCH)]
        request: u64,
        /// Disconnect after this many batches (0 = until the server closes)
        #[arg(long, default_value_t = 0)]
        batches: u64,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { addr } => {
            if let Some(addr) = addr {
                config.addr = addr;
                config.validate()?;
            }
            serve(config).await?;
        }
        Commands::Watch { url, request, batches } => {
            let options = WatchOptions { request, batches };
            let mut stdout = std::io::stdout().lock();
            let summary = framecast::watch(&url, &options, &mut stdout).await?;
            log::info!(
                "Received {} messages ({} batches, {} frames)",
                summary.messages,
                summary.batches,
                summary.frames
            );
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let server = Server::bind(config).await?;
    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
            return;
        }
        log::info!("Received Ctrl-C, shutting down");
        signal_token.cancel();
    });

    server.run(shutdown).await
}
