mod config_cmd;
mod services;
mod status_cmd;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use perceptor_config::{config_dir, config_file_path, load_and_prepare, PreparedConfig};
use perceptor_gateway::{start_server, GatewayOptions};
use perceptor_logging::{init_logger, LoggerOptions};

#[derive(Parser)]
#[command(name = "perceptor")]
#[command(about = "Perceptor: OCR emotion tagging and live object depth over HTTP/WebSocket")]
#[command(version)]
struct Cli {
    /// Path to config.yaml (defaults to $PERCEPTOR_CONFIG_DIR or ~/.perceptor)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP/WebSocket server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Query the health endpoint of a running server
    Status {
        /// Base URL of the server (defaults to the configured address)
        #[arg(long)]
        url: Option<String>,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config with secrets masked
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));

    match cli.command {
        Commands::Config { action: ConfigAction::Init { force } } => {
            config_cmd::init(&config_path, force).await?;
        }
        Commands::Config { action: ConfigAction::Show } => {
            let prepared = load_and_prepare(&config_path).await?;
            config_cmd::print_warnings(&prepared.warnings);
            config_cmd::show(&prepared.config)?;
        }
        Commands::Status { url } => {
            let prepared = load_and_prepare(&config_path).await?;
            let url = url.unwrap_or_else(|| status_cmd::default_base_url(&prepared.config.server));
            status_cmd::run(&url).await?;
        }
        Commands::Serve { port } => {
            let mut prepared = load_and_prepare(&config_path).await?;
            if let Some(port) = port {
                prepared.config.server.port = port;
            }
            run_server(prepared).await?;
        }
    }

    Ok(())
}

async fn run_server(prepared: PreparedConfig) -> Result<()> {
    let config = &prepared.config;
    let _log_guard = init_logger(&LoggerOptions {
        level: config.logging.level.clone(),
        dir: config.logging.dir.clone(),
        json: config.logging.json,
    });
    prepared.log_warnings();

    let addr: SocketAddr = config
        .server
        .address()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.address()))?;

    info!(
        addr = %addr,
        ocr = ?config.ocr.provider,
        generator = ?config.generator.provider,
        "Starting perceptor"
    );

    let state = services::build_state(config).await?;
    let options = GatewayOptions {
        max_upload_bytes: config.server.max_upload_bytes,
        cors_permissive: config.server.cors_permissive,
    };
    start_server(addr, state, options).await
}
