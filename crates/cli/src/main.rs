mod config;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter (e.g. `debug`, `chefmarket=trace`).
const LOG_ENV: &str = "CHEFMARKET_LOG";

/// Chef marketplace backend.
#[derive(Parser)]
#[command(name = "chefmarket", version, about = "Chef marketplace backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to listen on (overrides config file and CHEFMARKET_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Path to a TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Serve { port, config } => {
            let settings = match config::Settings::load(config.as_deref(), port) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!("error: {}", e);
                    process::exit(1);
                }
            };
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("error: failed to create tokio runtime: {}", e);
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(settings)) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();
}
