use anyhow::Context;
use clap::{Parser, Subcommand};
use rotor_core::config::RouterConfig;

mod commands;
mod logging;

use commands::{call, handle_config_command, CallOptions, ConfigCommands};

#[derive(Parser)]
#[command(name = "rotor-cli")]
#[command(about = "Rotor CLI - send JSON-RPC calls through a resilient endpoint router")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one JSON-RPC call through the configured router
    Call {
        /// JSON-RPC method name
        #[arg(short, long)]
        method: String,

        /// Parameters as a JSON array or object
        #[arg(short, long)]
        params: Option<String>,

        /// Request id
        #[arg(long, default_value = "1")]
        id: u64,

        /// Send a single attempt to this endpoint instead of routing
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Attempt timeout in milliseconds when --endpoint is given
        #[arg(long, requires = "endpoint")]
        timeout_ms: Option<u64>,

        /// Path to config file (defaults to $ROTOR_CONFIG or config/rotor.toml)
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Configuration Management
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn load_config(path: Option<&str>) -> anyhow::Result<RouterConfig> {
    let config = match path {
        Some(path) => RouterConfig::from_file(path),
        None => RouterConfig::load(),
    };
    config.context("failed to load configuration")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Call { method, params, id, endpoint, timeout_ms, config } => {
            let config = load_config(config.as_deref())?;
            logging::init_logging(&config.logging);

            let options = CallOptions { method, params, id, endpoint, timeout_ms };
            call(&config, options).await?;
        }

        Commands::Config(config_command) => {
            handle_config_command(config_command)?;
        }
    }

    Ok(())
}
