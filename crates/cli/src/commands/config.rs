use clap::Subcommand;
use rotor_core::config::{RouterConfig, StrategyConfig};
use std::path::Path;

use super::utils::{print_error, print_info, print_success, CliError, CliResult};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to config file
        #[arg(short, long, default_value = "config/rotor.toml")]
        file: String,
    },

    /// Show the effective configuration, including environment overrides
    Show {
        /// Path to config file
        #[arg(short, long, default_value = "config/rotor.toml")]
        file: String,
    },

    /// Generate a sample configuration file
    Generate {
        /// Output path for the config file
        #[arg(short, long, default_value = "config/rotor.toml")]
        output: String,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_config_command(command: ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Validate { file } => validate_config(&file),
        ConfigCommands::Show { file } => show_config(&file),
        ConfigCommands::Generate { output, force } => generate_config(&output, force),
    }
}

fn validate_config(file: &str) -> CliResult<()> {
    if !Path::new(file).exists() {
        print_error(&format!("Configuration file not found: {file}"));
        return Err(CliError::Config(format!("File not found: {file}")));
    }

    print_info(&format!("Loading configuration from {file}..."));
    let config = RouterConfig::from_file(file)?;

    print_info("Validating configuration...");
    config.validate().map_err(CliError::Config)?;

    print_success("Configuration is valid!");

    println!("Configuration Summary:");
    println!("  Read endpoints: {}", config.pool.read_endpoints().len());
    println!("  Write endpoints: {}", config.pool.write_endpoints().len());
    println!(
        "  Read strategy: {}",
        describe(config.read_strategy.as_ref().unwrap_or(&config.strategy))
    );
    println!(
        "  Write strategy: {}",
        describe(config.write_strategy.as_ref().unwrap_or(&config.strategy))
    );
    println!("  Jail: {}ms", config.jail.duration_ms);

    Ok(())
}

fn show_config(file: &str) -> CliResult<()> {
    let config = RouterConfig::from_file(file)?;

    println!("Configuration from {file}:");

    println!("\n[Pool]");
    println!("  Read:");
    for endpoint in config.pool.read_endpoints() {
        println!("    {endpoint}");
    }
    println!("  Write:");
    for endpoint in config.pool.write_endpoints() {
        println!("    {endpoint}");
    }

    println!("\n[Strategy]");
    println!("  Default: {}", describe(&config.strategy));
    if let Some(strategy) = &config.read_strategy {
        println!("  Read: {}", describe(strategy));
    }
    if let Some(strategy) = &config.write_strategy {
        println!("  Write: {}", describe(strategy));
    }

    println!("\n[Jail]");
    println!("  Duration: {}ms", config.jail.duration_ms);
    if let Some(rate_limited) = config.jail.rate_limited_duration_ms {
        println!("  Rate limited: {rate_limited}ms");
    }

    println!("\n[Requests]");
    println!("  Timeout: {}ms", config.request_timeout_ms);
    println!("  Write methods: {}", config.write_methods.join(", "));
    println!("  Concurrent limit: {}", config.http.concurrent_limit);

    println!("\n[Logging]");
    println!("  Level: {}", config.logging.level);
    println!("  Format: {}", config.logging.format);

    Ok(())
}

fn generate_config(output: &str, force: bool) -> CliResult<()> {
    if Path::new(output).exists() && !force {
        return Err(CliError::Config(format!(
            "File {output} already exists. Use --force to overwrite."
        )));
    }

    if let Some(parent) = Path::new(output).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output, SAMPLE_CONFIG)?;

    print_success(&format!("Sample configuration written to {output}"));
    Ok(())
}

fn describe(strategy: &StrategyConfig) -> String {
    match strategy {
        StrategyConfig::Fallback => "fallback".to_string(),
        StrategyConfig::Sequential { requests_per_endpoint } => {
            format!("sequential ({requests_per_endpoint} requests per endpoint)")
        }
        StrategyConfig::Random => "random".to_string(),
        StrategyConfig::Dynamic { history_depth } => {
            format!("dynamic (last {history_depth} latencies)")
        }
        StrategyConfig::HighestBlock { sync_interval_ms } => {
            format!("highest_block (sync every {sync_interval_ms}ms)")
        }
        StrategyConfig::Fastest => "fastest".to_string(),
    }
}

pub const SAMPLE_CONFIG: &str = r#"# Rotor JSON-RPC router configuration
# Environment overrides use the ROTOR prefix, e.g. ROTOR__JAIL__DURATION_MS=5000

request_timeout_ms = 10000
write_methods = ["eth_sendRawTransaction"]

[pool]
# Shared by reads and writes unless `read` or `write` is set.
endpoints = [
    "https://ethereum-rpc.publicnode.com",
    "https://eth.llamarpc.com",
]

[strategy]
# fallback | sequential | random | dynamic | highest_block | fastest
kind = "fallback"

# Writes go to a single endpoint in order:
# [write_strategy]
# kind = "sequential"
# requests_per_endpoint = 5

[jail]
duration_ms = 10000
# rate_limited_duration_ms = 60000

[http]
concurrent_limit = 1000

[logging]
level = "info"
format = "pretty"
"#;
