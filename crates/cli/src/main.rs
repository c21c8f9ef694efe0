//! chatwire CLI: the main entry point.
//!
//! Commands:
//! - `replay` : Feed a recorded AG-UI event log through the runtime
//! - `config` : Show, locate, or validate configuration

use std::path::PathBuf;

use chatwire_config::{AppConfig, LogFormat};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "chatwire",
    about = "chatwire: streaming chat protocol runtime",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.chatwire/config.toml
    #[arg(short, long, global = true, env = "CHATWIRE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay newline-delimited JSON events through the runtime
    Replay {
        /// Event log to read; `-` or omitted reads stdin
        input: Option<PathBuf>,

        /// Print the final conversation and citations as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the default config file path
    Path,
    /// Validate the configuration file
    Validate,
    /// Print a default configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (config_path, config) = match &cli.config {
        Some(path) => (path.clone(), AppConfig::load_from(path)),
        None => (AppConfig::config_dir().join("config.toml"), AppConfig::load()),
    };

    // Initialize tracing
    let filter = match (&config, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.logging.level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let json_logs = matches!(&config, Ok(c) if c.logging.format == LogFormat::Json);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Config {
            action: ConfigAction::Validate,
        } => commands::config_cmd::validate(&config_path, config).await?,
        Commands::Config {
            action: ConfigAction::Path,
        } => commands::config_cmd::path(&config_path).await?,
        Commands::Config {
            action: ConfigAction::Init,
        } => commands::config_cmd::init().await?,
        Commands::Config {
            action: ConfigAction::Show,
        } => commands::config_cmd::show(&config?).await?,
        Commands::Replay { input, json } => commands::replay::run(&config?, input, json).await?,
    }

    Ok(())
}
