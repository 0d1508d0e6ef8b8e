//! ProdOps CLI, the main entry point.
//!
//! Commands:
//! - `serve`  : Start the HTTP gateway and notification worker
//! - `chat`   : Run one workflow turn locally
//! - `config` : Show, validate, or locate the configuration
//! - `token`  : Issue a bearer token for testing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "prodops",
    about = "ProdOps: manufacturing operations assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (default: ~/.prodops/config.toml)
    #[arg(short, long, global = true, env = "PRODOPS_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one chat turn and print the reply
    Chat {
        #[arg(long, default_value_t = 1)]
        user_id: i64,

        /// Role held by the user (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,

        #[arg(short, long)]
        message: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Issue a signed bearer token
    Token {
        #[arg(long)]
        user_id: i64,

        #[arg(long)]
        email: String,

        /// Role held by the user (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Check the configuration and report problems
    Validate,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Chat {
            user_id,
            roles,
            message,
        } => commands::chat::run(config_path, user_id, roles, &message).await?,
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path)?,
            ConfigAction::Path => commands::config_cmd::path(config_path),
        },
        Commands::Token {
            user_id,
            email,
            roles,
        } => commands::token::run(config_path, user_id, email, roles)?,
    }

    Ok(())
}
