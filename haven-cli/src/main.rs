use std::process::ExitCode;

use clap::{Parser, Subcommand};
use haven_core::{Config, ConfigError, Persona, Settings, SettingsError, StoreError};
use haven_gateway::services::diary_store;
use haven_gateway::{CompletionError, Services};
use tracing::{debug, info};

mod chat;
mod diary;

#[derive(Parser)]
#[command(name = "haven")]
#[command(about = "haven - reply drafting, persona chat and mood diary", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with a persona (type /help inside the chat)
    Chat {
        /// senior, mentor or friend
        #[arg(long, default_value_t = Persona::Senior)]
        persona: Persona,
    },
    /// Draft replies to a message you received
    Suggest {
        /// The received message
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Write a diary entry from free text
    Diary {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// List saved diary entries, newest first
    Diaries {
        /// Show at most this many entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the config file location and the settings in effect
    Config,
}

/// Errors surfaced by CLI commands
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Diary store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to stderr so command output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.settings.logging.level.clone().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Completion(e)) => {
            debug!(error = %e, "command failed");
            eprintln!("{}", e.user_notice());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &Config) -> Result<(), CliError> {
    let store = diary_store(config)?;
    info!(path = ?store.path(), "diary store ready");

    match command {
        Commands::Chat { persona } => {
            let services = Services::from_config(config)?;
            chat::run(&services, &store, persona).await
        }
        Commands::Suggest { message } => {
            let services = Services::from_config(config)?;
            suggest(&services, &message.join(" ")).await
        }
        Commands::Diary { text } => {
            let services = Services::from_config(config)?;
            diary::write(&services, &store, &text.join(" ")).await
        }
        Commands::Diaries { limit } => diary::list(&store, limit),
        Commands::Config => show_config(config),
    }
}

fn show_config(config: &Config) -> Result<(), CliError> {
    println!("# {}", Settings::config_path()?.display());
    print!("{}", config.settings.to_toml()?);
    Ok(())
}

async fn suggest(services: &Services, message: &str) -> Result<(), CliError> {
    let suggestions = services.suggester.suggest(message).await?;

    for (i, suggestion) in suggestions.iter().enumerate() {
        println!("[{}] {}", i + 1, suggestion.title);
        println!("    {}", suggestion.text);
        println!("    Why it works: {}", suggestion.rational_analysis);
        println!("    For you: {}", suggestion.warm_support);
        println!();
    }
    Ok(())
}
