use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use anyhow::Result;
use crate::config::{load_config, DEFAULT_CONFIG_FILE};

pub mod commands;
pub mod config;

#[derive(Parser)]
#[command(name = "playground")]
#[command(about = "Playground - build and run Haskell/Plutus snippets in throwaway workspaces", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and run a source file locally
    Compile {
        file: PathBuf,
        #[arg(short, long, default_value = "haskell")]
        variant: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the full build result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a default configuration file
    Init {
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
    /// Check a configuration file and summarize its variants
    Validate {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show the build tool's version
    Version {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        bash: bool,
    },
}

pub struct CliApp;

impl CliApp {
    pub async fn run() -> Result<bool> {
        let cli = Cli::parse();

        match cli.command {
            Commands::Compile { file, variant, config, json } => {
                let config = load_config(config.as_deref())?;
                let result = commands::compile_file(&config, &file, &variant).await?;
                commands::compile::print_result(&result, json)?;
                Ok(result.success)
            }
            Commands::Init { path } => {
                let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
                commands::init_config(&path).await?;
                Ok(true)
            }
            Commands::Validate { config } => {
                let path = config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
                commands::validate_config(&path).await?;
                Ok(true)
            }
            Commands::Version { config, bash } => {
                let config = load_config(config.as_deref())?;
                commands::show_version(&config, bash).await?;
                Ok(true)
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match CliApp::run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::debug!("{:?}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
