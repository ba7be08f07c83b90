//! Tortoise Server CLI
//!
//! Runs the voice-cloning HTTP server or prints its resolved configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tortoise_server::server::{ServerConfig, ServerVariant, TortoiseServer};
use tortoise_server::VERSION;

/// Tortoise TTS voice-cloning server
#[derive(Parser, Debug)]
#[command(name = "tortoise-server")]
#[command(author, version, about, long_about = None)]
#[command(long_about = "
HTTP voice-cloning server. Clones a voice from uploaded samples and speaks
text in it through a Tortoise inference worker, or produces a placeholder tone
when no worker is available.

Examples:
  # Simulation mode on the default address (127.0.0.1:7860)
  tortoise-server serve

  # With a model worker
  tortoise-server serve --model-url http://127.0.0.1:8001

  # Print the resolved configuration
  tortoise-server check-config --config server.yaml
")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// enhanced (placeholder fallback) or basic (report failures)
        #[arg(long)]
        variant: Option<ServerVariant>,

        /// Base URL of the Tortoise inference worker
        #[arg(long)]
        model_url: Option<String>,
    },

    /// Print the resolved configuration as YAML
    CheckConfig {
        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn setup_logging(verbose: bool, level: &str) {
    let default_level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Defaults, then the config file, then the environment
fn resolve_config(path: Option<&PathBuf>) -> Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    config.apply_env().context("Invalid environment override")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            variant,
            model_url,
        } => {
            let mut config = resolve_config(config.as_ref())?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(variant) = variant {
                config.variant = variant;
            }
            if let Some(url) = model_url {
                config.model.url = Some(url);
            }

            setup_logging(cli.verbose, &config.logging.level);
            info!("Tortoise Server v{}", VERSION);

            TortoiseServer::new(config).run().await
        }

        Commands::CheckConfig { config } => {
            let config = resolve_config(config.as_ref())?;
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
    }
}
