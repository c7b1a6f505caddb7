//! omnibus - one chat endpoint, several LLM vendors
//!
//! A local proxy that sends every prompt to all configured vendors at once
//! and answers with their replies stitched together.

use clap::{Parser, Subcommand};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use omnibus::config::{Config, KeySource};
use omnibus::proxy::run_server;

#[derive(Parser)]
#[command(name = "omnibus")]
#[command(about = "Fan one OpenAI-compatible chat request out to several LLM vendors")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration file
    Check {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },

    /// Show configured providers
    Providers {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
}

/// Load the config file, or built-in defaults when it does not exist.
fn load_config(path: &str) -> anyhow::Result<(Config, Vec<(String, KeySource)>)> {
    if Path::new(path).exists() {
        Ok(Config::from_file_with_env(path)?)
    } else {
        tracing::warn!(config = %path, "Config file not found, using built-in defaults");
        Ok(Config::from_env_defaults()?)
    }
}

fn init_tracing(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("omnibus={},tower_http=info", level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            // The log level lives in the config file, so peek at it first.
            let level = Config::from_file(&config)
                .map(|c| c.logging.level)
                .unwrap_or_else(|_| "info".to_string());
            init_tracing(&level);

            tracing::info!(config = %config, "Loading configuration");
            let (mut cfg, key_sources) = load_config(&config)?;

            for (name, source) in &key_sources {
                if *source == KeySource::None {
                    tracing::warn!(provider = %name, "No API key - this provider will always fail");
                }
            }

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                cfg.server.listen = addr;
            }

            if cfg.server.master_key.is_none() {
                tracing::warn!("No master key configured - authentication is disabled");
            }

            run_server(cfg).await
        }

        Commands::Check { config } => {
            init_tracing("info");
            let (cfg, key_sources) = load_config(&config)?;

            println!("Configuration OK: {}", config);
            println!("  listen:        {}", cfg.server.listen);
            println!("  virtual model: {}", cfg.server.virtual_model);
            println!("  timeout:       {}s", cfg.server.request_timeout_secs);
            println!(
                "  master key:    {}",
                if cfg.server.master_key.is_some() { "set" } else { "not set" }
            );
            for (name, source) in key_sources {
                println!("  key for {:<12} {}", name, source);
            }
            Ok(())
        }

        Commands::Providers { config } => {
            init_tracing("warn");
            let (cfg, key_sources) = load_config(&config)?;

            println!("{:<14} {:<8} {:<24} {:<16} URL", "NAME", "VENDOR", "MODEL", "KEY");
            for (provider, (_, source)) in cfg.providers.iter().zip(key_sources) {
                println!(
                    "{:<14} {:<8} {:<24} {:<16} {}",
                    provider.name,
                    provider.vendor.as_str(),
                    provider.model,
                    source.to_string(),
                    provider.url
                );
            }
            Ok(())
        }
    }
}
