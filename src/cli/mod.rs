//! Command-line interface for the transformation engine.
//!
//! # Commands
//!
//! - `transform` - Transform a JSON document and print the resource mapping
//! - `config` - Print the effective configuration or its location
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: no logging
//! - `--config` / `-c`: configuration file (also `JSONAPI_TRANSFORMER_CONFIG`)
//!
//! `RUST_LOG` takes precedence over both logging flags.

mod config;
mod transform;

pub use config::ConfigCommand;
pub use transform::TransformCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;
use crate::constants::CONFIG_PATH_ENV;

/// Main CLI structure.
#[derive(Parser, Debug)]
#[command(
    name = "jsonapi-transformer",
    about = "Transform object graphs into JSON:API resource documents",
    version,
    long_about = "Cycle-safe transformation of typed JSON documents into JSON:API resource mappings, \
                  with configurable includes, property filters and internal link rewriting."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all logging
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transform a JSON document into a resource mapping
    Transform(TransformCommand),

    /// Show the effective configuration
    Config(ConfigCommand),
}

impl Cli {
    /// Initialize logging, load the configuration and run the command.
    ///
    /// # Errors
    ///
    /// Returns the command's error, or a configuration loading error.
    pub async fn execute(self) -> Result<()> {
        init_logging(self.log_level());

        let config = EngineConfig::load(self.config.as_deref()).await?;
        match self.command {
            Commands::Transform(cmd) => cmd.execute(config).await,
            Commands::Config(cmd) => cmd.execute(&config, self.config.as_deref()),
        }
    }

    /// Log level implied by `--verbose`/`--quiet`; `None` disables logging.
    #[must_use]
    pub fn log_level(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            None
        } else {
            Some("warn")
        }
    }
}

/// Install the global tracing subscriber, writing to stderr so stdout stays
/// machine-readable.
pub fn init_logging(level: Option<&str>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if let Some(level) = level {
        EnvFilter::new(level)
    } else {
        return;
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
