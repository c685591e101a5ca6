//! Show the effective engine configuration.
//!
//! ```bash
//! jsonapi-transformer config          # effective configuration as TOML
//! jsonapi-transformer config --path   # file the configuration is read from
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::Path;

use crate::config::EngineConfig;

#[derive(Args, Debug)]
pub struct ConfigCommand {
    /// Print the configuration file location instead of its contents
    #[arg(long)]
    path: bool,
}

impl ConfigCommand {
    pub fn execute(self, config: &EngineConfig, config_path: Option<&Path>) -> Result<()> {
        println!("{}", self.render(config, config_path)?);
        Ok(())
    }

    /// Render the command output.
    ///
    /// # Errors
    ///
    /// Fails if no configuration location can be determined for `--path`, or
    /// if the configuration cannot be serialized.
    pub fn render(&self, config: &EngineConfig, config_path: Option<&Path>) -> Result<String> {
        let location = config_path.map(Path::to_path_buf).or_else(EngineConfig::resolve_path);

        if self.path {
            let location = location
                .ok_or_else(|| anyhow::anyhow!("Unable to determine the configuration directory"))?;
            return Ok(location.display().to_string());
        }

        let header = match &location {
            Some(location) if location.exists() => format!("# Loaded from {}", location.display()),
            Some(location) => format!("# Defaults ({} not found)", location.display()),
            None => "# Defaults".to_string(),
        };
        Ok(format!("{}\n{}", header.dimmed(), config.to_toml()?))
    }
}
