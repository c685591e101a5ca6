//! Transform a JSON document from a file or stdin.
//!
//! Objects carrying a `"$type"` key are read as records of that type;
//! everything else is plain data.
//!
//! ```bash
//! jsonapi-transformer transform page.json --include children --pretty
//! cat page.json | jsonapi-transformer transform - --all-includes
//! ```

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::model::Value;
use crate::transform::TransformOptions;

#[derive(Args, Debug)]
pub struct TransformCommand {
    /// Input JSON file, or `-` for stdin
    input: PathBuf,

    /// Embed every relation at every level
    #[arg(long)]
    all_includes: bool,

    /// Comma separated relation paths to embed, e.g. `children,children.author`
    #[arg(long, value_name = "PATHS")]
    include: Option<String>,

    /// Render nested objects as resource identifiers
    #[arg(long)]
    no_nested: bool,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

impl TransformCommand {
    pub async fn execute(self, config: EngineConfig) -> Result<()> {
        let output = self.run(config).await?;
        println!("{output}");
        Ok(())
    }

    /// Transform the input and return the rendered JSON.
    ///
    /// # Errors
    ///
    /// Fails if the input cannot be read or parsed, the engine cannot be
    /// built from `config`, or the transformation fails.
    pub async fn run(&self, config: EngineConfig) -> Result<String> {
        let content = read_input(&self.input).await?;
        let json: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON input: {}", self.input.display()))?;

        let engine = Engine::builder()
            .config(config)
            .build()
            .context("Failed to build transformation engine")?;

        let value = Value::from_tagged_json(json);
        let mapping = engine.transform(&value, &self.options())?;
        tracing::debug!(target: "transform", "Transformed {} into {} keys", self.input.display(), mapping.len());

        let output = serde_json::Value::Object(mapping);
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&output)?
        } else {
            serde_json::to_string(&output)?
        };
        Ok(rendered)
    }

    pub fn options(&self) -> TransformOptions {
        let mut options = TransformOptions::default();
        if self.all_includes {
            options = options.with_all_includes();
        }
        if self.no_nested {
            options = options.without_nested_transformer();
        }
        if let Some(include) = &self.include {
            options = options.with_include_list(include);
        }
        options
    }
}

async fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut content = String::new();
        tokio::io::stdin()
            .read_to_string(&mut content)
            .await
            .context("Failed to read input from stdin")?;
        return Ok(content);
    }

    tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read input file: {}", input.display()))
}
