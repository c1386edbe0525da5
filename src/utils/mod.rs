pub mod retry;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::models::common::Config;

const ENV_PREFIX: &str = "FEE_INDEXER";

pub fn load_config<P: AsRef<Path>>(file_name: P) -> Result<Config> {
    read_config(file_name.as_ref(), None)
}

/// `env` replaces the process environment when given.
fn read_config(config_path: &Path, env: Option<config::Map<String, String>>) -> Result<Config> {
    info!("Config path: {}", config_path.to_string_lossy());

    // YAML file first, then `FEE_INDEXER__SECTION__KEY` environment overrides
    let config: Config = config::Config::builder()
        .add_source(config::File::from(config_path).required(true))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .build()
        .context("failed to read config file")?
        .try_deserialize()
        .context("failed to parse config")?;

    config.validate().context("invalid config")?;

    Ok(config)
}

pub(crate) fn strip_html(error: &str) -> String {
    // If the error contains HTML tags, extract just the text content
    if error.contains("<!doctype html>") || error.contains("<html>") {
        // Remove all HTML tags and return the first non-empty line of text
        error
            .lines()
            .map(|line| line.trim())
            .find(|line| {
                !line.starts_with('<')
                    && !line.ends_with('>')
                    && !line.is_empty()
                    && *line != "html"
                    && *line != "body"
            })
            .unwrap_or(error)
            .to_string()
    } else {
        error.to_string()
    }
}
