// Configuration module for radar-recorder
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Default values

pub mod types;
mod loader;

pub use types::*;
pub use loader::ConfigLoader;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RecorderConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<RecorderConfig> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config);
    ConfigLoader::validate(&config).context("Invalid configuration after environment overrides")?;
    Ok(config)
}

/// Allow environment variables to override config values
pub fn apply_env_overrides(config: &mut RecorderConfig) {
    if let Ok(port) = std::env::var("RADAR_PORT") {
        config.sensor.port = port;
    }

    if let Ok(url) = std::env::var("REMOTE_URL") {
        config.remote.url = Some(url);
    }

    if let Ok(dir) = std::env::var("OUTPUT_DIR") {
        config.storage.output_dir = PathBuf::from(dir);
    }
}
