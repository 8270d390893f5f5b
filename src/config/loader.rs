// Configuration loader with environment variable substitution

use super::types::*;
use crate::sensor::VitalSigns;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;
use std::time::Duration;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RecorderConfig> {
        let content = std::fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;

        Self::parse(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn parse(content: &str) -> Result<RecorderConfig> {
        let content = Self::substitute_env_vars(content)?;

        let config: RecorderConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML configuration")?;

        Self::validate(&config)?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${RADAR_PORT} -> /dev/ttyACM1
    /// - ${REMOTE_URL:-http://localhost:8080} -> http://localhost:8080 (if REMOTE_URL not set)
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}")
            .context("Invalid substitution pattern")?;

        let substituted = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    // Keep original if no default and var not found
                    None => format!("${{{}}}", var_name),
                },
            }
        });

        Ok(substituted.into_owned())
    }

    /// Validate configuration
    pub fn validate(config: &RecorderConfig) -> Result<()> {
        if config.sensor.port.is_empty() {
            bail!("sensor.port cannot be empty");
        }

        if config.sensor.bit_rate == 0 {
            bail!("sensor.bit_rate must be > 0");
        }

        if config.sensor.read_timeout_ms == 0 {
            bail!("sensor.read_timeout_ms must be > 0");
        }

        if !VitalSigns::FIELD_NAMES.contains(&config.sensor.value_field.as_str()) {
            bail!(
                "Unknown sensor.value_field: '{}'. Supported: {}",
                config.sensor.value_field,
                VitalSigns::FIELD_NAMES.join(", ")
            );
        }

        if config.storage.file_prefix.is_empty() {
            bail!("storage.file_prefix cannot be empty");
        }

        if config.remote.enabled {
            match config.remote.url.as_deref() {
                None | Some("") => bail!("remote.url is required when remote.enabled is true"),
                Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                    bail!("remote.url must be an http(s) URL, got '{}'", url)
                }
                Some(_) => {}
            }

            if config.remote.timeout_ms == 0 {
                bail!("remote.timeout_ms must be > 0");
            }
        }

        Self::validate_seconds(
            "session.default_duration_seconds",
            config.session.default_duration_seconds,
        )?;
        Self::validate_seconds("session.stop_grace_seconds", config.session.stop_grace_seconds)?;

        Ok(())
    }

    /// Positive and representable as a `Duration`
    fn validate_seconds(name: &str, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds <= 0.0 {
            bail!("{} must be > 0", name);
        }
        if let Err(e) = Duration::try_from_secs_f64(seconds) {
            bail!("{} is out of range ({}): {}", name, seconds, e);
        }
        Ok(())
    }
}
