// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Configuration types for radar-recorder

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecorderConfig {
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial sensor configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SensorConfig {
    /// Default port used when a start request does not name one
    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default = "default_bit_rate")]
    pub bit_rate: u32,

    /// Upper bound on a single frame read
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Vital-signs field recorded as the reading value
    #[serde(default = "default_value_field")]
    pub value_field: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bit_rate: default_bit_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            value_field: default_value_field(),
        }
    }
}

impl SensorConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Local CSV storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            file_prefix: default_file_prefix(),
        }
    }
}

/// Remote mirror configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: default_remote_enabled(),
            url: None,
            timeout_ms: default_remote_timeout_ms(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Session lifecycle configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_duration_seconds")]
    pub default_duration_seconds: f64,

    /// How long `stop` waits for the acquisition task to wind down
    #[serde(default = "default_stop_grace_seconds")]
    pub stop_grace_seconds: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_duration_seconds: default_duration_seconds(),
            stop_grace_seconds: default_stop_grace_seconds(),
        }
    }
}

impl SessionConfig {
    pub fn default_duration(&self) -> Duration {
        seconds_to_duration(self.default_duration_seconds)
    }

    pub fn stop_grace(&self) -> Duration {
        seconds_to_duration(self.stop_grace_seconds)
    }
}

/// Saturating conversion for configs that skipped validation:
/// NaN and negatives map to zero, overflow to `Duration::MAX`.
fn seconds_to_duration(seconds: f64) -> Duration {
    match Duration::try_from_secs_f64(seconds) {
        Ok(duration) => duration,
        Err(_) if seconds > 0.0 => Duration::MAX,
        Err(_) => Duration::ZERO,
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"

    #[serde(default = "default_log_format")]
    pub format: String, // "text", "json"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_port() -> String { "/dev/ttyACM1".to_string() }
fn default_bit_rate() -> u32 { 921_600 }
fn default_read_timeout_ms() -> u64 { 500 }
fn default_value_field() -> String { "unwrapPhasePeak_mm".to_string() }
fn default_output_dir() -> PathBuf { PathBuf::from("recordings") }
fn default_file_prefix() -> String { "radar_data".to_string() }
fn default_remote_enabled() -> bool { true }
fn default_remote_timeout_ms() -> u64 { 500 }
fn default_duration_seconds() -> f64 { 60.0 }
fn default_stop_grace_seconds() -> f64 { 5.0 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "text".to_string() }
