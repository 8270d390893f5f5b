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

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use radar_recorder::config::{apply_env_overrides, load_config_with_env, ConfigLoader};
use radar_recorder::{ControlInterface, RecorderConfig, SessionController};

/// Radar Recorder - Record mmWave vital-signs readings to CSV and a remote endpoint
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults are used if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port (overrides config file)
    #[arg(short, long)]
    port: Option<String>,

    /// Recording duration in seconds (overrides config file)
    #[arg(short, long)]
    duration: Option<f64>,

    /// Directory for CSV recordings (overrides config file)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Serve JSON control commands on stdin/stdout instead of recording once
    #[arg(long)]
    serve: bool,
}

fn load(args: &Args) -> Result<RecorderConfig> {
    let mut config = match &args.config {
        Some(path) => load_config_with_env(path)?,
        None => {
            let mut config = RecorderConfig::default();
            apply_env_overrides(&mut config);
            config.remote.enabled = config.remote.url.is_some();
            config
        }
    };

    // Apply CLI overrides
    if let Some(port) = &args.port {
        config.sensor.port = port.clone();
    }
    if let Some(duration) = args.duration {
        config.session.default_duration_seconds = duration;
    }
    if let Some(dir) = &args.output_dir {
        config.storage.output_dir = dir.clone();
    }

    ConfigLoader::validate(&config)?;
    Ok(config)
}

fn init_tracing(config: &RecorderConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout stays free for control responses
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    if config.logging.format.eq_ignore_ascii_case("json") {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();
    let config = load(&args)?;
    init_tracing(&config)?;

    info!("Starting Radar Recorder");
    if let Some(path) = &args.config {
        info!("Loaded configuration from: {:?}", path);
    }
    info!("Output directory: {}", config.storage.output_dir.display());

    let controller = Arc::new(SessionController::from_config(config.clone())?);

    if args.serve {
        let control_interface = ControlInterface::new(controller.clone());
        let stdin = BufReader::new(tokio::io::stdin());

        tokio::select! {
            result = control_interface.run(stdin, tokio::io::stdout()) => {
                if let Err(e) = result {
                    tracing::error!("Control interface error: {}", e);
                }
                info!("Control interface stopped");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
            }
        }

        controller.shutdown().await;
        info!("Radar Recorder shut down successfully");
        return Ok(());
    }

    let duration = config.session.default_duration();
    controller
        .start(duration, &config.sensor.port)
        .await
        .context("Failed to start recording")?;

    tokio::select! {
        session = controller.wait() => {
            info!("Recording finished: {:?}", session.status);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, stopping recording");
            controller.shutdown().await;
        }
    }

    let session = controller.session();
    println!("{}", serde_json::to_string_pretty(&session)?);
    match controller.stats() {
        Ok(stats) => println!("{}", serde_json::to_string_pretty(&stats)?),
        Err(e) => warn!("{}", e),
    }

    if let Some(error) = session.error {
        anyhow::bail!("Recording failed: {}", error);
    }

    Ok(())
}
