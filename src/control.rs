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

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::error::ControlError;
use crate::protocol::{ControlPayload, ControlRequest, ControlResponse};
use crate::recorder::SessionController;

/// Control interface speaking newline-delimited JSON
///
/// Each input line is one `ControlRequest`; each gets exactly one
/// `ControlResponse` line back, in order.
pub struct ControlInterface {
    controller: Arc<SessionController>,
}

impl ControlInterface {
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self { controller }
    }

    /// Serve requests until the reader reaches EOF
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Control interface listening");
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = self.handle_line(line).await;
            let mut bytes = serde_json::to_vec(&response)?;
            bytes.push(b'\n');
            writer.write_all(&bytes).await?;
            writer.flush().await?;
        }

        info!("Control input closed");
        Ok(())
    }

    pub async fn handle_line(&self, line: &str) -> ControlResponse {
        match serde_json::from_str::<ControlRequest>(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => ControlResponse::error(format!("Invalid request: {}", e)),
        }
    }

    pub async fn handle(&self, request: ControlRequest) -> ControlResponse {
        debug!("Processing command: {:?}", request);

        match request {
            ControlRequest::Start { duration, port } => {
                let config = self.controller.config();
                let seconds = duration.unwrap_or(config.session.default_duration_seconds);
                let port = port.unwrap_or_else(|| config.sensor.port.clone());

                let duration = match Duration::try_from_secs_f64(seconds) {
                    Ok(duration) => duration,
                    Err(_) => return ControlResponse::error(ControlError::InvalidDuration.to_string()),
                };

                match self.controller.start(duration, &port).await {
                    Ok(handle) => ControlResponse::success(
                        format!("Recording started for {} seconds", seconds),
                        ControlPayload::Started {
                            session_id: handle.id,
                            port: handle.port_identifier,
                            duration: seconds,
                        },
                    ),
                    Err(e) => ControlResponse::error(e.to_string()),
                }
            }
            ControlRequest::Stop => match self.controller.stop().await {
                Ok(summary) => {
                    ControlResponse::success("Recording stopped", ControlPayload::Stopped(summary))
                }
                Err(e) => ControlResponse::error(e.to_string()),
            },
            ControlRequest::Status => {
                let session = self.controller.session();
                ControlResponse::success(
                    format!("Session is {:?}", session.status).to_lowercase(),
                    ControlPayload::Session(session),
                )
            }
            ControlRequest::Live => ControlResponse::success(
                "Live data",
                ControlPayload::Live(self.controller.live_status()),
            ),
            ControlRequest::Stats => match self.controller.stats() {
                Ok(stats) => ControlResponse::success("Statistics", ControlPayload::Stats(stats)),
                Err(e) => ControlResponse::error(e.to_string()),
            },
        }
    }
}
