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

// Acquisition loop
//
// Opening -> Streaming -> Completed | Failed
//
// Each accepted reading is fanned out in order: local CSV (flushed), live
// buffer, then the remote mirror under a timeout. Only an open failure
// fails the session; frame and forward errors are absorbed here.

use crate::buffer::{LiveBuffer, Reading};
use crate::error::{ForwardError, OpenError};
use crate::protocol::{Session, SessionStatus};
use crate::sensor::{FrameRead, SensorOpener, SensorPort};
use crate::storage::{LocalSink, RemoteSink};
use chrono::Utc;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pause after a transport error so a dead port does not spin the task
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Per-session parameters resolved from configuration and the start request
#[derive(Debug, Clone)]
pub struct AcquisitionSettings {
    pub port_identifier: String,
    pub duration: Duration,
    pub bit_rate: u32,
    pub read_timeout: Duration,
    pub value_field: String,
    pub output_dir: PathBuf,
    pub file_prefix: String,
    pub remote_timeout: Duration,
}

/// Final accounting of an acquisition task
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionReport {
    pub status: SessionStatus,
    pub readings: usize,
    pub output_path: Option<PathBuf>,
}

pub struct Acquisition {
    settings: AcquisitionSettings,
    session: Arc<RwLock<Session>>,
    buffer: LiveBuffer,
    opener: Arc<dyn SensorOpener>,
    remote: Option<Arc<dyn RemoteSink>>,
    cancel: CancellationToken,
}

impl Acquisition {
    pub fn new(
        settings: AcquisitionSettings,
        session: Arc<RwLock<Session>>,
        buffer: LiveBuffer,
        opener: Arc<dyn SensorOpener>,
        remote: Option<Arc<dyn RemoteSink>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            settings,
            session,
            buffer,
            opener,
            remote,
            cancel,
        }
    }

    pub async fn run(self) -> AcquisitionReport {
        // Opening: the record file exists even if the port never opens
        let mut local = match LocalSink::create(
            &self.settings.output_dir,
            &self.settings.file_prefix,
            &self.settings.value_field,
        )
        .await
        {
            Ok(local) => local,
            Err(e) => return self.fail(OpenError::Record(e), None),
        };
        let output_path = local.path().to_path_buf();
        self.session.write().output_path = Some(output_path.clone());

        let mut port = match self
            .opener
            .open(
                &self.settings.port_identifier,
                self.settings.bit_rate,
                self.settings.read_timeout,
            )
            .await
        {
            Ok(port) => port,
            Err(e) => {
                if let Err(close_err) = local.close().await {
                    warn!("Failed to close {}: {}", output_path.display(), close_err);
                }
                return self.fail(e, Some(output_path));
            }
        };

        info!(
            "Recording started on {} for {:?}",
            self.settings.port_identifier, self.settings.duration
        );

        let readings = self.stream(port.as_mut(), &mut local).await;

        port.close().await;
        if let Err(e) = local.close().await {
            error!("Failed to close {}: {}", output_path.display(), e);
        }

        let status = {
            let mut session = self.session.write();
            session.status = SessionStatus::Completed;
            session.end_time = Some(Utc::now());
            session.status
        };
        info!(
            "Recording completed: {} readings saved to {}",
            readings,
            output_path.display()
        );

        AcquisitionReport {
            status,
            readings,
            output_path: Some(output_path),
        }
    }

    /// Streaming phase; returns the number of durably recorded readings
    async fn stream(&self, port: &mut dyn SensorPort, local: &mut LocalSink) -> usize {
        let started = Instant::now();

        loop {
            if self.cancel.is_cancelled() {
                info!("Stop requested, leaving acquisition loop");
                break;
            }

            let elapsed = started.elapsed();
            if elapsed >= self.settings.duration {
                debug!("Duration {:?} elapsed", self.settings.duration);
                break;
            }

            match port.read_frame().await {
                FrameRead::Decoded(frame) => match frame.value(&self.settings.value_field) {
                    Some(value) => {
                        let reading = Reading::new(elapsed.as_secs_f64(), value);
                        self.accept(reading, local).await;
                    }
                    None => debug!(
                        "Frame {} has no '{}' field, skipping",
                        frame.header.frame_number, self.settings.value_field
                    ),
                },
                FrameRead::NoData => {}
                FrameRead::ReadError(e) => {
                    debug!("Skipping unreadable frame: {}", e);
                    if e.is_transport() {
                        tokio::time::sleep(READ_ERROR_BACKOFF).await;
                    }
                }
            }
        }

        local.rows()
    }

    /// Fan one reading out to the sinks
    async fn accept(&self, reading: Reading, local: &mut LocalSink) {
        if let Err(e) = local.append(&reading).await {
            error!(
                "Failed to record reading at {:.3}s: {}",
                reading.elapsed_seconds, e
            );
            return;
        }

        self.buffer.push(reading);

        if let Some(remote) = &self.remote {
            let timeout = self.settings.remote_timeout;
            let result = match tokio::time::timeout(timeout, remote.forward(&reading)).await {
                Ok(result) => result,
                Err(_) => Err(ForwardError::Timeout(timeout)),
            };
            if let Err(e) = result {
                warn!("Cloud sync failed: {}", e);
            }
        }
    }

    fn fail(&self, err: OpenError, output_path: Option<PathBuf>) -> AcquisitionReport {
        error!("Recording failed: {}", err);

        let mut session = self.session.write();
        session.status = SessionStatus::Failed;
        session.error = Some(err.to_string());
        session.end_time = Some(Utc::now());

        AcquisitionReport {
            status: SessionStatus::Failed,
            readings: 0,
            output_path,
        }
    }
}
