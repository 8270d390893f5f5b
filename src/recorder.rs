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

use crate::acquisition::{Acquisition, AcquisitionReport, AcquisitionSettings};
use crate::buffer::{LiveBuffer, Reading};
use crate::config::RecorderConfig;
use crate::error::{ControlError, StatsError};
use crate::protocol::{
    LivePoint, LiveStatus, Session, SessionStatus, StatusSummary, StopCompletion, StopSummary,
};
use crate::sensor::{SensorOpener, SerialOpener};
use crate::stats::{Stats, StatsCalculator};
use crate::storage::{RemoteSink, RemoteSinkFactory};
use anyhow::Result;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as TokioMutex;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Returned by a successful `start`
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHandle {
    pub id: Uuid,
    pub port_identifier: String,
    pub duration: Duration,
}

/// Owns the single recording session and its acquisition task
pub struct SessionController {
    config: RecorderConfig,
    opener: Arc<dyn SensorOpener>,
    remote: Option<Arc<dyn RemoteSink>>,
    session: Arc<RwLock<Session>>,
    buffer: LiveBuffer,
    cancel: Mutex<Option<CancellationToken>>,
    task: TokioMutex<Option<JoinHandle<AcquisitionReport>>>,
}

impl SessionController {
    pub fn new(
        config: RecorderConfig,
        opener: Arc<dyn SensorOpener>,
        remote: Option<Arc<dyn RemoteSink>>,
    ) -> Self {
        Self {
            config,
            opener,
            remote,
            session: Arc::new(RwLock::new(Session::default())),
            buffer: LiveBuffer::new(),
            cancel: Mutex::new(None),
            task: TokioMutex::new(None),
        }
    }

    /// Controller reading from serial ports and mirroring per `config.remote`
    pub fn from_config(config: RecorderConfig) -> Result<Self> {
        let remote = RemoteSinkFactory::create(&config.remote, &config.sensor.value_field)?;
        Ok(Self::new(config, Arc::new(SerialOpener), remote))
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Start a session and return without waiting for data
    pub async fn start(
        &self,
        duration: Duration,
        port_identifier: &str,
    ) -> Result<SessionHandle, ControlError> {
        if duration.is_zero() {
            return Err(ControlError::InvalidDuration);
        }
        self.reap_finished().await;
        if self.session.read().status.is_active() {
            return Err(ControlError::AlreadyRecording);
        }

        // Held until the new handle is stored so `stop` cannot miss it
        let mut task = self.task.lock().await;

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        {
            let mut session = self.session.write();
            if session.status.is_active() {
                return Err(ControlError::AlreadyRecording);
            }

            *session = Session {
                id,
                status: SessionStatus::Recording,
                start_time: Some(Utc::now()),
                end_time: None,
                duration_sec: duration.as_secs_f64(),
                port_identifier: port_identifier.to_string(),
                output_path: None,
                error: None,
            };
            self.buffer.clear();
            *self.cancel.lock() = Some(cancel.clone());
        }

        let acquisition = Acquisition::new(
            self.settings(duration, port_identifier),
            self.session.clone(),
            self.buffer.clone(),
            self.opener.clone(),
            self.remote.clone(),
            cancel,
        );
        *task = Some(tokio::spawn(acquisition.run()));

        info!("Session {} started on {}", id, port_identifier);
        Ok(SessionHandle {
            id,
            port_identifier: port_identifier.to_string(),
            duration,
        })
    }

    fn settings(&self, duration: Duration, port_identifier: &str) -> AcquisitionSettings {
        AcquisitionSettings {
            port_identifier: port_identifier.to_string(),
            duration,
            bit_rate: self.config.sensor.bit_rate,
            read_timeout: self.config.sensor.read_timeout(),
            value_field: self.config.sensor.value_field.clone(),
            output_dir: self.config.storage.output_dir.clone(),
            file_prefix: self.config.storage.file_prefix.clone(),
            remote_timeout: self.config.remote.timeout(),
        }
    }

    /// Request cooperative cancellation and wait up to the grace period
    pub async fn stop(&self) -> Result<StopSummary, ControlError> {
        let cancel = {
            let mut session = self.session.write();
            if session.status != SessionStatus::Recording {
                return Err(ControlError::NotRecording);
            }
            session.status = SessionStatus::Stopping;
            self.cancel.lock().take()
        };

        if let Some(cancel) = cancel {
            cancel.cancel();
        }

        let grace = self.config.session.stop_grace();
        let completion = match tokio::time::timeout(grace, self.join()).await {
            Ok(()) => StopCompletion::Finished,
            Err(_) => {
                warn!(
                    "Acquisition did not finish within {:?}; it will stop on its next iteration",
                    grace
                );
                StopCompletion::Pending
            }
        };

        let session = self.session.read().clone();
        info!("Session {} stop: {:?}", session.id, session.status);

        Ok(StopSummary {
            session_id: session.id,
            status: session.status,
            completion,
            output_path: session.output_path,
            total_points: self.buffer.len(),
        })
    }

    /// Wait for the current session to end on its own
    pub async fn wait(&self) -> Session {
        self.join().await;
        self.session.read().clone()
    }

    /// Reap the acquisition task. Cancel-safe: an interrupted join leaves the
    /// handle in place for the next caller.
    async fn join(&self) {
        let mut task = self.task.lock().await;
        let Some(handle) = task.as_mut() else {
            return;
        };

        let result = handle.await;
        *task = None;
        self.settle(result);
    }

    /// Collect an exited task nobody joined, e.g. one that panicked after
    /// `stop` gave up waiting. Never blocks on a running task.
    async fn reap_finished(&self) {
        let Ok(mut task) = self.task.try_lock() else {
            return;
        };
        if !task.as_ref().is_some_and(|handle| handle.is_finished()) {
            return;
        }
        if let Some(handle) = task.take() {
            self.settle(handle.await);
        }
    }

    fn settle(&self, result: Result<AcquisitionReport, JoinError>) {
        if let Err(e) = result {
            error!("Acquisition task ended abnormally: {}", e);
            let mut session = self.session.write();
            if session.status.is_active() {
                session.status = SessionStatus::Failed;
                session.error = Some(format!("acquisition task ended abnormally: {}", e));
                session.end_time = Some(Utc::now());
            }
        }
    }

    /// Non-blocking recording flag and point count
    pub fn status(&self) -> StatusSummary {
        StatusSummary {
            is_recording: self.is_recording(),
            point_count: self.buffer.len(),
        }
    }

    /// Snapshot of the current (or most recent) session
    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    pub fn is_recording(&self) -> bool {
        self.session.read().status.is_active()
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.buffer.snapshot()
    }

    pub fn live_status(&self) -> LiveStatus {
        let readings = self.buffer.snapshot();
        LiveStatus {
            is_recording: self.is_recording(),
            total_points: readings.len(),
            data_points: readings.iter().map(LivePoint::from).collect(),
        }
    }

    /// Statistics over the live buffer, rounded for presentation
    pub fn stats(&self) -> Result<Stats, StatsError> {
        StatsCalculator::compute(&self.buffer.snapshot()).map(|stats| stats.rounded())
    }

    /// Stop an active session, if any, before exit
    pub async fn shutdown(&self) {
        match self.stop().await {
            Ok(summary) => info!(
                "Stopped session {} with {} points",
                summary.session_id, summary.total_points
            ),
            Err(ControlError::NotRecording) => {}
            Err(e) => warn!("Shutdown stop failed: {}", e),
        }
    }
}
