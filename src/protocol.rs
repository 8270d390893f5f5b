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

use crate::buffer::Reading;
use crate::stats::{round3, Stats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Session lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Recording,
    Stopping,
    Completed,
    Failed,
}

impl SessionStatus {
    /// An acquisition task may still be running
    pub fn is_active(self) -> bool {
        matches!(self, SessionStatus::Recording | SessionStatus::Stopping)
    }
}

/// One recording lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Session {
    pub id: Uuid,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub duration_sec: f64,
    pub port_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Whether `stop` saw the acquisition task finish within its grace period
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StopCompletion {
    Finished,
    /// Grace period elapsed; the task is still winding down
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StopSummary {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub completion: StopCompletion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub total_points: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusSummary {
    pub is_recording: bool,
    pub point_count: usize,
}

/// Reading rounded for display
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LivePoint {
    pub time: f64,
    pub value: f64,
}

impl From<&Reading> for LivePoint {
    fn from(reading: &Reading) -> Self {
        Self {
            time: round3(reading.elapsed_seconds),
            value: round3(reading.value),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveStatus {
    pub is_recording: bool,
    pub data_points: Vec<LivePoint>,
    pub total_points: usize,
}

/// Control commands
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ControlRequest {
    Start {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        port: Option<String>,
    },
    Stop,
    Status,
    Live,
    Stats,
}

/// Payload attached to a successful control response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ControlPayload {
    Started { session_id: Uuid, port: String, duration: f64 },
    Stopped(StopSummary),
    Live(LiveStatus),
    Stats(Stats),
    Session(Session),
}

/// Response message for control operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ControlPayload>,
}

impl ControlResponse {
    pub fn success(message: impl Into<String>, data: ControlPayload) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}
