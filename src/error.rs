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

use crate::sensor::FrameError;
use thiserror::Error;

/// Control-plane rejections. None of these mutate session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("Recording already in progress")]
    AlreadyRecording,

    #[error("No recording in progress")]
    NotRecording,

    #[error("Duration must be positive")]
    InvalidDuration,
}

/// Statistics over an empty buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("No data available")]
    NoData,
}

/// Fatal to a session: the sensor channel or its local record could not be opened.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("Failed to open sensor port '{port}': {source}")]
    Port {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("Failed to create record file: {0}")]
    Record(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Per-frame read failure. Never fatal: the acquisition loop skips it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// Bytes arrived but did not form a valid packet
    #[error("Malformed frame: {0}")]
    Frame(#[from] FrameError),

    /// The channel itself failed (EOF, I/O error, closed port)
    #[error("{0}")]
    Transport(String),
}

impl ReadError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ReadError::Transport(_))
    }
}

/// Remote mirror failure. Always swallowed by the acquisition loop.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Remote request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Remote endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Remote forward timed out after {0:?}")]
    Timeout(std::time::Duration),
}
