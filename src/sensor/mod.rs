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

// Sensor module
//
// A sensor port is opened per session and owned by the acquisition task.
// Frame reads are bounded by the port's read timeout and never fail the
// session: every outcome is reported through `FrameRead`.

pub mod frame;
pub mod serial;

pub use frame::{decode_frame, Frame, FrameError, FrameHeader, VitalSigns};
pub use serial::{SerialOpener, SerialSensorPort};

use crate::error::{OpenError, ReadError};
use async_trait::async_trait;
use std::time::Duration;

/// Outcome of a single bounded frame read
#[derive(Debug, Clone, PartialEq)]
pub enum FrameRead {
    Decoded(Frame),
    /// Read timeout elapsed without a complete frame
    NoData,
    /// Malformed frame or transport error; transient
    ReadError(ReadError),
}

/// An open hardware channel producing decoded frames
#[async_trait]
pub trait SensorPort: Send {
    /// Read one frame, waiting at most the configured read timeout
    async fn read_frame(&mut self) -> FrameRead;

    /// Release the channel
    async fn close(&mut self);
}

/// Opens sensor ports by identifier
#[async_trait]
pub trait SensorOpener: Send + Sync {
    async fn open(
        &self,
        port_identifier: &str,
        bit_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn SensorPort>, OpenError>;
}
