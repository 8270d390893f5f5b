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

// mmWave Radar Recorder
//
// Records one bounded-duration session at a time from a vital-signs radar:
// - Decodes TLV frames from a serial port with bounded reads
// - Persists every reading to a per-session CSV, flushed per row
// - Mirrors readings to an HTTP endpoint, best effort
// - Exposes live readings and statistics while recording
// - Stops cooperatively via a cancellation token

pub mod acquisition;
pub mod buffer;
pub mod config;
pub mod control;
pub mod error;
pub mod protocol;
pub mod recorder;
pub mod sensor;
pub mod stats;
pub mod storage;

// Re-export main types
pub use buffer::{LiveBuffer, Reading};
pub use config::{load_config, load_config_with_env, RecorderConfig};
pub use control::ControlInterface;
pub use error::{ControlError, ForwardError, OpenError, ReadError, StatsError};
pub use protocol::{
    ControlPayload, ControlRequest, ControlResponse, LivePoint, LiveStatus, Session,
    SessionStatus, StatusSummary, StopCompletion, StopSummary,
};
pub use recorder::{SessionController, SessionHandle};
pub use sensor::{FrameRead, SensorOpener, SensorPort};
pub use stats::{Stats, StatsCalculator};
pub use storage::{HttpRemoteSink, LocalSink, RemoteSink, RemoteSinkFactory};
