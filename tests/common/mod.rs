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

// Scripted sensors and remote sinks shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::Mutex;
use radar_recorder::config::RecorderConfig;
use radar_recorder::sensor::frame::{decode_frame, encode_packet, encode_vital_signs_packet};
use radar_recorder::sensor::{Frame, FrameError, FrameRead, SensorOpener, SensorPort};
use radar_recorder::{ForwardError, OpenError, ReadError, Reading, RemoteSink};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One scripted sensor response
#[derive(Debug, Clone)]
pub enum Step {
    Value(f32),
    /// Decoded frame without a vital-signs TLV
    Missing,
    NoData,
    /// Bytes that failed to decode; the port itself is healthy
    Malformed,
    /// EOF or I/O failure on the port
    Disconnected,
}

pub fn frame(frame_number: u32, value: f32) -> Frame {
    let mut buf = BytesMut::from(&encode_vital_signs_packet(frame_number, &[value])[..]);
    decode_frame(&mut buf).unwrap().unwrap()
}

fn frame_without_vital_signs(frame_number: u32) -> Frame {
    let mut buf = BytesMut::from(&encode_packet(frame_number, &[])[..]);
    decode_frame(&mut buf).unwrap().unwrap()
}

#[derive(Clone)]
pub struct ScriptedOpener {
    steps: Vec<Step>,
    /// After the script runs out, keep producing `Value(n)` frames
    repeat: bool,
    interval: Duration,
    fail_with: Option<String>,
    /// Cancel this token right after serving the given number of value frames
    cancel_after: Option<(usize, CancellationToken)>,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicBool>,
    pub served: Arc<AtomicUsize>,
}

impl ScriptedOpener {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            repeat: false,
            interval: Duration::from_millis(5),
            fail_with: None,
            cancel_after: None,
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
            served: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Endless stream of value frames
    pub fn streaming(interval: Duration) -> Self {
        let mut opener = Self::new(vec![]);
        opener.repeat = true;
        opener.interval = interval;
        opener
    }

    pub fn failing(message: &str) -> Self {
        let mut opener = Self::new(vec![]);
        opener.fail_with = Some(message.to_string());
        opener
    }

    pub fn cancel_after(mut self, frames: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((frames, token));
        self
    }
}

#[async_trait]
impl SensorOpener for ScriptedOpener {
    async fn open(
        &self,
        port_identifier: &str,
        _bit_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn SensorPort>, OpenError> {
        if let Some(message) = &self.fail_with {
            return Err(OpenError::Other(format!("{}: {}", port_identifier, message)));
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        self.closed.store(false, Ordering::SeqCst);
        Ok(Box::new(ScriptedPort {
            steps: self.steps.iter().cloned().collect(),
            repeat: self.repeat,
            interval: self.interval,
            read_timeout,
            frame_number: 0,
            cancel_after: self.cancel_after.clone(),
            closed: self.closed.clone(),
            served: self.served.clone(),
        }))
    }
}

pub struct ScriptedPort {
    steps: VecDeque<Step>,
    repeat: bool,
    interval: Duration,
    read_timeout: Duration,
    frame_number: u32,
    cancel_after: Option<(usize, CancellationToken)>,
    closed: Arc<AtomicBool>,
    served: Arc<AtomicUsize>,
}

impl ScriptedPort {
    fn serve_value(&mut self, value: f32) -> FrameRead {
        self.frame_number += 1;
        let served = self.served.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = &self.cancel_after {
            if served == *after {
                token.cancel();
            }
        }
        FrameRead::Decoded(frame(self.frame_number, value))
    }
}

#[async_trait]
impl SensorPort for ScriptedPort {
    async fn read_frame(&mut self) -> FrameRead {
        let step = match self.steps.pop_front() {
            Some(step) => step,
            None if self.repeat => Step::Value(self.frame_number as f32),
            None => Step::NoData,
        };

        match step {
            Step::Value(value) => {
                tokio::time::sleep(self.interval).await;
                self.serve_value(value)
            }
            Step::Missing => {
                self.frame_number += 1;
                FrameRead::Decoded(frame_without_vital_signs(self.frame_number))
            }
            Step::NoData => {
                tokio::time::sleep(self.read_timeout).await;
                FrameRead::NoData
            }
            Step::Malformed => FrameRead::ReadError(ReadError::Frame(FrameError::BadLength(12))),
            Step::Disconnected => {
                FrameRead::ReadError(ReadError::Transport("device unplugged".to_string()))
            }
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Remote sink that records everything it receives
#[derive(Default)]
pub struct RecordingRemote {
    pub received: Mutex<Vec<Reading>>,
}

#[async_trait]
impl RemoteSink for RecordingRemote {
    async fn forward(&self, reading: &Reading) -> Result<(), ForwardError> {
        self.received.lock().push(*reading);
        Ok(())
    }

    fn sink_type(&self) -> &str {
        "recording"
    }
}

/// Remote sink that rejects every reading
#[derive(Default)]
pub struct FailingRemote {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl RemoteSink for FailingRemote {
    async fn forward(&self, _reading: &Reading) -> Result<(), ForwardError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ForwardError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR))
    }

    fn sink_type(&self) -> &str {
        "failing"
    }
}

/// Remote sink that never answers in time
#[derive(Default)]
pub struct HangingRemote {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl RemoteSink for HangingRemote {
    async fn forward(&self, _reading: &Reading) -> Result<(), ForwardError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }

    fn sink_type(&self) -> &str {
        "hanging"
    }
}

/// Remote sink whose first forward panics after a delay; later ones succeed
pub struct PanickingRemote {
    delay: Duration,
    panicked: AtomicBool,
    pub attempts: AtomicUsize,
}

impl PanickingRemote {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            panicked: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemoteSink for PanickingRemote {
    async fn forward(&self, _reading: &Reading) -> Result<(), ForwardError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.panicked.swap(true, Ordering::SeqCst) {
            tokio::time::sleep(self.delay).await;
            panic!("remote sink crashed");
        }
        Ok(())
    }

    fn sink_type(&self) -> &str {
        "panicking"
    }
}

/// Fast-running configuration writing into `dir`
pub fn test_config(dir: &Path) -> RecorderConfig {
    let mut config = RecorderConfig::default();
    config.sensor.port = "/dev/ttyTEST0".to_string();
    config.sensor.read_timeout_ms = 50;
    config.storage.output_dir = dir.to_path_buf();
    config.remote.enabled = false;
    config.remote.timeout_ms = 50;
    config.session.stop_grace_seconds = 2.0;
    config
}

/// Data rows of a CSV record, header excluded
pub fn csv_rows(path: &Path) -> Vec<String> {
    let content = std::fs::read_to_string(path).unwrap();
    content.lines().skip(1).map(str::to_string).collect()
}

/// Poll until `condition` holds or `limit` elapses
pub async fn wait_until<F: Fn() -> bool>(condition: F, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
