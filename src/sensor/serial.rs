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

// Serial port sensor backed by tokio-serial

use super::frame::decode_frame;
use super::{FrameRead, SensorOpener, SensorPort};
use crate::error::{OpenError, ReadError};
use async_trait::async_trait;
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

const READ_CHUNK: usize = 4096;

/// Opens mmWave radars attached over a serial port
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialOpener;

#[async_trait]
impl SensorOpener for SerialOpener {
    async fn open(
        &self,
        port_identifier: &str,
        bit_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn SensorPort>, OpenError> {
        let port = SerialSensorPort::open(port_identifier, bit_rate, read_timeout)?;
        Ok(Box::new(port))
    }
}

/// Frame reader over a byte stream, normally a serial port
pub struct SerialSensorPort<S = SerialStream> {
    port_name: String,
    stream: Option<S>,
    buf: BytesMut,
    read_timeout: Duration,
}

impl SerialSensorPort<SerialStream> {
    pub fn open(port_name: &str, bit_rate: u32, read_timeout: Duration) -> Result<Self, OpenError> {
        info!("Opening serial port: {} at {} baud", port_name, bit_rate);

        let stream = tokio_serial::new(port_name, bit_rate)
            .timeout(read_timeout)
            .open_native_async()
            .map_err(|source| OpenError::Port {
                port: port_name.to_string(),
                source,
            })?;

        // Drop whatever the radar streamed before we attached
        if let Err(e) = stream.clear(ClearBuffer::Input) {
            warn!("Failed to clear input buffer on {}: {}", port_name, e);
        }

        Ok(Self::from_stream(port_name, stream, read_timeout))
    }
}

impl<S> SerialSensorPort<S>
where
    S: AsyncRead + Unpin + Send,
{
    /// Wrap an already-open byte stream
    pub fn from_stream(port_name: &str, stream: S, read_timeout: Duration) -> Self {
        Self {
            port_name: port_name.to_string(),
            stream: Some(stream),
            buf: BytesMut::with_capacity(READ_CHUNK * 2),
            read_timeout,
        }
    }
}

#[async_trait]
impl<S> SensorPort for SerialSensorPort<S>
where
    S: AsyncRead + Unpin + Send,
{
    async fn read_frame(&mut self) -> FrameRead {
        let deadline = Instant::now() + self.read_timeout;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            match decode_frame(&mut self.buf) {
                Ok(Some(frame)) => return FrameRead::Decoded(frame),
                Ok(None) => {}
                Err(e) => return FrameRead::ReadError(ReadError::Frame(e)),
            }

            let Some(stream) = self.stream.as_mut() else {
                return FrameRead::ReadError(ReadError::Transport("port is closed".to_string()));
            };

            match tokio::time::timeout_at(deadline, stream.read(&mut chunk)).await {
                Err(_) => return FrameRead::NoData,
                Ok(Ok(0)) => {
                    return FrameRead::ReadError(ReadError::Transport(format!(
                        "{} returned EOF",
                        self.port_name
                    )))
                }
                Ok(Ok(n)) => {
                    debug!("Read {} bytes from {}", n, self.port_name);
                    self.buf.extend_from_slice(&chunk[..n]);
                }
                Ok(Err(e)) => {
                    return FrameRead::ReadError(ReadError::Transport(format!(
                        "serial read failed: {}",
                        e
                    )))
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.stream.take().is_some() {
            info!("Closed serial port {}", self.port_name);
        }
        self.buf.clear();
    }
}
