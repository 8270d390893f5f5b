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

// Remote sink trait for best-effort mirroring

use crate::buffer::Reading;
use crate::error::ForwardError;
use async_trait::async_trait;

/// Mirror of accepted readings on a remote endpoint
///
/// Forwarding is fire-and-forget: callers bound each call with a timeout and
/// discard failures. Implementations must not retry or queue internally.
#[async_trait]
pub trait RemoteSink: Send + Sync {
    /// Send a single reading
    async fn forward(&self, reading: &Reading) -> Result<(), ForwardError>;

    /// Get sink type identifier
    fn sink_type(&self) -> &str;
}
