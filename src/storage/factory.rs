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

// Remote sink factory

use super::backend::RemoteSink;
use super::http::HttpRemoteSink;
use crate::config::RemoteConfig;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::info;

pub struct RemoteSinkFactory;

impl RemoteSinkFactory {
    /// Create the remote sink, or `None` when mirroring is disabled
    pub fn create(config: &RemoteConfig, value_field: &str) -> Result<Option<Arc<dyn RemoteSink>>> {
        if !config.enabled {
            info!("Remote mirroring disabled");
            return Ok(None);
        }

        let url = config
            .url
            .clone()
            .ok_or_else(|| anyhow!("remote.url missing"))?;

        info!("Mirroring readings to {}", url);
        let sink = HttpRemoteSink::new(url, value_field.to_string(), config.timeout())?;
        Ok(Some(Arc::new(sink)))
    }
}
