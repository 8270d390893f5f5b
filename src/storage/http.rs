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

// HTTP remote sink implementation

use super::backend::RemoteSink;
use crate::buffer::Reading;
use crate::error::ForwardError;
use crate::stats::round3;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;

/// POSTs each reading as `{"time_sec": .., "<value_field>": ..}`
pub struct HttpRemoteSink {
    client: Client,
    url: String,
    value_field: String,
}

impl HttpRemoteSink {
    pub fn new(url: String, value_field: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url,
            value_field,
        })
    }

    pub fn payload(&self, reading: &Reading) -> Value {
        let mut body = Map::new();
        body.insert(
            "time_sec".to_string(),
            Value::from(round3(reading.elapsed_seconds)),
        );
        body.insert(self.value_field.clone(), Value::from(reading.value));
        Value::Object(body)
    }
}

#[async_trait]
impl RemoteSink for HttpRemoteSink {
    async fn forward(&self, reading: &Reading) -> Result<(), ForwardError> {
        let response = self
            .client
            .post(&self.url)
            .json(&self.payload(reading))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForwardError::Status(status));
        }

        Ok(())
    }

    fn sink_type(&self) -> &str {
        "http"
    }
}
