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
use crate::error::StatsError;
use serde::{Deserialize, Serialize};

/// Aggregate statistics over a session's readings.
///
/// Fields carry full precision; `rounded` produces the presentation form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_points: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation
    pub std: f64,
    /// Elapsed time of the last reading
    pub duration_sec: f64,
}

impl Stats {
    pub fn rounded(&self) -> Self {
        Self {
            total_points: self.total_points,
            mean: round3(self.mean),
            min: round3(self.min),
            max: round3(self.max),
            std: round3(self.std),
            duration_sec: round3(self.duration_sec),
        }
    }
}

pub struct StatsCalculator;

impl StatsCalculator {
    pub fn compute(readings: &[Reading]) -> Result<Stats, StatsError> {
        let last = readings.last().ok_or(StatsError::NoData)?;
        let n = readings.len() as f64;

        let (sum, min, max) = readings.iter().fold(
            (0.0, f64::INFINITY, f64::NEG_INFINITY),
            |(sum, min, max), r| (sum + r.value, min.min(r.value), max.max(r.value)),
        );
        let mean = sum / n;
        let variance = readings
            .iter()
            .map(|r| (r.value - mean).powi(2))
            .sum::<f64>()
            / n;

        Ok(Stats {
            total_points: readings.len(),
            mean,
            min,
            max,
            std: variance.sqrt(),
            duration_sec: last.elapsed_seconds,
        })
    }
}

/// Round to 3 decimal places for presentation
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
