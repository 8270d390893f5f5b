use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One accepted sample: seconds since session start and the decoded value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub elapsed_seconds: f64,
    pub value: f64,
}

impl Reading {
    pub fn new(elapsed_seconds: f64, value: f64) -> Self {
        Self {
            elapsed_seconds,
            value,
        }
    }
}

/// Insertion-ordered readings of the current session.
///
/// Cloning yields another handle to the same buffer. The acquisition task
/// is the only writer; any number of observers may snapshot concurrently.
#[derive(Debug, Clone, Default)]
pub struct LiveBuffer {
    readings: Arc<RwLock<Vec<Reading>>>,
}

impl LiveBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reading: Reading) {
        self.readings.write().push(reading);
    }

    pub fn clear(&self) {
        self.readings.write().clear();
    }

    pub fn len(&self) -> usize {
        self.readings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.read().is_empty()
    }

    /// Copy of all readings in acquisition order
    pub fn snapshot(&self) -> Vec<Reading> {
        self.readings.read().clone()
    }

    pub fn last(&self) -> Option<Reading> {
        self.readings.read().last().copied()
    }
}
