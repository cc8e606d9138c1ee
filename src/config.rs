//! Configuration types for rx-combine operations

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::StreamResult;

/// Timing for a single animation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub duration: Duration,
    pub delay: Duration,
}

impl AnimationConfig {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Parse a config from JSON; missing fields fall back to the defaults
    pub fn from_json(json: &str) -> StreamResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(300),
            delay: Duration::ZERO,
        }
    }
}

/// Settings for callback-driven subscriptions created by `sink`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Label used in log output for this subscription
    pub label: String,
    /// Log every delivered value at `trace` level
    pub trace_values: bool,
}

impl SinkConfig {
    pub fn from_json(json: &str) -> StreamResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            label: "sink".to_string(),
            trace_values: false,
        }
    }
}
