//! Configuration loading.
//!
//! Settings come from an optional JSON file, then environment variable
//! overrides, then validation. Every field has a default, so a missing
//! file or a partial one is fine.

use std::path::{Path, PathBuf};
use std::fs;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ADDR, DEFAULT_BATCH_QUEUE_DEPTH, DEFAULT_INITIAL_BATCH,
    DEFAULT_REQUEST_QUEUE_DEPTH, DEFAULT_STREAM_PATH, DEFAULT_TIMED_PATH, FAREWELL_MESSAGE,
    TIMED_LIFETIME, TIMED_TICK_HZ,
};
use crate::frame::Orbit;

/// Top-level configuration for the framecast server.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Listen address.
    pub addr: String,
    /// Route for the client-driven pipelined stream.
    pub stream_path: String,
    /// Route for the time-boxed stream.
    pub timed_path: String,
    /// Animation geometry.
    pub orbit: Orbit,
    /// Pipelined mode settings.
    pub pipeline: PipelineConfig,
    /// Time-boxed mode settings.
    pub timed: TimedConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            timed_path: DEFAULT_TIMED_PATH.to_string(),
            orbit: Orbit::default(),
            pipeline: PipelineConfig::default(),
            timed: TimedConfig::default(),
        }
    }
}

/// Settings for the request → generate → write pipeline.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames sent before the client asks for any.
    pub initial_batch: u64,
    /// Largest count a single request may carry; unlimited when unset.
    pub max_request: Option<u64>,
    /// Capacity of the request queue.
    pub request_queue_depth: usize,
    /// Capacity of the batch queue; bounds buffered batches per connection.
    pub batch_queue_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            initial_batch: DEFAULT_INITIAL_BATCH,
            max_request: None,
            request_queue_depth: DEFAULT_REQUEST_QUEUE_DEPTH,
            batch_queue_depth: DEFAULT_BATCH_QUEUE_DEPTH,
        }
    }
}

/// What each tick of the time-boxed stream carries.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimedPayload {
    /// One coordinate object, phase taken from the wall clock.
    Coordinate,
    /// An RFC 3339 timestamp string.
    Timestamp,
}

/// Settings for the time-boxed push stream.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct TimedConfig {
    /// How long the stream runs before the farewell, in milliseconds.
    pub lifetime_ms: u64,
    /// Payloads per second.
    pub tick_hz: u32,
    /// Per-tick payload kind.
    pub payload: TimedPayload,
    /// Text sent once the lifetime is over.
    pub farewell: String,
}

impl Default for TimedConfig {
    fn default() -> Self {
        Self {
            lifetime_ms: TIMED_LIFETIME.as_millis() as u64,
            tick_hz: TIMED_TICK_HZ,
            payload: TimedPayload::Coordinate,
            farewell: FAREWELL_MESSAGE.to_string(),
        }
    }
}

impl TimedConfig {
    /// Stream lifetime.
    pub fn lifetime(&self) -> Duration {
        Duration::from_millis(self.lifetime_ms)
    }

    /// Time between payloads.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_hz.max(1)
    }
}

impl Config {
    /// Default config file location (`<config dir>/framecast/config.json`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("framecast").join("config.json"))
    }

    /// Load configuration.
    ///
    /// File selection priority:
    /// 1. `explicit` (from `--config`)
    /// 2. `FRAMECAST_CONFIG` env var
    /// 3. [`Config::default_path`], only if it exists
    ///
    /// Explicitly named files must exist. Environment overrides are applied
    /// on top and the result is validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("FRAMECAST_CONFIG").map(PathBuf::from))
            .or_else(|| Self::default_path().filter(|p| p.exists()));

        let mut config = match path {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Apply `FRAMECAST_*` overrides using `lookup` to read variables.
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("FRAMECAST_ADDR") {
            self.addr = addr;
        }

        if let Some(rate) = lookup("FRAMECAST_FRAME_RATE") {
            if let Ok(rate) = rate.parse::<u32>() {
                self.orbit.frame_rate = rate;
            }
        }

        if let Some(initial) = lookup("FRAMECAST_INITIAL_BATCH") {
            if let Ok(initial) = initial.parse::<u64>() {
                self.pipeline.initial_batch = initial;
            }
        }

        if let Some(max) = lookup("FRAMECAST_MAX_REQUEST") {
            if let Ok(max) = max.parse::<u64>() {
                self.pipeline.max_request = Some(max);
            }
        }

        if let Some(lifetime) = lookup("FRAMECAST_TIMED_MS") {
            if let Ok(lifetime) = lifetime.parse::<u64>() {
                self.timed.lifetime_ms = lifetime;
            }
        }
    }

    /// Reject settings the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.addr.is_empty(), "addr must not be empty");

        for path in [&self.stream_path, &self.timed_path] {
            ensure!(path.starts_with('/'), "Route must start with '/': {path:?}");
        }
        ensure!(
            self.stream_path != self.timed_path,
            "stream_path and timed_path must differ (both {:?})",
            self.stream_path
        );

        let orbit = &self.orbit;
        ensure!(orbit.frame_rate > 0, "orbit.frame_rate must be positive");
        ensure!(
            orbit.radius.is_finite() && orbit.center_x.is_finite() && orbit.center_y.is_finite(),
            "orbit geometry must be finite"
        );

        ensure!(
            self.pipeline.request_queue_depth > 0 && self.pipeline.batch_queue_depth > 0,
            "queue depths must be at least 1"
        );
        if let Some(max) = self.pipeline.max_request {
            ensure!(
                self.pipeline.initial_batch <= max,
                "pipeline.initial_batch ({}) exceeds pipeline.max_request ({max})",
                self.pipeline.initial_batch
            );
        }

        ensure!(self.timed.tick_hz > 0, "timed.tick_hz must be positive");
        Ok(())
    }
}
