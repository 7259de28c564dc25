//! Application-wide constants for framecast.
//!
//! This module centralizes the defaults that shape the animation and the
//! streaming pipeline. Every value here can be overridden through
//! [`Config`](crate::config::Config); these are only the starting points.
//!
//! # Categories
//!
//! - **Animation**: orbit geometry and frame rate
//! - **Pipeline**: batch sizes and queue depths
//! - **Time-boxed mode**: tick rate, lifetime and farewell text
//! - **Server**: bind address and route paths

use std::time::Duration;

// ============================================================================
// Animation
// ============================================================================

/// Animation frame rate in frames per second.
///
/// Frame `i` is sampled at `t = i / FRAME_RATE` seconds, so one full
/// revolution of the orbit takes exactly this many frames.
pub const FRAME_RATE: u32 = 60;

/// Orbit radius in canvas units.
pub const ORBIT_RADIUS: f64 = 100.0;

/// Horizontal centre of the orbit.
pub const ORBIT_CENTER_X: f64 = 200.0;

/// Vertical centre of the orbit.
pub const ORBIT_CENTER_Y: f64 = 200.0;

/// Digits after the decimal point in serialised coordinates.
pub const COORDINATE_DIGITS: usize = 2;

// ============================================================================
// Pipeline
// ============================================================================

/// Frames requested implicitly when a client connects.
///
/// One second of animation, enough for the client to start drawing
/// before its first explicit request arrives.
pub const DEFAULT_INITIAL_BATCH: u64 = 60;

/// Capacity of the request queue (reader → generator).
pub const DEFAULT_REQUEST_QUEUE_DEPTH: usize = 1;

/// Capacity of the frame-batch queue (generator → writer).
///
/// Kept at one so a slow writer stalls the generator after a single
/// buffered batch.
pub const DEFAULT_BATCH_QUEUE_DEPTH: usize = 1;

// ============================================================================
// Time-boxed mode
// ============================================================================

/// Coordinates emitted per second in time-boxed mode.
pub const TIMED_TICK_HZ: u32 = 70;

/// Wall-clock lifetime of a time-boxed connection.
pub const TIMED_LIFETIME: Duration = Duration::from_secs(10);

/// Final text message sent before a time-boxed connection closes.
pub const FAREWELL_MESSAGE: &str = "Done!";

// ============================================================================
// Server
// ============================================================================

/// Default listen address.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Route serving the client-driven pipelined stream.
pub const DEFAULT_STREAM_PATH: &str = "/tick";

/// Route serving the time-boxed push stream.
pub const DEFAULT_TIMED_PATH: &str = "/timed";

/// Back-off after a failed `accept()` before trying again.
pub const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);
