//! Per-connection coordinator.
//!
//! A [`Coordinator`] owns one client's outbound transport and runs it in
//! one of two modes:
//!
//! - [`Mode::Pipelined`]: the client asks for frames and the server answers
//!   with batches. Three tasks cooperate through two bounded queues:
//!
//! ```text
//!  client ──► RequestReader ──[requests]──► FrameGenerator ──[batches]──► write loop ──► client
//!                                ▲
//!                          initial request
//! ```
//!
//! - [`Mode::TimeBoxed`]: the server pushes one payload per tick for a fixed
//!   lifetime, then a farewell message, then closes. No requests are read.
//!
//! Sessions never return errors: every way a connection can end is recorded
//! in the returned [`SessionSummary`].

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::config::{Config, PipelineConfig, TimedConfig};
use crate::frame::Orbit;
use crate::request::DecodeError;
use crate::transport::{MessageSink, MessageSource};

mod pipelined;
mod timed;

/// How a connection is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Client-driven request/batch stream.
    Pipelined,
    /// Fixed-lifetime push stream.
    TimeBoxed,
}

/// Why a session ended.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client closed or the inbound stream ended.
    ClientClosed,
    /// Reading from the transport failed.
    ReadFailed(String),
    /// The client sent a request that could not be decoded.
    MalformedRequest(DecodeError),
    /// Writing to the transport failed.
    WriteFailed(String),
    /// An outbound payload could not be serialised.
    SerializeFailed(String),
    /// A pipeline task died unexpectedly.
    Aborted(String),
    /// The server is shutting down.
    Shutdown,
    /// A time-boxed stream ran its full lifetime.
    Completed,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientClosed => write!(f, "client closed"),
            Self::ReadFailed(e) => write!(f, "read failed: {e}"),
            Self::MalformedRequest(e) => write!(f, "malformed request: {e}"),
            Self::WriteFailed(e) => write!(f, "write failed: {e}"),
            Self::SerializeFailed(e) => write!(f, "serialization failed: {e}"),
            Self::Aborted(e) => write!(f, "aborted: {e}"),
            Self::Shutdown => write!(f, "server shutdown"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// What a finished session did.
#[derive(Debug, PartialEq, Eq)]
pub struct SessionSummary {
    /// Why the session ended.
    pub end: SessionEnd,
    /// Data messages written (batches or ticks; excludes the farewell).
    pub messages_sent: u64,
    /// Frames written across all messages.
    pub frames_sent: u64,
}

/// Serves one connection.
#[derive(Debug)]
pub struct Coordinator {
    conn_id: String,
    orbit: Orbit,
    pipeline: PipelineConfig,
    timed: TimedConfig,
    shutdown: CancellationToken,
}

impl Coordinator {
    /// Coordinator for connection `conn_id`; stops early when `shutdown` fires.
    pub fn new(conn_id: impl Into<String>, config: &Config, shutdown: CancellationToken) -> Self {
        Self {
            conn_id: conn_id.into(),
            orbit: config.orbit.clone(),
            pipeline: config.pipeline.clone(),
            timed: config.timed.clone(),
            shutdown,
        }
    }

    /// Connection identifier used in log lines.
    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    /// Serve the connection in `mode` until it ends, then close `sink`.
    pub async fn run<R, W>(self, mode: Mode, source: R, sink: W) -> SessionSummary
    where
        R: MessageSource + 'static,
        W: MessageSink,
    {
        match mode {
            Mode::Pipelined => self.stream_frames(source, sink).await,
            Mode::TimeBoxed => self.stream_timed(source, sink).await,
        }
    }
}

/// Close the sink at the end of a session; failures only matter for logs.
async fn close_sink<W: MessageSink>(conn_id: &str, sink: &mut W) {
    if let Err(e) = sink.close().await {
        log::debug!("[Session] {conn_id} close: {e:#}");
    }
}
