//! Watch client: connects to a frame stream and keeps it fed.
//!
//! Prints every text message it receives, one per line. Each frame batch is
//! answered with a request for more frames, the way a browser client tops
//! up its animation buffer.

use std::io::Write;

use anyhow::{Context, Result};

use crate::transport::{MessageSink, MessageSource};
use crate::ws::{self, WsMessage};

/// How the watch client drives the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    /// Frames requested after each batch.
    pub request: u64,
    /// Disconnect after this many batches; 0 watches until the server closes.
    pub batches: u64,
}

/// What a watch session received.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WatchSummary {
    /// Text messages received.
    pub messages: u64,
    /// Messages that were frame batches.
    pub batches: u64,
    /// Frames across all batches.
    pub frames: u64,
    /// Whether the server ended the stream.
    pub closed_by_server: bool,
}

/// Connect to `url` (`http(s)://` accepted) and watch the stream.
///
/// # Errors
///
/// Returns an error if the connection fails, a read or write fails, or
/// `out` cannot be written.
pub async fn watch<O: Write>(url: &str, options: &WatchOptions, out: &mut O) -> Result<WatchSummary> {
    let url = ws::http_to_ws_scheme(url);
    let (writer, reader) = ws::connect(&url).await?;
    log::info!("[Watch] Connected to {url}");
    drive(reader, writer, options, out).await
}

async fn drive<R, W, O>(mut source: R, mut sink: W, options: &WatchOptions, out: &mut O) -> Result<WatchSummary>
where
    R: MessageSource,
    W: MessageSink,
    O: Write,
{
    let mut summary = WatchSummary::default();
    let request = options.request.to_string();

    while let Some(message) = source.recv().await {
        let text = match message.context("Read from server failed")? {
            WsMessage::Text(text) => text,
            WsMessage::Close { code, reason } => {
                log::info!("[Watch] Server closed: {code} {reason}");
                summary.closed_by_server = true;
                break;
            }
            _ => continue,
        };

        writeln!(out, "{text}").context("Failed to write output")?;
        summary.messages += 1;

        let Some(frames) = batch_len(&text) else { continue };
        summary.batches += 1;
        summary.frames += frames;

        if options.batches > 0 && summary.batches >= options.batches {
            sink.close().await?;
            return Ok(summary);
        }
        sink.send_text(&request).await?;
    }

    // Stream over without a close frame counts as the server ending it
    summary.closed_by_server = true;
    Ok(summary)
}

/// Frame count when `text` is a frame batch (a JSON array).
fn batch_len(text: &str) -> Option<u64> {
    match serde_json::from_str::<serde_json::Value>(text).ok()? {
        serde_json::Value::Array(frames) => Some(frames.len() as u64),
        _ => None,
    }
}
