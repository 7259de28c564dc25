//! Transport seams used by the streaming core.
//!
//! The reader only needs to pull messages and the writer only needs to push
//! text, so each side depends on a one-method-ish trait instead of the
//! WebSocket types. The WebSocket halves from [`crate::ws`] implement both;
//! tests plug in the in-memory pair from `memory`.

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::ws::{WsMessage, WsReader, WsWriter};

/// Inbound half of a message transport.
#[async_trait]
pub trait MessageSource: Send {
    /// Next inbound message, `None` once the stream has ended.
    async fn recv(&mut self) -> Option<Result<WsMessage>>;
}

/// Outbound half of a message transport.
#[async_trait]
pub trait MessageSink: Send {
    /// Write one text message.
    async fn send_text(&mut self, text: &str) -> Result<()>;

    /// Close the transport. Further sends fail.
    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
impl<S> MessageSource for WsReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Option<Result<WsMessage>> {
        WsReader::recv(self).await
    }
}

#[async_trait]
impl<S> MessageSink for WsWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_text(&mut self, text: &str) -> Result<()> {
        WsWriter::send_text(self, text).await
    }

    async fn close(&mut self) -> Result<()> {
        WsWriter::close(self).await
    }
}
