//! Inbound half of a pipelined session.
//!
//! The reader turns client messages into [`FrameRequest`]s for the
//! generator. Whatever ends it (peer close, read error, bad input,
//! cancellation) it always finishes by queueing exactly one
//! [`FrameRequest::Stop`] and dropping its sender, so the generator can
//! never be left waiting on a request that will not come.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::request::{decode, DecodeError, Decoded, FrameRequest};
use crate::transport::MessageSource;

/// Why the reader stopped.
#[derive(Debug, PartialEq, Eq)]
pub enum ReaderExit {
    /// The peer sent a close frame.
    Closed,
    /// The inbound stream ended without a close frame.
    StreamEnded,
    /// The transport reported a read error.
    ReadError(String),
    /// A control message could not be decoded.
    Malformed(DecodeError),
    /// The generator dropped its end of the request queue.
    GeneratorGone,
    /// The session asked the reader to stop.
    Cancelled,
}

/// Reads client requests off a [`MessageSource`].
#[derive(Debug)]
pub struct RequestReader<R> {
    source: R,
    max_request: Option<u64>,
    conn_id: String,
}

impl<R: MessageSource> RequestReader<R> {
    /// Reader that rejects requests above `max_request` frames, if set.
    pub fn new(source: R, max_request: Option<u64>, conn_id: impl Into<String>) -> Self {
        Self {
            source,
            max_request,
            conn_id: conn_id.into(),
        }
    }

    /// Forward requests until the source ends, then signal [`FrameRequest::Stop`].
    pub async fn run(
        mut self,
        requests: mpsc::Sender<FrameRequest>,
        cancel: CancellationToken,
    ) -> ReaderExit {
        let exit = self.forward(&requests, &cancel).await;
        log::debug!("[Reader] {} stopped: {:?}", self.conn_id, exit);

        if requests.send(FrameRequest::Stop).await.is_err() {
            log::debug!("[Reader] {} generator already gone", self.conn_id);
        }
        exit
    }

    async fn forward(
        &mut self,
        requests: &mpsc::Sender<FrameRequest>,
        cancel: &CancellationToken,
    ) -> ReaderExit {
        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => return ReaderExit::Cancelled,
                next = self.source.recv() => next,
            };

            let message = match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => return ReaderExit::ReadError(format!("{e:#}")),
                None => return ReaderExit::StreamEnded,
            };

            let count = match decode(&message, self.max_request) {
                Ok(Decoded::Request(count)) => count,
                Ok(Decoded::Ignore) => continue,
                Ok(Decoded::Closed) => return ReaderExit::Closed,
                Err(e) => {
                    log::warn!("[Reader] {} malformed request: {e}", self.conn_id);
                    return ReaderExit::Malformed(e);
                }
            };

            log::trace!("[Reader] {} requested {count} frames", self.conn_id);

            // The queue is shallow; stay cancellable while the generator is busy.
            tokio::select! {
                () = cancel.cancelled() => return ReaderExit::Cancelled,
                sent = requests.send(FrameRequest::Count(count)) => {
                    if sent.is_err() {
                        return ReaderExit::GeneratorGone;
                    }
                }
            }
        }
    }
}
