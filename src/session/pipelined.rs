//! Pipelined mode: seed a request, then forward batches until the pipeline drains.

use tokio::sync::mpsc;

use super::{close_sink, Coordinator, SessionEnd, SessionSummary};
use crate::generator::{FrameGenerator, GeneratorExit};
use crate::reader::{ReaderExit, RequestReader};
use crate::request::FrameRequest;
use crate::transport::{MessageSink, MessageSource};

impl From<ReaderExit> for SessionEnd {
    fn from(exit: ReaderExit) -> Self {
        match exit {
            ReaderExit::Closed | ReaderExit::StreamEnded => Self::ClientClosed,
            ReaderExit::ReadError(e) => Self::ReadFailed(e),
            ReaderExit::Malformed(e) => Self::MalformedRequest(e),
            ReaderExit::GeneratorGone => Self::Aborted("generator stopped early".to_string()),
            ReaderExit::Cancelled => Self::Shutdown,
        }
    }
}

impl Coordinator {
    pub(super) async fn stream_frames<R, W>(self, source: R, mut sink: W) -> SessionSummary
    where
        R: MessageSource + 'static,
        W: MessageSink,
    {
        let conn_id = self.conn_id;
        let (request_tx, request_rx) = mpsc::channel(self.pipeline.request_queue_depth);
        let (batch_tx, mut batch_rx) = mpsc::channel(self.pipeline.batch_queue_depth);
        let reader_cancel = self.shutdown.child_token();

        let generator = tokio::spawn(FrameGenerator::new(self.orbit).run(request_rx, batch_tx));

        // Queued before the reader owns the sender, so it is always served first.
        if request_tx
            .send(FrameRequest::Count(self.pipeline.initial_batch))
            .await
            .is_err()
        {
            log::warn!("[Session] {conn_id} generator refused the initial request");
        }

        let reader = tokio::spawn(
            RequestReader::new(source, self.pipeline.max_request, conn_id.clone())
                .run(request_tx, reader_cancel.clone()),
        );

        let mut messages_sent = 0u64;
        let mut frames_sent = 0u64;

        let write_end = loop {
            let batch = tokio::select! {
                () = self.shutdown.cancelled() => break Some(SessionEnd::Shutdown),
                batch = batch_rx.recv() => batch,
            };
            // Queue closed: the generator has terminated.
            let Some(batch) = batch else { break None };

            let json = match batch.to_json() {
                Ok(json) => json,
                Err(e) => break Some(SessionEnd::SerializeFailed(e.to_string())),
            };
            if let Err(e) = sink.send_text(&json).await {
                break Some(SessionEnd::WriteFailed(format!("{e:#}")));
            }

            messages_sent += 1;
            frames_sent += batch.len() as u64;
            log::trace!("[Session] {conn_id} sent frames {:?}", batch.indices());
        };

        // Unwind: stop the reader, and free the generator from a pending push.
        reader_cancel.cancel();
        drop(batch_rx);

        let reader_exit = match reader.await {
            Ok(exit) => exit,
            Err(e) => {
                log::error!("[Session] {conn_id} reader task failed: {e}");
                ReaderExit::ReadError(format!("reader task failed: {e}"))
            }
        };
        match generator.await {
            Ok(GeneratorExit::Stopped | GeneratorExit::RequestsClosed) => {}
            Ok(GeneratorExit::OutputClosed) => {
                log::debug!("[Session] {conn_id} generator stopped by closed output");
            }
            Err(e) => log::error!("[Session] {conn_id} generator task failed: {e}"),
        }

        close_sink(&conn_id, &mut sink).await;

        SessionSummary {
            end: write_end.unwrap_or_else(|| reader_exit.into()),
            messages_sent,
            frames_sent,
        }
    }
}
