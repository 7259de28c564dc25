//! Time-boxed mode: push one payload per tick, then say goodbye.

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;

use super::{close_sink, Coordinator, SessionEnd, SessionSummary};
use crate::config::TimedPayload;
use crate::frame::Orbit;
use crate::transport::{MessageSink, MessageSource};
use crate::ws::WsMessage;

/// Payload for a tick at wall-clock time `now`.
///
/// Coordinates advance one revolution per second, phased on the
/// sub-second part of the clock so all clients see the same position.
fn tick_payload(payload: TimedPayload, orbit: &Orbit, now: DateTime<Utc>) -> serde_json::Result<String> {
    match payload {
        TimedPayload::Coordinate => {
            let phase = f64::from(now.timestamp_subsec_millis()) / 1000.0;
            serde_json::to_string(&orbit.coordinate_at(phase))
        }
        TimedPayload::Timestamp => Ok(now.to_rfc3339()),
    }
}

impl Coordinator {
    pub(super) async fn stream_timed<R, W>(self, mut source: R, mut sink: W) -> SessionSummary
    where
        R: MessageSource,
        W: MessageSink,
    {
        let conn_id = self.conn_id;
        let mut ticker = tokio::time::interval(self.timed.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let deadline = tokio::time::sleep(self.timed.lifetime());
        tokio::pin!(deadline);

        let mut sent = 0u64;

        let end = loop {
            tokio::select! {
                // Lifetime wins ties so nothing is sent after the farewell slot.
                biased;

                () = &mut deadline => {
                    break match sink.send_text(&self.timed.farewell).await {
                        Ok(()) => SessionEnd::Completed,
                        Err(e) => SessionEnd::WriteFailed(format!("{e:#}")),
                    };
                }
                () = self.shutdown.cancelled() => break SessionEnd::Shutdown,
                inbound = source.recv() => match inbound {
                    // Nothing is requested in this mode; only watch for the peer leaving.
                    Some(Ok(WsMessage::Close { .. })) | None => break SessionEnd::ClientClosed,
                    Some(Err(e)) => break SessionEnd::ReadFailed(format!("{e:#}")),
                    Some(Ok(_)) => {}
                },
                _ = ticker.tick() => {
                    let text = match tick_payload(self.timed.payload, &self.orbit, Utc::now()) {
                        Ok(text) => text,
                        Err(e) => break SessionEnd::SerializeFailed(e.to_string()),
                    };
                    if let Err(e) = sink.send_text(&text).await {
                        break SessionEnd::WriteFailed(format!("{e:#}"));
                    }
                    sent += 1;
                }
            }
        };

        log::debug!("[Timed] {conn_id} sent {sent} ticks: {end}");
        close_sink(&conn_id, &mut sink).await;

        SessionSummary {
            end,
            messages_sent: sent,
            frames_sent: sent,
        }
    }
}
