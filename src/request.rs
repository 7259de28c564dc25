//! Control messages: how many more frames the client wants.
//!
//! Clients normally send the count as decimal text (`"30"`). A binary
//! message is also accepted, in which case only its first byte is read as
//! the count. That path exists for compatibility with older clients and
//! caps requests at 255; the rest of the payload is ignored.

use thiserror::Error;

use crate::ws::WsMessage;

/// Instruction on the request queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRequest {
    /// Produce this many more frames, continuing from the current index.
    Count(u64),
    /// No more requests will follow; shut the generator down.
    Stop,
}

/// A control message that cannot be turned into a request.
///
/// Any of these ends the connection; bad input is never skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Text that is not a non-negative base-10 integer.
    #[error("not a frame count: {0:?}")]
    NotANumber(String),

    /// Binary message with no payload byte to read.
    #[error("empty binary request")]
    EmptyBinary,

    /// Count above the configured per-request limit.
    #[error("request for {requested} frames exceeds limit of {limit}")]
    TooLarge {
        /// Frames asked for.
        requested: u64,
        /// Configured maximum.
        limit: u64,
    },
}

/// Outcome of decoding one inbound message.
#[derive(Debug, PartialEq, Eq)]
pub enum Decoded {
    /// A frame request to forward.
    Request(u64),
    /// Transport bookkeeping (ping/pong); nothing to forward.
    Ignore,
    /// The peer closed the connection.
    Closed,
}

/// Decode one inbound message, enforcing `max_request` when one is set.
pub fn decode(message: &WsMessage, max_request: Option<u64>) -> Result<Decoded, DecodeError> {
    let count = match message {
        // `.ok()` discards the ParseIntError; the offending text is the useful part
        WsMessage::Text(text) => text
            .parse::<u64>()
            .ok()
            .ok_or_else(|| DecodeError::NotANumber(text.clone()))?,
        WsMessage::Binary(data) => u64::from(*data.first().ok_or(DecodeError::EmptyBinary)?),
        WsMessage::Ping(_) | WsMessage::Pong(_) => return Ok(Decoded::Ignore),
        WsMessage::Close { .. } => return Ok(Decoded::Closed),
    };

    if let Some(limit) = max_request.filter(|limit| count > *limit) {
        return Err(DecodeError::TooLarge {
            requested: count,
            limit,
        });
    }
    Ok(Decoded::Request(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: Option<u64> = Some(10_000);

    fn text(s: &str) -> WsMessage {
        WsMessage::Text(s.to_string())
    }

    #[test]
    fn test_decode_text_count() {
        assert_eq!(decode(&text("30"), LIMIT), Ok(Decoded::Request(30)));
        assert_eq!(decode(&text("0"), LIMIT), Ok(Decoded::Request(0)));
        assert_eq!(decode(&text("+7"), LIMIT), Ok(Decoded::Request(7)));
    }

    #[test]
    fn test_decode_text_rejects_garbage() {
        for bad in ["", "abc", "3.5", " 30", "30\n", "0x10", "-1", "-30", "-0"] {
            assert_eq!(
                decode(&text(bad), LIMIT),
                Err(DecodeError::NotANumber(bad.to_string())),
                "input {bad:?}"
            );
        }
    }

    #[test]
    fn test_decode_binary_reads_first_byte_only() {
        let msg = WsMessage::Binary(vec![42, 255, 255, 255]);
        assert_eq!(decode(&msg, LIMIT), Ok(Decoded::Request(42)));

        let msg = WsMessage::Binary(vec![255]);
        assert_eq!(decode(&msg, LIMIT), Ok(Decoded::Request(255)));
    }

    #[test]
    fn test_decode_empty_binary() {
        assert_eq!(
            decode(&WsMessage::Binary(Vec::new()), LIMIT),
            Err(DecodeError::EmptyBinary)
        );
    }

    #[test]
    fn test_decode_enforces_limit() {
        assert_eq!(decode(&text("10000"), LIMIT), Ok(Decoded::Request(10_000)));
        assert_eq!(
            decode(&text("10001"), LIMIT),
            Err(DecodeError::TooLarge {
                requested: 10_001,
                limit: 10_000
            })
        );
        // Oversized binary counts hit the same limit
        assert!(decode(&WsMessage::Binary(vec![200]), Some(100)).is_err());
    }

    #[test]
    fn test_decode_without_limit_accepts_any_count() {
        assert_eq!(decode(&text("20000"), None), Ok(Decoded::Request(20_000)));
        assert_eq!(
            decode(&text("18446744073709551615"), None),
            Ok(Decoded::Request(u64::MAX))
        );
    }

    #[test]
    fn test_decode_control_frames() {
        assert_eq!(decode(&WsMessage::Ping(vec![1]), LIMIT), Ok(Decoded::Ignore));
        assert_eq!(decode(&WsMessage::Pong(Vec::new()), LIMIT), Ok(Decoded::Ignore));
        let close = WsMessage::Close {
            code: 1000,
            reason: String::new(),
        };
        assert_eq!(decode(&close, LIMIT), Ok(Decoded::Closed));
    }

    #[test]
    fn test_decode_error_messages() {
        let err = DecodeError::TooLarge {
            requested: 5,
            limit: 4,
        };
        assert_eq!(err.to_string(), "request for 5 frames exceeds limit of 4");
        assert_eq!(
            DecodeError::NotANumber("x".into()).to_string(),
            r#"not a frame count: "x""#
        );
    }
}
