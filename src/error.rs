//! Canonical error and result types for the crate.
//!
//! [`NetworkError`] is the single surface reported by the decoder, the encode
//! path and session sends. Insufficient input is deliberately absent: the
//! decoder absorbs [`CodecError::Incomplete`] and waits for more bytes.

use std::io;

use thiserror::Error;

use crate::{codec::CodecError, message::MessageType, recovery::RecoveryPolicy};

/// A protocol broke its side of the [`Protocol`](crate::protocol::Protocol)
/// contract.
#[derive(Debug, Error)]
pub enum ContractViolation {
    /// `read_header` claimed success without resolving a codec.
    #[error("protocol {protocol} read a header but resolved no codec")]
    NoCodec {
        /// Name of the offending protocol.
        protocol: String,
    },
    /// `wrap_message` failed for a message with a dynamic opcode.
    #[error("protocol {protocol} could not wrap {message_type}: {reason}")]
    WrapFailed {
        /// Name of the offending protocol.
        protocol: String,
        /// Message type that was being sent.
        message_type: MessageType,
        /// Failure reported by the wrapper.
        reason: String,
    },
}

/// Top-level error type exposed by `pulseframe`.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The header named an opcode with no bound codec.
    ///
    /// When `skip` is a positive length the payload has been consumed and the
    /// stream is still in sync; otherwise the stream is lost.
    #[error("unrecognized opcode {opcode:#x} (skipped {skip:?} bytes)")]
    UnrecognizedOpcode {
        /// Opcode read from the header.
        opcode: u32,
        /// Payload bytes skipped to resynchronise.
        skip: Option<usize>,
    },

    /// A protocol implementation violated its contract.
    #[error("protocol contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),

    /// The transport no longer accepts writes.
    #[error("channel closed")]
    ChannelClosed,

    /// The peer closed the stream part way through a frame.
    #[error("stream ended with {buffered} undecoded bytes")]
    TruncatedStream {
        /// Bytes left in the buffer at end of stream.
        buffered: usize,
    },

    /// Header or payload transformation failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Transport I/O failed.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

impl NetworkError {
    /// Default recovery policy for this error.
    ///
    /// Only an unknown opcode whose payload was skipped leaves the stream in
    /// sync; a closed channel concerns a single send and is reported to the
    /// sender. Everything else disconnects.
    #[must_use]
    pub fn recovery_policy(&self) -> RecoveryPolicy {
        match self {
            Self::UnrecognizedOpcode { skip: Some(1..), .. } | Self::ChannelClosed => {
                RecoveryPolicy::Drop
            }
            _ => RecoveryPolicy::Disconnect,
        }
    }

    /// Returns true if the default policy keeps the connection open.
    #[must_use]
    pub fn is_recoverable(&self) -> bool { self.recovery_policy().keeps_connection() }

    /// Returns the error category as a string for logging and metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::UnrecognizedOpcode { .. } => "unknown_opcode",
            Self::ContractViolation(_) => "contract_violation",
            Self::ChannelClosed => "channel_closed",
            Self::TruncatedStream { .. } => "truncated",
            Self::Codec(err) => err.error_type(),
            Self::Io(_) => "io",
        }
    }
}

/// Per-message failures collected by `send_all`.
///
/// Each entry pairs the message's index in the batch with its error. Every
/// message was attempted regardless of earlier failures.
#[derive(Debug, Error)]
#[error("{} of the messages failed to send", failures.len())]
pub struct SendAllError {
    /// Index and error for each failed message.
    pub failures: Vec<(usize, NetworkError)>,
}

/// Canonical result alias used by `pulseframe` public APIs.
pub type Result<T> = std::result::Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::skipped(NetworkError::UnrecognizedOpcode { opcode: 1, skip: Some(4) }, RecoveryPolicy::Drop)]
    #[case::zero_skip(NetworkError::UnrecognizedOpcode { opcode: 1, skip: Some(0) }, RecoveryPolicy::Disconnect)]
    #[case::no_skip(NetworkError::UnrecognizedOpcode { opcode: 1, skip: None }, RecoveryPolicy::Disconnect)]
    #[case::closed(NetworkError::ChannelClosed, RecoveryPolicy::Drop)]
    #[case::truncated(NetworkError::TruncatedStream { buffered: 3 }, RecoveryPolicy::Disconnect)]
    #[case::contract(
        NetworkError::ContractViolation(ContractViolation::NoCodec { protocol: "p".into() }),
        RecoveryPolicy::Disconnect
    )]
    #[case::codec(NetworkError::Codec(CodecError::Malformed("x".into())), RecoveryPolicy::Disconnect)]
    fn default_recovery_policy(#[case] err: NetworkError, #[case] expected: RecoveryPolicy) {
        assert_eq!(err.recovery_policy(), expected);
    }

    #[test]
    fn error_type_delegates_to_codec() {
        let err = NetworkError::from(CodecError::Oversized { size: 2, max: 1 });
        assert_eq!(err.error_type(), "framing");
    }

    #[test]
    fn send_all_error_counts_failures() {
        let err = SendAllError {
            failures: vec![(0, NetworkError::ChannelClosed), (2, NetworkError::ChannelClosed)],
        };
        assert_eq!(err.to_string(), "2 of the messages failed to send");
    }
}
