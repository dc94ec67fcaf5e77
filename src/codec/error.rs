//! Error types for the codec layer.
//!
//! [`CodecError`] covers everything that can go wrong while a header is parsed
//! or a payload is transformed. One variant is not a failure at all:
//! [`CodecError::Incomplete`] is the suspend signal raised when an attempt
//! needs more bytes than are buffered. The decoder turns it into "no message
//! yet" and replays the attempt once more data arrives.

use std::io;

use thiserror::Error;

use crate::message::MessageType;

/// Errors raised by header readers, header writers and payload codecs.
#[derive(Debug, Error)]
pub enum CodecError {
    /// More bytes are required before the attempt can complete.
    #[error("insufficient data: {needed} more bytes required")]
    Incomplete {
        /// Minimum number of additional bytes needed.
        needed: usize,
    },

    /// The header names an opcode with no bound codec.
    ///
    /// `length` is the best-effort size of the payload that follows the
    /// header. `None` or zero means the payload size is unknown and the
    /// stream cannot be resynchronised.
    #[error("unknown opcode {opcode:#x} (payload length hint: {length:?})")]
    UnknownPacket {
        /// Opcode read from the header.
        opcode: u32,
        /// Payload length to skip, if known.
        length: Option<usize>,
    },

    /// A codec read past the payload length declared by the header.
    #[error("payload overrun: only {limit} bytes left in payload")]
    PayloadOverrun {
        /// Bytes that were still readable when the overrun occurred.
        limit: usize,
    },

    /// Payload or header bytes are structurally invalid.
    #[error("malformed data: {0}")]
    Malformed(String),

    /// A frame or buffered input exceeds the configured maximum.
    #[error("frame exceeds max length: {size} > {max}")]
    Oversized {
        /// Observed size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// No codec is registered for the message type being encoded.
    #[error("no codec registered for message type {message_type}")]
    UnregisteredMessage {
        /// Message type that was looked up.
        message_type: MessageType,
    },

    /// A codec was asked to encode a message of the wrong type.
    #[error("codec for {expected} cannot encode {actual}")]
    TypeMismatch {
        /// Message type the codec is bound to.
        expected: MessageType,
        /// Message type that was supplied.
        actual: MessageType,
    },

    /// Payload serialisation failed.
    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Payload deserialisation failed.
    #[error("decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// Transport layer I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    /// Returns true for the "wait for more bytes" signal.
    #[must_use]
    pub fn is_incomplete(&self) -> bool { matches!(self, Self::Incomplete { .. }) }

    /// Returns the error category as a string for logging and metrics.
    ///
    /// One of `"incomplete"`, `"unknown_opcode"`, `"framing"`, `"payload"`
    /// or `"io"`.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Incomplete { .. } => "incomplete",
            Self::UnknownPacket { .. } | Self::UnregisteredMessage { .. } => "unknown_opcode",
            Self::PayloadOverrun { .. } | Self::Oversized { .. } => "framing",
            Self::Malformed(_) | Self::TypeMismatch { .. } | Self::Encode(_) | Self::Decode(_) => {
                "payload"
            }
            Self::Io(_) => "io",
        }
    }
}

impl From<CodecError> for io::Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => e,
            incomplete @ CodecError::Incomplete { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, incomplete)
            }
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::incomplete(CodecError::Incomplete { needed: 1 }, "incomplete")]
    #[case::unknown(CodecError::UnknownPacket { opcode: 9, length: None }, "unknown_opcode")]
    #[case::overrun(CodecError::PayloadOverrun { limit: 0 }, "framing")]
    #[case::oversized(CodecError::Oversized { size: 10, max: 5 }, "framing")]
    #[case::malformed(CodecError::Malformed("bad".into()), "payload")]
    #[case::io(CodecError::Io(io::Error::other("reset")), "io")]
    fn error_type_categorises(#[case] err: CodecError, #[case] expected: &str) {
        assert_eq!(err.error_type(), expected);
    }

    #[test]
    fn converts_to_io_error_kinds() {
        let io_err: io::Error = CodecError::Malformed("bad".into()).into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);

        let io_err: io::Error = CodecError::Incomplete { needed: 2 }.into();
        assert_eq!(io_err.kind(), io::ErrorKind::UnexpectedEof);

        let io_err: io::Error = CodecError::Io(io::Error::other("reset")).into();
        assert_eq!(io_err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn unknown_packet_display_includes_hint() {
        let err = CodecError::UnknownPacket {
            opcode: 0x2a,
            length: Some(4),
        };
        assert_eq!(
            err.to_string(),
            "unknown opcode 0x2a (payload length hint: Some(4))"
        );
    }
}
