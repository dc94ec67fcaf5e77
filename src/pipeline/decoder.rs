//! Inbound framing loop.
//!
//! Each call to [`MessageDecoder::decode`] is one attempt over the bytes
//! buffered so far. The attempt reads through a [`ReplayCursor`] and commits
//! its progress to the buffer only when it completes, so an attempt that runs
//! out of bytes leaves the buffer untouched and simply runs again from the
//! same frame boundary once more data has arrived.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::{
    codec::CodecError,
    cursor::ReplayCursor,
    error::{ContractViolation, NetworkError},
    message::MessageRef,
    metrics,
    protocol::ProtocolSlot,
};

/// Decodes a byte stream into messages using the session's active protocol.
///
/// The protocol is looked up from the shared [`ProtocolSlot`] on every
/// attempt, so a protocol switch takes effect at the next frame boundary.
#[derive(Clone, Debug)]
pub struct MessageDecoder {
    protocol: ProtocolSlot,
}

/// Outcome of one attempt, with the number of bytes to commit.
enum Attempt {
    Suspend,
    Message(MessageRef, usize),
    Failed(NetworkError, usize),
}

impl MessageDecoder {
    /// Create a decoder reading through `protocol`.
    #[must_use]
    pub fn new(protocol: ProtocolSlot) -> Self { Self { protocol } }

    /// Slot the decoder resolves its protocol from.
    #[must_use]
    pub fn protocol(&self) -> &ProtocolSlot { &self.protocol }

    fn attempt(&self, buf: &[u8]) -> Attempt {
        let protocol = self.protocol.current();
        let mut cursor = ReplayCursor::new(buf);

        let codec = match protocol.read_header(&mut cursor) {
            Ok(Some(codec)) => codec,
            Ok(None) => {
                tracing::error!(
                    protocol = protocol.name(),
                    "read_header returned no codec on success"
                );
                let violation = ContractViolation::NoCodec {
                    protocol: protocol.name().to_owned(),
                };
                return Attempt::Failed(violation.into(), cursor.position());
            }
            Err(CodecError::Incomplete { .. }) => return Attempt::Suspend,
            Err(CodecError::UnknownPacket { opcode, length }) => {
                return Self::skip_unknown(buf, cursor.position(), protocol.name(), opcode, length);
            }
            Err(err) => return Attempt::Failed(err.into(), cursor.position()),
        };

        match codec.decode_message(&mut cursor) {
            Ok(message) => {
                let trailing = cursor.finish_bound();
                if trailing > 0 {
                    tracing::debug!(
                        protocol = protocol.name(),
                        trailing,
                        "codec left payload bytes unread"
                    );
                }
                Attempt::Message(message, cursor.position())
            }
            Err(CodecError::Incomplete { .. }) => Attempt::Suspend,
            Err(err) => {
                // A bounded payload can be stepped over; the next frame still
                // starts where the header said it would.
                cursor.finish_bound();
                Attempt::Failed(err.into(), cursor.position())
            }
        }
    }

    fn skip_unknown(
        buf: &[u8],
        header_len: usize,
        protocol: &str,
        opcode: u32,
        length: Option<usize>,
    ) -> Attempt {
        let skip = length.filter(|&len| len > 0);
        let consumed = header_len.saturating_add(skip.unwrap_or(0));
        if consumed > buf.len() {
            // Replay until the whole payload can be stepped over at once.
            return Attempt::Suspend;
        }
        metrics::inc_unknown_opcodes();
        tracing::warn!(protocol, opcode, skip = ?skip, "unrecognized opcode");
        Attempt::Failed(NetworkError::UnrecognizedOpcode { opcode, skip }, consumed)
    }
}

impl Decoder for MessageDecoder {
    type Item = MessageRef;
    type Error = NetworkError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        match self.attempt(src) {
            Attempt::Suspend => Ok(None),
            Attempt::Message(message, consumed) => {
                src.advance(consumed);
                metrics::inc_messages(metrics::Direction::Inbound);
                tracing::debug!(message_type = %message.message_type(), consumed, "decoded message");
                Ok(Some(message))
            }
            Attempt::Failed(err, consumed) => {
                src.advance(consumed);
                metrics::inc_errors(err.error_type());
                Err(err)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(message) => Ok(Some(message)),
            None if buf.is_empty() => Ok(None),
            None => Err(NetworkError::TruncatedStream {
                buffered: buf.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, BytesMut};
    use rstest::{fixture, rstest};
    use std::sync::Arc;
    use tokio_util::codec::Decoder;

    use super::*;
    use crate::{
        codec::BincodeCodec,
        message::Message,
        protocol::{
            CodecRegistry,
            LengthPrefixedHeader,
            OpcodeHeader,
            Protocol,
            RegistryProtocol,
        },
    };

    #[derive(bincode::Encode, bincode::Decode, Debug, PartialEq)]
    struct Ping(u32);

    impl Message for Ping {}

    fn slot<H: crate::protocol::HeaderFormat>(header: H) -> ProtocolSlot {
        let mut registry = CodecRegistry::new();
        registry
            .bind(1, BincodeCodec::<Ping>::new())
            .expect("opcode 1 is free");
        let protocol: Arc<dyn Protocol> = Arc::new(
            RegistryProtocol::new("test", header, registry).expect("opcodes fit the header"),
        );
        ProtocolSlot::new(protocol)
    }

    #[fixture]
    fn decoder() -> MessageDecoder {
        MessageDecoder::new(slot(LengthPrefixedHeader::default()))
    }

    fn frame(opcode: u16, payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u16(opcode);
        buf.put_u32(u32::try_from(payload.len()).expect("payload fits u32"));
        buf.put_slice(payload);
        buf
    }

    #[rstest]
    fn partial_frame_leaves_buffer_untouched(mut decoder: MessageDecoder) {
        let full = frame(1, &[0x07]);
        let mut buf = BytesMut::from(full.get(..4).expect("frame has a header"));
        assert!(decoder.decode(&mut buf).expect("no error").is_none());
        assert_eq!(buf.len(), 4, "suspended attempt must not consume bytes");

        buf.extend_from_slice(full.get(4..).expect("rest of frame"));
        let message = decoder
            .decode(&mut buf)
            .expect("no error")
            .expect("message complete");
        assert_eq!(message.downcast_ref::<Ping>(), Some(&Ping(7)));
        assert!(buf.is_empty());
    }

    #[rstest]
    fn unknown_opcode_waits_for_whole_skip(mut decoder: MessageDecoder) {
        let full = frame(9, &[1, 2, 3]);
        let mut buf = BytesMut::from(full.get(..7).expect("header plus one byte"));
        assert!(decoder.decode(&mut buf).expect("suspends").is_none());
        assert_eq!(buf.len(), 7);

        buf.extend_from_slice(full.get(7..).expect("rest of payload"));
        let err = decoder.decode(&mut buf).expect_err("opcode 9 is unknown");
        assert!(matches!(
            err,
            NetworkError::UnrecognizedOpcode {
                opcode: 9,
                skip: Some(3)
            }
        ));
        assert!(buf.is_empty(), "payload of unknown opcode is skipped");
    }

    #[test]
    fn unknown_opcode_without_length_consumes_header_only() {
        let mut decoder = MessageDecoder::new(slot(OpcodeHeader));
        let mut buf = BytesMut::from(&[0x00, 0x09, 0xaa][..]);
        let err = decoder.decode(&mut buf).expect_err("opcode 9 is unknown");
        assert!(matches!(
            err,
            NetworkError::UnrecognizedOpcode { skip: None, .. }
        ));
        assert!(!err.is_recoverable());
        assert_eq!(buf.as_ref(), &[0xaa]);
    }

    #[rstest]
    fn eof_inside_frame_is_truncation(mut decoder: MessageDecoder) {
        let mut buf = BytesMut::from(&[0x00, 0x01, 0x00][..]);
        let err = decoder.decode_eof(&mut buf).expect_err("frame is incomplete");
        assert!(matches!(err, NetworkError::TruncatedStream { buffered: 3 }));
    }

    #[rstest]
    fn eof_on_boundary_is_clean(mut decoder: MessageDecoder) {
        let mut buf = BytesMut::new();
        assert!(decoder.decode_eof(&mut buf).expect("clean close").is_none());
    }

    struct NoCodecProtocol;

    impl Protocol for NoCodecProtocol {
        fn name(&self) -> &str { "broken" }

        fn read_header(
            &self,
            src: &mut ReplayCursor<'_>,
        ) -> Result<Option<crate::codec::CodecHandle>, CodecError> {
            src.read_u8()?;
            Ok(None)
        }

        fn codec_registration(
            &self,
            message_type: crate::message::MessageType,
        ) -> Result<crate::protocol::CodecRegistration, CodecError> {
            Err(CodecError::UnregisteredMessage { message_type })
        }

        fn write_header(
            &self,
            _header: &mut BytesMut,
            _registration: &crate::protocol::CodecRegistration,
            _payload: &[u8],
        ) -> Result<(), CodecError> {
            Ok(())
        }
    }

    #[test]
    fn missing_codec_is_contract_violation() {
        let mut decoder = MessageDecoder::new(ProtocolSlot::new(Arc::new(NoCodecProtocol)));
        let mut buf = BytesMut::from(&[0x01, 0x02][..]);
        let err = decoder.decode(&mut buf).expect_err("contract violated");
        assert!(matches!(
            err,
            NetworkError::ContractViolation(ContractViolation::NoCodec { .. })
        ));
        assert!(!err.is_recoverable());
    }

    #[rstest]
    fn malformed_bounded_payload_is_stepped_over(mut decoder: MessageDecoder) {
        // 0xfb announces a four-byte integer that the bound cuts short.
        let mut buf = frame(1, &[0xfb, 0x00]);
        buf.extend_from_slice(&frame(1, &[0x05]));

        let err = decoder.decode(&mut buf).expect_err("payload is malformed");
        assert!(matches!(err, NetworkError::Codec(_)));
        let next = decoder
            .decode(&mut buf)
            .expect("next frame decodes")
            .expect("next frame is complete");
        assert_eq!(next.downcast_ref::<Ping>(), Some(&Ping(5)));
    }
}
