//! Outbound encode path.
//!
//! Encoding looks up the message's codec registration, lets the protocol wrap
//! messages bound to dynamic opcodes, encodes the payload and finally asks
//! the protocol for a header sized to that payload.

use bytes::BytesMut;
use tokio_util::codec::Encoder;

use crate::{
    error::{ContractViolation, NetworkError},
    message::MessageRef,
    protocol::{Protocol, ProtocolSlot},
};

/// Append the header and payload for `message` to `dst`.
///
/// Nothing is written to `dst` on failure.
///
/// # Errors
///
/// - [`NetworkError::Codec`] if the message type has no codec or encoding
///   fails.
/// - [`NetworkError::ContractViolation`] if a dynamic message cannot be
///   wrapped.
pub fn encode_message(
    protocol: &dyn Protocol,
    message: MessageRef,
    dst: &mut BytesMut,
) -> Result<(), NetworkError> {
    let mut registration = protocol.codec_registration(message.message_type())?;
    let mut message = message;
    if registration.is_dynamic() {
        let original = message.message_type();
        message = protocol
            .wrap_message(message)
            .map_err(|err| ContractViolation::WrapFailed {
                protocol: protocol.name().to_owned(),
                message_type: original,
                reason: err.to_string(),
            })?;
        if message.message_type() != original {
            registration = protocol.codec_registration(message.message_type())?;
        }
    }

    let mut payload = BytesMut::new();
    registration.codec().encode_message(&*message, &mut payload)?;
    let mut header = BytesMut::new();
    protocol.write_header(&mut header, &registration, &payload)?;

    dst.reserve(header.len() + payload.len());
    dst.extend_from_slice(&header);
    dst.extend_from_slice(&payload);
    tracing::trace!(
        protocol = protocol.name(),
        opcode = registration.opcode(),
        message_type = %message.message_type(),
        len = header.len() + payload.len(),
        "encoded message"
    );
    Ok(())
}

/// [`Encoder`] adapter over [`encode_message`] using a shared protocol slot.
#[derive(Clone, Debug)]
pub struct MessageEncoder {
    protocol: ProtocolSlot,
}

impl MessageEncoder {
    /// Create an encoder writing through `protocol`.
    #[must_use]
    pub fn new(protocol: ProtocolSlot) -> Self { Self { protocol } }
}

impl Encoder<MessageRef> for MessageEncoder {
    type Error = NetworkError;

    fn encode(&mut self, item: MessageRef, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_message(&*self.protocol.current(), item, dst)
    }
}
