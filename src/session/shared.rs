//! State shared by every session flavour.

use std::sync::Arc;

use bytes::BytesMut;

use super::ConnectionId;
use crate::{
    error::NetworkError,
    message::MessageRef,
    metrics,
    pipeline::{MessageDecoder, encode_message},
    protocol::{Protocol, ProtocolSlot},
    transport::Transport,
};

/// Identity, active protocol and transport of one connection.
pub struct SessionCore {
    id: ConnectionId,
    protocol: ProtocolSlot,
    transport: Arc<dyn Transport>,
}

impl SessionCore {
    /// Assemble the core of a new session.
    pub fn new(id: ConnectionId, protocol: Arc<dyn Protocol>, transport: Arc<dyn Transport>) -> Self {
        Self {
            id,
            protocol: ProtocolSlot::new(protocol),
            transport,
        }
    }

    /// Connection identifier.
    #[must_use]
    pub fn id(&self) -> ConnectionId { self.id }

    /// Shared slot holding the active protocol.
    #[must_use]
    pub fn protocol_slot(&self) -> &ProtocolSlot { &self.protocol }

    /// Replace the active protocol; the next frame is read with the new one.
    pub fn set_protocol(&self, protocol: Arc<dyn Protocol>) {
        let to = protocol.name().to_owned();
        let previous = self.protocol.replace(protocol);
        tracing::info!(
            session_id = %self.id,
            from = previous.name(),
            to = %to,
            "protocol switched"
        );
    }

    /// Decoder bound to this session's protocol slot.
    #[must_use]
    pub fn decoder(&self) -> MessageDecoder { MessageDecoder::new(self.protocol.clone()) }

    /// Returns true while the transport accepts writes.
    #[must_use]
    pub fn is_open(&self) -> bool { self.transport.is_open() }

    /// Close the transport. Later writes fail with
    /// [`NetworkError::ChannelClosed`].
    pub fn close(&self) { self.transport.close(); }

    /// Encode `message` with the active protocol and write it out.
    ///
    /// # Errors
    ///
    /// [`NetworkError::ChannelClosed`] if the transport is closed, otherwise
    /// any encode error from [`encode_message`].
    pub fn write_now(&self, message: MessageRef) -> Result<(), NetworkError> {
        if !self.transport.is_open() {
            return Err(NetworkError::ChannelClosed);
        }
        let mut buf = BytesMut::new();
        encode_message(&*self.protocol.current(), message, &mut buf)?;
        self.transport.write(buf.freeze())?;
        metrics::inc_messages(metrics::Direction::Outbound);
        Ok(())
    }
}

impl std::fmt::Debug for SessionCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCore")
            .field("id", &self.id)
            .field("protocol", &self.protocol)
            .field("open", &self.is_open())
            .finish()
    }
}
