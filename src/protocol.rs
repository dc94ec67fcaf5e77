//! Per-connection protocol policy.
//!
//! A [`Protocol`] owns header framing and the opcode to codec bindings for one
//! connection. Sessions hold their active protocol in a [`ProtocolSlot`] so it
//! can be switched at runtime, for example after a handshake upgrades the
//! connection, while the decoder keeps reading from the same slot.
//!
//! [`RegistryProtocol`] assembles a protocol from a [`CodecRegistry`] and a
//! [`HeaderFormat`]; implement [`Protocol`] directly for anything it cannot
//! express.

use std::{
    error::Error,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use bytes::BytesMut;

use crate::{
    codec::{CodecError, CodecHandle},
    cursor::ReplayCursor,
    message::{MessageRef, MessageType},
};

pub mod header;
pub mod registry;

pub use header::{FrameHeader, HeaderFormat, LengthPrefixedHeader, OpcodeHeader, VarIntHeader};
pub use registry::{CodecRegistration, CodecRegistry, RegistryError};

/// Boxed error returned by message wrappers.
pub type WrapError = Box<dyn Error + Send + Sync>;

/// Header framing plus codec lookup for one wire protocol.
pub trait Protocol: Send + Sync + 'static {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Consume exactly the header at `src` and resolve the payload codec.
    ///
    /// A header reader may [`bound`](ReplayCursor::bound) the cursor to the
    /// declared payload length; the decoder skips any payload bytes the codec
    /// leaves unread.
    ///
    /// `Ok(None)` is a contract violation: the decoder aborts the connection
    /// instead of dropping the message.
    ///
    /// # Errors
    ///
    /// - [`CodecError::Incomplete`] when the header has not fully arrived.
    /// - [`CodecError::UnknownPacket`] when the opcode has no codec. Include
    ///   the payload length when the header declares one so the decoder can
    ///   skip the payload and keep the stream in sync.
    fn read_header(&self, src: &mut ReplayCursor<'_>) -> Result<Option<CodecHandle>, CodecError>;

    /// Look up the codec registration used to encode `message_type`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnregisteredMessage`] if no codec is bound.
    fn codec_registration(&self, message_type: MessageType)
    -> Result<CodecRegistration, CodecError>;

    /// Append the header for an already encoded `payload` to `header`.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the header cannot represent the opcode or
    /// payload length.
    fn write_header(
        &self,
        header: &mut BytesMut,
        registration: &CodecRegistration,
        payload: &[u8],
    ) -> Result<(), CodecError>;

    /// Substitute the message sent for one whose codec has a dynamic opcode.
    ///
    /// The default returns the message unchanged.
    ///
    /// # Errors
    ///
    /// Returns a [`WrapError`] when the message cannot be wrapped.
    fn wrap_message(&self, message: MessageRef) -> Result<MessageRef, WrapError> { Ok(message) }
}

impl fmt::Debug for dyn Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protocol").field("name", &self.name()).finish()
    }
}

/// Swappable holder for a session's active protocol.
///
/// Clones share the same slot, so the decoder observes a switch made by the
/// session on its next attempt.
#[derive(Clone)]
pub struct ProtocolSlot(Arc<RwLock<Arc<dyn Protocol>>>);

impl ProtocolSlot {
    /// Create a slot holding `protocol`.
    #[must_use]
    pub fn new(protocol: Arc<dyn Protocol>) -> Self { Self(Arc::new(RwLock::new(protocol))) }

    /// Return the protocol active right now.
    #[must_use]
    pub fn current(&self) -> Arc<dyn Protocol> {
        Arc::clone(&self.0.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Install `protocol`, returning the one it replaces.
    pub fn replace(&self, protocol: Arc<dyn Protocol>) -> Arc<dyn Protocol> {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, protocol)
    }
}

impl fmt::Debug for ProtocolSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProtocolSlot")
            .field(&self.current().name())
            .finish()
    }
}

type Wrapper = Box<dyn Fn(MessageRef) -> Result<MessageRef, WrapError> + Send + Sync>;

/// Protocol built from a codec registry and a header format.
///
/// # Examples
///
/// ```
/// use pulseframe::{
///     codec::BincodeCodec,
///     message::Message,
///     protocol::{CodecRegistry, LengthPrefixedHeader, Protocol, RegistryProtocol},
/// };
///
/// #[derive(bincode::Encode, bincode::Decode, Debug)]
/// struct Ping(u32);
/// impl Message for Ping {}
///
/// let mut registry = CodecRegistry::new();
/// registry.bind(1, BincodeCodec::<Ping>::new()).unwrap();
/// let protocol =
///     RegistryProtocol::new("game", LengthPrefixedHeader::default(), registry).unwrap();
/// assert_eq!(protocol.name(), "game");
/// ```
pub struct RegistryProtocol<H> {
    name: String,
    header: H,
    registry: CodecRegistry,
    wrapper: Option<Wrapper>,
}

impl<H: HeaderFormat> RegistryProtocol<H> {
    /// Combine a name, a header format and a codec registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::OpcodeOutOfRange`] if `registry` binds an
    /// opcode that `header` cannot carry.
    pub fn new(
        name: impl Into<String>,
        header: H,
        registry: CodecRegistry,
    ) -> Result<Self, RegistryError> {
        let max = header.max_opcode();
        if let Some(opcode) = registry.max_bound_opcode().filter(|&opcode| opcode > max) {
            return Err(RegistryError::OpcodeOutOfRange { opcode, max });
        }
        Ok(Self {
            name: name.into(),
            header,
            registry,
            wrapper: None,
        })
    }

    /// Install the wrapper applied to messages with dynamic opcodes.
    #[must_use]
    pub fn with_wrapper<F>(mut self, wrapper: F) -> Self
    where
        F: Fn(MessageRef) -> Result<MessageRef, WrapError> + Send + Sync + 'static,
    {
        self.wrapper = Some(Box::new(wrapper));
        self
    }

    /// Codec bindings of this protocol.
    #[must_use]
    pub fn registry(&self) -> &CodecRegistry { &self.registry }

    /// Header format of this protocol.
    #[must_use]
    pub fn header(&self) -> &H { &self.header }
}

impl<H: HeaderFormat> Protocol for RegistryProtocol<H> {
    fn name(&self) -> &str { &self.name }

    fn read_header(&self, src: &mut ReplayCursor<'_>) -> Result<Option<CodecHandle>, CodecError> {
        let FrameHeader { opcode, length } = self.header.read(src)?;
        let Some(codec) = self.registry.find(opcode) else {
            return Err(CodecError::UnknownPacket { opcode, length });
        };
        if let Some(len) = length {
            src.bound(len)?;
        }
        Ok(Some(Arc::clone(codec)))
    }

    fn codec_registration(
        &self,
        message_type: MessageType,
    ) -> Result<CodecRegistration, CodecError> {
        self.registry
            .registration(message_type)
            .cloned()
            .ok_or(CodecError::UnregisteredMessage { message_type })
    }

    fn write_header(
        &self,
        header: &mut BytesMut,
        registration: &CodecRegistration,
        payload: &[u8],
    ) -> Result<(), CodecError> {
        self.header
            .write(header, registration.opcode(), payload.len())
    }

    fn wrap_message(&self, message: MessageRef) -> Result<MessageRef, WrapError> {
        match &self.wrapper {
            Some(wrap) => wrap(message),
            None => Ok(message),
        }
    }
}
