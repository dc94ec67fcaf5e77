//! Opcode to codec bindings.
//!
//! A [`CodecRegistry`] maps wire opcodes to codecs for decoding and message
//! types to [`CodecRegistration`]s for encoding. Opcodes are either fixed at
//! bind time or allocated dynamically from a reserved range, which suits
//! protocols that announce message ids to the peer at runtime.

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    codec::{Codec, CodecHandle, handle},
    message::MessageType,
};

/// Default first opcode handed out by [`CodecRegistry::bind_dynamic`].
pub const DEFAULT_DYNAMIC_START: u32 = 0x8000;

/// Default highest opcode accepted by a registry.
pub const DEFAULT_MAX_OPCODE: u32 = 0xffff;

/// Encoding-side view of one codec binding.
#[derive(Clone, Debug)]
pub struct CodecRegistration {
    opcode: u32,
    dynamic: bool,
    codec: CodecHandle,
}

impl CodecRegistration {
    /// Build a registration by hand, for protocols not backed by a registry.
    #[must_use]
    pub fn new(opcode: u32, dynamic: bool, codec: CodecHandle) -> Self {
        Self {
            opcode,
            dynamic,
            codec,
        }
    }

    /// Opcode written into the header.
    #[must_use]
    pub fn opcode(&self) -> u32 { self.opcode }

    /// Whether the opcode was allocated at runtime.
    ///
    /// Messages with dynamic opcodes pass through
    /// [`Protocol::wrap_message`](super::Protocol::wrap_message) before encoding.
    #[must_use]
    pub fn is_dynamic(&self) -> bool { self.dynamic }

    /// Codec encoding the payload.
    #[must_use]
    pub fn codec(&self) -> &CodecHandle { &self.codec }
}

/// Errors raised while binding codecs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The opcode already has a codec.
    #[error("opcode {0:#x} is already bound")]
    DuplicateOpcode(u32),
    /// The message type already has a codec.
    #[error("message type {0} is already bound")]
    DuplicateMessageType(MessageType),
    /// The opcode does not fit the registry's opcode space.
    #[error("opcode {opcode:#x} exceeds maximum {max:#x}")]
    OpcodeOutOfRange {
        /// Requested opcode.
        opcode: u32,
        /// Highest opcode accepted.
        max: u32,
    },
    /// Every opcode in the dynamic range is taken.
    #[error("dynamic opcode range exhausted")]
    Exhausted,
}

/// Bidirectional opcode and message type lookup.
#[derive(Debug)]
pub struct CodecRegistry {
    by_opcode: HashMap<u32, CodecHandle>,
    by_type: HashMap<MessageType, CodecRegistration>,
    dynamic_start: u32,
    max_opcode: u32,
}

impl Default for CodecRegistry {
    fn default() -> Self { Self::new() }
}

impl CodecRegistry {
    /// Create an empty registry using the default opcode ranges.
    #[must_use]
    pub fn new() -> Self { Self::with_range(DEFAULT_DYNAMIC_START, DEFAULT_MAX_OPCODE) }

    /// Create an empty registry with a custom dynamic range.
    ///
    /// Dynamic opcodes are allocated from `dynamic_start` up to `max_opcode`
    /// inclusive. `dynamic_start` is clamped to `max_opcode`.
    #[must_use]
    pub fn with_range(dynamic_start: u32, max_opcode: u32) -> Self {
        Self {
            by_opcode: HashMap::new(),
            by_type: HashMap::new(),
            dynamic_start: dynamic_start.min(max_opcode),
            max_opcode,
        }
    }

    /// Bind `codec` to a fixed `opcode`.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] if the opcode is out of range or either the
    /// opcode or the codec's message type is already bound.
    pub fn bind<C: Codec>(&mut self, opcode: u32, codec: C) -> Result<(), RegistryError> {
        self.insert(opcode, false, handle(codec))
    }

    /// Bind `codec` to the lowest free opcode in the dynamic range.
    ///
    /// Returns the allocated opcode.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Exhausted`] when the range is full, or
    /// [`RegistryError::DuplicateMessageType`] when the type is already bound.
    pub fn bind_dynamic<C: Codec>(&mut self, codec: C) -> Result<u32, RegistryError> {
        let codec = handle(codec);
        let message_type = codec.message_type();
        if self.by_type.contains_key(&message_type) {
            return Err(RegistryError::DuplicateMessageType(message_type));
        }
        let opcode = (self.dynamic_start..=self.max_opcode)
            .find(|op| !self.by_opcode.contains_key(op))
            .ok_or(RegistryError::Exhausted)?;
        self.insert(opcode, true, codec)?;
        Ok(opcode)
    }

    /// Codec bound to `opcode`, used when decoding.
    #[must_use]
    pub fn find(&self, opcode: u32) -> Option<&CodecHandle> { self.by_opcode.get(&opcode) }

    /// Registration for `message_type`, used when encoding.
    #[must_use]
    pub fn registration(&self, message_type: MessageType) -> Option<&CodecRegistration> {
        self.by_type.get(&message_type)
    }

    /// Number of bound codecs.
    #[must_use]
    pub fn len(&self) -> usize { self.by_opcode.len() }

    /// Returns true if no codec is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.by_opcode.is_empty() }

    /// Highest opcode with a bound codec.
    #[must_use]
    pub fn max_bound_opcode(&self) -> Option<u32> { self.by_opcode.keys().copied().max() }

    fn insert(&mut self, opcode: u32, dynamic: bool, codec: CodecHandle) -> Result<(), RegistryError> {
        if opcode > self.max_opcode {
            return Err(RegistryError::OpcodeOutOfRange {
                opcode,
                max: self.max_opcode,
            });
        }
        if self.by_opcode.contains_key(&opcode) {
            return Err(RegistryError::DuplicateOpcode(opcode));
        }
        let message_type = codec.message_type();
        if self.by_type.contains_key(&message_type) {
            return Err(RegistryError::DuplicateMessageType(message_type));
        }
        self.by_opcode.insert(opcode, codec.clone());
        self.by_type.insert(
            message_type,
            CodecRegistration::new(opcode, dynamic, codec),
        );
        Ok(())
    }
}
