#![cfg(any(test, feature = "test-helpers"))]
//! Test-only helpers shared by unit and integration tests.
//!
//! Provides a small demo protocol, a transport that records every frame
//! written to it and a handler that records every message delivered to it.

use std::sync::{
    Arc,
    Mutex,
    PoisonError,
    atomic::{AtomicBool, Ordering},
};

use bytes::{Bytes, BytesMut};

use crate::{
    codec::BincodeCodec,
    error::NetworkError,
    message::{Message, MessageRef},
    pipeline::encode_message,
    protocol::{CodecRegistry, LengthPrefixedHeader, Protocol, RegistryError, RegistryProtocol},
    session::{ConnectionId, MessageHandler, PulsingSession, SessionCore},
    transport::Transport,
};

/// Opcode of [`Ping`] in [`demo_protocol`].
pub const PING: u32 = 1;
/// Opcode of [`Chat`] in [`demo_protocol`].
pub const CHAT: u32 = 2;
/// Opcode of [`Urgent`] in [`demo_protocol`].
pub const URGENT: u32 = 3;
/// Opcode of [`Announce`] in [`demo_protocol`].
pub const ANNOUNCE: u32 = 4;

/// Numbered keep-alive.
#[derive(bincode::Encode, bincode::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Ping(pub u32);

impl Message for Ping {}

/// Text line on a channel.
#[derive(bincode::Encode, bincode::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    /// Channel number.
    pub channel: u16,
    /// Message text.
    pub text: String,
}

impl Message for Chat {}

/// Message delivered as soon as it is received.
#[derive(bincode::Encode, bincode::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Urgent(pub u32);

impl Message for Urgent {
    fn is_async(&self) -> bool { true }
}

/// Message bound to a dynamically allocated opcode.
#[derive(bincode::Encode, bincode::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Custom(pub String);

impl Message for Custom {}

/// Fixed-opcode envelope the demo protocol sends in place of [`Custom`].
#[derive(bincode::Encode, bincode::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Announce {
    /// Opcode allocated to the wrapped message.
    pub opcode: u32,
    /// Wrapped text.
    pub text: String,
}

impl Message for Announce {}

/// Protocol binding the demo messages behind a [`LengthPrefixedHeader`].
///
/// [`Custom`] receives a dynamic opcode and is sent wrapped in [`Announce`].
///
/// # Errors
///
/// Returns a [`RegistryError`] if a demo binding is rejected.
pub fn demo_protocol(name: &str) -> Result<RegistryProtocol<LengthPrefixedHeader>, RegistryError> {
    let mut registry = CodecRegistry::new();
    registry.bind(PING, BincodeCodec::<Ping>::new())?;
    registry.bind(CHAT, BincodeCodec::<Chat>::new())?;
    registry.bind(URGENT, BincodeCodec::<Urgent>::new())?;
    registry.bind(ANNOUNCE, BincodeCodec::<Announce>::new())?;
    let opcode = registry.bind_dynamic(BincodeCodec::<Custom>::new())?;
    let protocol = RegistryProtocol::new(name, LengthPrefixedHeader::default(), registry)?;
    Ok(protocol.with_wrapper(move |message| {
        let custom = message
            .downcast_ref::<Custom>()
            .ok_or("only Custom has a dynamic opcode")?;
        Ok(Announce {
            opcode,
            text: custom.0.clone(),
        }
        .into_ref())
    }))
}

/// Encode `messages` back to back with `protocol`.
///
/// # Errors
///
/// Returns the first encode error.
pub fn encode_all<I>(protocol: &dyn Protocol, messages: I) -> Result<BytesMut, NetworkError>
where
    I: IntoIterator<Item = MessageRef>,
{
    let mut buf = BytesMut::new();
    for message in messages {
        encode_message(protocol, message, &mut buf)?;
    }
    Ok(buf)
}

/// [`Transport`] keeping every frame written to it.
#[derive(Debug)]
pub struct RecordingTransport {
    frames: Mutex<Vec<Bytes>>,
    open: AtomicBool,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
        }
    }
}

impl RecordingTransport {
    /// Create an open transport.
    #[must_use]
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    /// Frames written so far, in write order.
    #[must_use]
    pub fn frames(&self) -> Vec<Bytes> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of frames written so far.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// All frames concatenated, as a decoder would read them.
    #[must_use]
    pub fn bytes(&self) -> BytesMut {
        let mut out = BytesMut::new();
        for frame in self.frames() {
            out.extend_from_slice(&frame);
        }
        out
    }
}

impl Transport for RecordingTransport {
    fn write(&self, frame: Bytes) -> Result<(), NetworkError> {
        if !self.is_open() {
            return Err(NetworkError::ChannelClosed);
        }
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame);
        Ok(())
    }

    fn is_open(&self) -> bool { self.open.load(Ordering::Acquire) }

    fn close(&self) { self.open.store(false, Ordering::Release); }
}

/// Handler recording every delivered message.
#[derive(Clone, Debug, Default)]
pub struct RecordingHandler(Arc<Mutex<Vec<MessageRef>>>);

impl RecordingHandler {
    /// Messages delivered so far, in delivery order.
    #[must_use]
    pub fn received(&self) -> Vec<MessageRef> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of messages delivered so far.
    #[must_use]
    pub fn count(&self) -> usize { self.0.lock().unwrap_or_else(PoisonError::into_inner).len() }
}

impl<S: ?Sized> MessageHandler<S> for RecordingHandler {
    fn handle(&self, _session: &S, message: MessageRef) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }
}

/// Pulsing session over [`demo_protocol`] and a fresh [`RecordingTransport`].
///
/// # Errors
///
/// Returns a [`RegistryError`] if the demo protocol cannot be built.
pub fn pulsing_session(
    handler: impl MessageHandler<PulsingSession>,
) -> Result<(PulsingSession, Arc<RecordingTransport>), RegistryError> {
    let transport = RecordingTransport::new();
    let core = SessionCore::new(
        ConnectionId::new(1),
        Arc::new(demo_protocol("demo")?),
        transport.clone(),
    );
    Ok((PulsingSession::new(core, handler), transport))
}
