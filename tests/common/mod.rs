//! Shared utilities for integration tests.
//!
//! Builds sessions over [`ChannelTransport`] so tests can drive them with
//! `pulseframe_testing::drive_session`, and decodes the bytes they wrote.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::sync::Arc;

use pulseframe::{
    BasicSession,
    ChannelTransport,
    ConnectionId,
    MessageDecoder,
    MessageRef,
    ProtocolSlot,
    PulsingSession,
    session::{MessageHandler, SessionCore},
    transport::OutboundFrames,
};
use pulseframe_testing::{decode_chunked, demo_protocol};

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

fn core(id: u64) -> (SessionCore, OutboundFrames) {
    let (transport, frames) = ChannelTransport::channel();
    let core = SessionCore::new(
        ConnectionId::new(id),
        Arc::new(demo_protocol("demo").expect("demo protocol")),
        Arc::new(transport),
    );
    (core, frames)
}

/// [`BasicSession`] over the demo protocol and a channel transport.
pub fn basic_session(
    id: u64,
    handler: impl MessageHandler<BasicSession>,
) -> (Arc<BasicSession>, OutboundFrames) {
    let (core, frames) = core(id);
    (Arc::new(BasicSession::new(core, handler)), frames)
}

/// [`PulsingSession`] over the demo protocol and a channel transport.
pub fn pulsing_session(
    id: u64,
    handler: impl MessageHandler<PulsingSession>,
) -> (Arc<PulsingSession>, OutboundFrames) {
    let (core, frames) = core(id);
    (Arc::new(PulsingSession::new(core, handler)), frames)
}

/// Decode everything a session wrote using the demo protocol.
pub fn decode_output(bytes: &[u8]) -> TestResult<Vec<MessageRef>> {
    let mut decoder = MessageDecoder::new(ProtocolSlot::new(Arc::new(demo_protocol("demo")?)));
    Ok(decode_chunked(&mut decoder, bytes, &[bytes.len().max(1)])?)
}
