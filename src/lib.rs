#![doc(html_root_url = "https://docs.rs/pulseframe/latest")]
//! Public API for the `pulseframe` library.
//!
//! This crate is a transport-agnostic framing and session-dispatch core for
//! binary protocols. It decodes byte streams into typed messages through a
//! pluggable per-connection [`Protocol`](protocol::Protocol), encodes typed
//! messages back into frames, and gates when messages reach the wire or the
//! application through a handshake-aware [`PulsingSession`].

pub mod byte_order;
pub mod codec;
pub mod config;
pub mod connection;
pub mod cursor;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod message;
pub mod metrics;
pub mod pipeline;
pub mod prelude;
pub mod protocol;
pub mod recovery;
pub mod session;
pub mod test_helpers;
pub mod transport;

pub use codec::{BincodeCodec, Codec, CodecError};
pub use connection::run_connection;
pub use error::{NetworkError, Result};
pub use message::{Message, MessageRef, MessageType};
pub use metrics::{CONNECTIONS_ACTIVE, Direction, ERRORS_TOTAL, MESSAGES_PROCESSED};
pub use pipeline::{MessageDecoder, MessageEncoder};
pub use protocol::{Protocol, ProtocolSlot};
pub use session::{
    BasicSession,
    ConnectionId,
    PulsingSession,
    SendType,
    Session,
    SessionRegistry,
    State,
};
pub use transport::{ChannelTransport, Transport};
