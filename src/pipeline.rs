//! Message pipeline between raw bytes and typed messages.
//!
//! [`MessageDecoder`] and [`MessageEncoder`] implement the `tokio-util` codec
//! traits on top of a session's [`ProtocolSlot`](crate::protocol::ProtocolSlot).

pub mod decoder;
pub mod encoder;

pub use decoder::MessageDecoder;
pub use encoder::{MessageEncoder, encode_message};
