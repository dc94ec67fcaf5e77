//! Utilities for exercising `pulseframe` sessions and decoders in tests.
//!
//! [`drive_session`] runs a session over a `tokio::io::duplex` stream and
//! returns everything the session wrote, [`decode_chunked`] feeds a decoder
//! in arbitrary fragments, and [`logger`] captures `log` records.
//!
//! ```rust
//! use pulseframe_testing::{Ping, decode_chunked, demo_protocol, encode_all};
//! use pulseframe::{Message, MessageDecoder, ProtocolSlot};
//! use std::sync::Arc;
//!
//! let protocol = Arc::new(demo_protocol("demo").unwrap());
//! let bytes = encode_all(&*protocol, [Ping(1).into_ref()]).unwrap();
//! let mut decoder = MessageDecoder::new(ProtocolSlot::new(protocol));
//! let messages = decode_chunked(&mut decoder, &bytes, &[1]).unwrap();
//! assert_eq!(messages.len(), 1);
//! ```

pub mod chunks;
pub mod drive;
pub mod logging;

pub use chunks::decode_chunked;
pub use drive::{DEFAULT_CAPACITY, drive_session, drive_session_with_capacity};
pub use logging::{LoggerHandle, logger};
pub use pulseframe::test_helpers::*;
