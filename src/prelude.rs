//! Optional convenience imports for common `pulseframe` workflows.
//!
//! This module is small and focused on high-frequency types. Prefer importing
//! specialised APIs directly from their owning modules.
//!
//! # Examples
//!
//! ```rust
//! use pulseframe::prelude::*;
//!
//! fn flush(session: &PulsingSession) -> Option<usize> {
//!     session.pulse().ok().map(|stats| stats.sent)
//! }
//! ```

pub use crate::{
    codec::{BincodeCodec, Codec, CodecError},
    error::{NetworkError, Result},
    message::{Message, MessageRef},
    protocol::{CodecRegistry, Protocol, RegistryProtocol},
    session::{BasicSession, PulsingSession, SendType, Session, State},
};
