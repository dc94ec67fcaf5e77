//! Sessions: the integration point between decoded messages and application
//! code.
//!
//! A session owns its connection's active protocol and transport through a
//! [`SessionCore`]. [`BasicSession`] delivers and sends immediately;
//! [`PulsingSession`] adds a handshake [`State`] and two queues drained only
//! by an explicit [`pulse`](PulsingSession::pulse).

use std::sync::Arc;

use crate::{
    error::{NetworkError, SendAllError},
    message::MessageRef,
    protocol::Protocol,
};

mod basic;
mod pulsing;
mod registry;
mod shared;
mod state;

pub use basic::BasicSession;
pub use pulsing::{PulseError, PulseStats, PulsingSession};
pub use registry::SessionRegistry;
pub use shared::SessionCore;
pub use state::{SendType, State};

/// Identifier assigned to a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl From<u64> for ConnectionId {
    fn from(value: u64) -> Self { Self(value) }
}

impl ConnectionId {
    /// Create a new [`ConnectionId`] with the provided value.
    #[must_use]
    pub fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub fn as_u64(&self) -> u64 { self.0 }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

/// Application logic receiving messages from a session.
///
/// Handlers get the session back so they can reply, switch protocol or change
/// state while handling.
pub trait MessageHandler<S: ?Sized>: Send + Sync + 'static {
    /// Process one message.
    fn handle(&self, session: &S, message: MessageRef);
}

impl<S: ?Sized, F> MessageHandler<S> for F
where
    F: Fn(&S, MessageRef) + Send + Sync + 'static,
{
    fn handle(&self, session: &S, message: MessageRef) { self(session, message) }
}

/// A live connection as seen by the connection driver.
pub trait Session: Send + Sync + 'static {
    /// Shared identity, protocol and transport.
    fn core(&self) -> &SessionCore;

    /// Accept a message produced by the decoder.
    fn message_received(&self, message: MessageRef);

    /// Called once after the connection has shut down.
    fn on_disconnect(&self) {}

    /// Connection identifier.
    fn id(&self) -> ConnectionId { self.core().id() }

    /// Protocol currently used to read and write frames.
    fn protocol(&self) -> Arc<dyn Protocol> { self.core().protocol_slot().current() }

    /// Switch the protocol, typically once a handshake upgrades the connection.
    fn set_protocol(&self, protocol: Arc<dyn Protocol>) { self.core().set_protocol(protocol); }

    /// Returns true while the transport accepts writes.
    fn is_active(&self) -> bool { self.core().is_open() }

    /// Close the transport.
    fn disconnect(&self) { self.core().close(); }
}

/// Apply `send` to each message in order, collecting failures by index.
pub(crate) fn send_each<I>(
    messages: I,
    mut send: impl FnMut(Option<MessageRef>) -> Result<(), NetworkError>,
) -> Result<(), SendAllError>
where
    I: IntoIterator,
    I::Item: Into<Option<MessageRef>>,
{
    let failures: Vec<(usize, NetworkError)> = messages
        .into_iter()
        .enumerate()
        .filter_map(|(index, message)| send(message.into()).err().map(|err| (index, err)))
        .collect();
    if failures.is_empty() {
        Ok(())
    } else {
        Err(SendAllError { failures })
    }
}
