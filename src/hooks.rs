//! Connection lifecycle callbacks.
//!
//! [`ConnectionHooks`] lets the owner of a connection observe its start and
//! end and decide, per error, whether the read loop keeps going. Every method
//! has a default, so implementations override only what they need.

use crate::{error::NetworkError, recovery::RecoveryPolicy};

/// Callbacks invoked by [`run_connection`](crate::connection::run_connection).
pub trait ConnectionHooks<S: ?Sized>: Send + Sync {
    /// Called before the first read.
    fn on_open(&self, _session: &S) {}

    /// Called once both loops have stopped, with the error that ended the
    /// connection, if any.
    fn on_close(&self, _session: &S, _error: Option<&NetworkError>) {}

    /// Decide the fate of the connection after a decode error.
    ///
    /// Defaults to [`NetworkError::recovery_policy`]. A
    /// [`RecoveryPolicy::Drop`] for an error that consumed no input is
    /// treated as [`RecoveryPolicy::Disconnect`], since retrying would fail
    /// the same way forever.
    fn recovery_policy(&self, _session: &S, error: &NetworkError) -> RecoveryPolicy {
        error.recovery_policy()
    }
}

/// Hooks using every default.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHooks;

impl<S: ?Sized> ConnectionHooks<S> for DefaultHooks {}
