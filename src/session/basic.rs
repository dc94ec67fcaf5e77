//! Session without queues or handshake state.

use std::sync::Arc;

use super::{MessageHandler, Session, SessionCore, send_each};
use crate::{
    error::{NetworkError, SendAllError},
    message::MessageRef,
};

/// Session that writes sends straight to the transport and hands received
/// messages to its handler on the calling task.
pub struct BasicSession {
    core: SessionCore,
    handler: Arc<dyn MessageHandler<BasicSession>>,
}

impl BasicSession {
    /// Create a session delivering to `handler`.
    pub fn new(core: SessionCore, handler: impl MessageHandler<Self>) -> Self {
        Self {
            core,
            handler: Arc::new(handler),
        }
    }

    /// Encode and write `message` now. `None` is a no-op.
    ///
    /// # Errors
    ///
    /// [`NetworkError::ChannelClosed`] once the transport is closed, or an
    /// encode error.
    pub fn send(&self, message: impl Into<Option<MessageRef>>) -> Result<(), NetworkError> {
        match message.into() {
            Some(message) => self.core.write_now(message),
            None => Ok(()),
        }
    }

    /// Send each message in order, attempting all of them.
    ///
    /// # Errors
    ///
    /// Returns a [`SendAllError`] listing every message that failed.
    pub fn send_all<I>(&self, messages: I) -> Result<(), SendAllError>
    where
        I: IntoIterator,
        I::Item: Into<Option<MessageRef>>,
    {
        send_each(messages, |message| self.send(message))
    }
}

impl Session for BasicSession {
    fn core(&self) -> &SessionCore { &self.core }

    fn message_received(&self, message: MessageRef) {
        tracing::debug!(
            session_id = %self.core.id(),
            message_type = %message.message_type(),
            "delivering message"
        );
        self.handler.handle(self, message);
    }
}

impl std::fmt::Debug for BasicSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicSession")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}
