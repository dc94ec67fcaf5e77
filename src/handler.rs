//! Per-message-type dispatch.
//!
//! [`HandlerRegistry`] routes each delivered message to the closure
//! registered for its concrete type, so application code receives `&M`
//! instead of a type-erased [`MessageRef`].

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    message::{Message, MessageRef, MessageType},
    session::MessageHandler,
};

/// Errors raised while registering handlers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// A handler for the message type already exists.
    #[error("a handler for {0} is already registered")]
    Duplicate(MessageType),
}

type TypedHandler<S> = Box<dyn Fn(&S, &dyn Message) + Send + Sync>;
type Fallback<S> = Box<dyn Fn(&S, MessageRef) + Send + Sync>;

/// Typed handler table usable as a session's [`MessageHandler`].
///
/// # Examples
///
/// ```
/// use pulseframe::{handler::HandlerRegistry, message::Message, session::BasicSession};
///
/// #[derive(Debug)]
/// struct Hello;
/// impl Message for Hello {}
///
/// let handlers = HandlerRegistry::<BasicSession>::new()
///     .on(|_session, _hello: &Hello| println!("hello"))
///     .unwrap();
/// assert!(handlers.handles::<Hello>());
/// ```
pub struct HandlerRegistry<S: ?Sized> {
    handlers: HashMap<MessageType, TypedHandler<S>>,
    fallback: Option<Fallback<S>>,
}

impl<S: ?Sized> Default for HandlerRegistry<S> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: None,
        }
    }
}

impl<S: ?Sized + 'static> HandlerRegistry<S> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register `handler` for messages of type `M`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Duplicate`] if `M` already has a handler.
    pub fn on<M, F>(mut self, handler: F) -> Result<Self, HandlerError>
    where
        M: Message,
        F: Fn(&S, &M) + Send + Sync + 'static,
    {
        let message_type = MessageType::of::<M>();
        if self.handlers.contains_key(&message_type) {
            return Err(HandlerError::Duplicate(message_type));
        }
        self.handlers.insert(
            message_type,
            Box::new(move |session: &S, message: &dyn Message| {
                if let Some(typed) = message.downcast_ref::<M>() {
                    handler(session, typed);
                }
            }),
        );
        Ok(self)
    }

    /// Handle messages with no registered handler. Without a fallback they are
    /// logged and discarded.
    #[must_use]
    pub fn fallback<F>(mut self, handler: F) -> Self
    where
        F: Fn(&S, MessageRef) + Send + Sync + 'static,
    {
        self.fallback = Some(Box::new(handler));
        self
    }

    /// Returns true if messages of type `M` have a handler.
    #[must_use]
    pub fn handles<M: Message>(&self) -> bool {
        self.handlers.contains_key(&MessageType::of::<M>())
    }
}

impl<S: ?Sized + 'static> MessageHandler<S> for HandlerRegistry<S> {
    fn handle(&self, session: &S, message: MessageRef) {
        let message_type = message.message_type();
        if let Some(handler) = self.handlers.get(&message_type) {
            handler(session, &*message);
        } else if let Some(fallback) = &self.fallback {
            fallback(session, message);
        } else {
            tracing::warn!(%message_type, "no handler for message");
        }
    }
}
