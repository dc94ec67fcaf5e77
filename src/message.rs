//! Typed application messages.
//!
//! A [`Message`] is an immutable unit of application data. Messages travel
//! through the decoder, the session queues and the encoder as shared
//! [`MessageRef`] trait objects; codecs recover the concrete type by
//! downcasting.

use std::{
    any::{Any, TypeId},
    fmt,
    sync::Arc,
};

/// Shared handle to a type-erased message.
pub type MessageRef = Arc<dyn Message>;

/// Upcast helper implemented for every `'static` type.
///
/// Exists so that `dyn Message` can expose its concrete type for
/// downcasting without requiring implementors to write any boilerplate.
pub trait AsAny: Any {
    /// Borrow `self` as [`Any`].
    fn as_any(&self) -> &dyn Any;

    /// Name of the concrete type.
    fn concrete_type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any { self }

    fn concrete_type_name(&self) -> &'static str { std::any::type_name::<T>() }
}

/// Marker trait for application message types.
///
/// # Examples
///
/// ```
/// use pulseframe::message::{Message, MessageRef};
///
/// #[derive(Debug, PartialEq)]
/// struct Ping(u32);
///
/// impl Message for Ping {}
///
/// let msg: MessageRef = Ping(7).into_ref();
/// assert_eq!(msg.downcast_ref::<Ping>(), Some(&Ping(7)));
/// assert!(!msg.is_async());
/// ```
pub trait Message: AsAny + fmt::Debug + Send + Sync {
    /// Whether the message may bypass the ordered inbound queue.
    ///
    /// Async-eligible messages are handed to the application as soon as they
    /// are decoded, possibly ahead of messages already waiting for a pulse.
    fn is_async(&self) -> bool { false }

    /// Wrap the message in a [`MessageRef`].
    fn into_ref(self) -> MessageRef
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

impl dyn Message {
    /// Identify the concrete type behind this trait object.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        MessageType {
            id: self.as_any().type_id(),
            name: self.concrete_type_name(),
        }
    }

    /// Borrow the concrete message if it is of type `M`.
    #[must_use]
    pub fn downcast_ref<M: Message>(&self) -> Option<&M> { self.as_any().downcast_ref::<M>() }

    /// Return true if the concrete message is of type `M`.
    #[must_use]
    pub fn is<M: Message>(&self) -> bool { self.as_any().is::<M>() }
}

/// Runtime identity of a message type, used as the encode-side lookup key.
#[derive(Clone, Copy, Debug, Eq)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    /// Identity of the statically known type `M`.
    #[must_use]
    pub fn of<M: Message>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: std::any::type_name::<M>(),
        }
    }

    /// The underlying [`TypeId`].
    #[must_use]
    pub fn id(&self) -> TypeId { self.id }

    /// Type name for logs and error messages.
    #[must_use]
    pub fn name(&self) -> &'static str { self.name }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl std::hash::Hash for MessageType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { self.id.hash(state); }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ping(u8);
    impl Message for Ping {}

    #[derive(Debug)]
    struct Urgent;
    impl Message for Urgent {
        fn is_async(&self) -> bool { true }
    }

    #[test]
    fn message_type_matches_static_identity() {
        let msg = Ping(1).into_ref();
        assert_eq!(msg.message_type(), MessageType::of::<Ping>());
        assert_ne!(msg.message_type(), MessageType::of::<Urgent>());
        assert!(msg.message_type().name().ends_with("Ping"));
    }

    #[test]
    fn downcast_recovers_concrete_message() {
        let msg = Ping(9).into_ref();
        assert!(msg.is::<Ping>());
        assert_eq!(msg.downcast_ref::<Ping>(), Some(&Ping(9)));
        assert!(msg.downcast_ref::<Urgent>().is_none());
    }

    #[test]
    fn async_flag_defaults_to_false() {
        assert!(!Ping(0).is_async());
        assert!(Urgent.is_async());
    }
}
