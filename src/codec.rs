//! Payload codecs.
//!
//! A [`Codec`] is a stateless pair of pure functions translating one message
//! type to and from its payload bytes. Protocols store codecs type-erased as
//! [`CodecHandle`]s so that one registry can serve many message types, and the
//! same codec can be reused by protocols with different header framing.
//!
//! # Error Handling
//!
//! Codecs report failures through [`CodecError`]. A codec that runs out of
//! input should let [`CodecError::Incomplete`] propagate from the
//! [`ReplayCursor`]; the decoder then suspends and replays the whole attempt
//! when more bytes arrive.

use std::{fmt, marker::PhantomData, sync::Arc};

use bincode::config;
use bytes::BytesMut;

use crate::{
    cursor::ReplayCursor,
    message::{Message, MessageRef, MessageType},
};

pub mod error;

pub use error::CodecError;

/// Bidirectional transformer between one message type and its payload bytes.
///
/// # Examples
///
/// ```
/// use bytes::{BufMut, BytesMut};
/// use pulseframe::{
///     codec::{Codec, CodecError},
///     cursor::ReplayCursor,
///     message::Message,
/// };
///
/// #[derive(Debug, PartialEq)]
/// struct Ping(u32);
/// impl Message for Ping {}
///
/// struct PingCodec;
///
/// impl Codec for PingCodec {
///     type Message = Ping;
///
///     fn decode(&self, src: &mut ReplayCursor<'_>) -> Result<Ping, CodecError> {
///         Ok(Ping(src.read_u32()?))
///     }
///
///     fn encode(&self, message: &Ping, dst: &mut BytesMut) -> Result<(), CodecError> {
///         dst.put_u32(message.0);
///         Ok(())
///     }
/// }
///
/// let mut buf = BytesMut::new();
/// PingCodec.encode(&Ping(5), &mut buf).unwrap();
/// let decoded = PingCodec.decode(&mut ReplayCursor::new(&buf)).unwrap();
/// assert_eq!(decoded, Ping(5));
/// ```
pub trait Codec: Send + Sync + 'static {
    /// Message type handled by this codec.
    type Message: Message;

    /// Decode one message from the payload bytes at `src`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Incomplete`] when the payload has not fully
    /// arrived, or another [`CodecError`] when it is invalid.
    fn decode(&self, src: &mut ReplayCursor<'_>) -> Result<Self::Message, CodecError>;

    /// Append the payload bytes for `message` to `dst`.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the message cannot be represented.
    fn encode(&self, message: &Self::Message, dst: &mut BytesMut) -> Result<(), CodecError>;
}

/// Object-safe view of a [`Codec`], implemented for every codec.
pub trait DynCodec: Send + Sync {
    /// Message type this codec decodes to and encodes from.
    fn message_type(&self) -> MessageType;

    /// Decode one message as a shared trait object.
    ///
    /// # Errors
    ///
    /// See [`Codec::decode`].
    fn decode_message(&self, src: &mut ReplayCursor<'_>) -> Result<MessageRef, CodecError>;

    /// Encode a type-erased message.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TypeMismatch`] if `message` is not of this
    /// codec's type, otherwise see [`Codec::encode`].
    fn encode_message(&self, message: &dyn Message, dst: &mut BytesMut) -> Result<(), CodecError>;
}

impl<C: Codec> DynCodec for C {
    fn message_type(&self) -> MessageType { MessageType::of::<C::Message>() }

    fn decode_message(&self, src: &mut ReplayCursor<'_>) -> Result<MessageRef, CodecError> {
        self.decode(src).map(|message| message.into_ref())
    }

    fn encode_message(&self, message: &dyn Message, dst: &mut BytesMut) -> Result<(), CodecError> {
        let typed = message
            .downcast_ref::<C::Message>()
            .ok_or_else(|| CodecError::TypeMismatch {
                expected: MessageType::of::<C::Message>(),
                actual: message.message_type(),
            })?;
        self.encode(typed, dst)
    }
}

/// Shared, type-erased codec stored in protocol registries.
pub type CodecHandle = Arc<dyn DynCodec>;

/// Erase a codec into a [`CodecHandle`].
#[must_use]
pub fn handle<C: Codec>(codec: C) -> CodecHandle { Arc::new(codec) }

impl fmt::Debug for dyn DynCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("message_type", &self.message_type().name())
            .finish()
    }
}

/// Codec serialising messages with `bincode`'s standard configuration.
///
/// Any message type deriving [`bincode::Encode`] and [`bincode::Decode`] can
/// use this codec without writing payload code by hand.
pub struct BincodeCodec<M> {
    _message: PhantomData<fn() -> M>,
}

impl<M> BincodeCodec<M> {
    /// Construct the codec.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _message: PhantomData,
        }
    }
}

impl<M> Default for BincodeCodec<M> {
    fn default() -> Self { Self::new() }
}

impl<M> Clone for BincodeCodec<M> {
    fn clone(&self) -> Self { Self::new() }
}

impl<M> fmt::Debug for BincodeCodec<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BincodeCodec")
            .field("message", &std::any::type_name::<M>())
            .finish()
    }
}

impl<M> Codec for BincodeCodec<M>
where
    M: Message + bincode::Encode + bincode::Decode<()>,
{
    type Message = M;

    fn decode(&self, src: &mut ReplayCursor<'_>) -> Result<M, CodecError> {
        match bincode::decode_from_slice::<M, _>(src.remaining_slice(), config::standard()) {
            Ok((message, consumed)) => {
                src.skip(consumed)?;
                Ok(message)
            }
            Err(bincode::error::DecodeError::UnexpectedEnd { additional }) => {
                // A bounded payload will never grow; an unbounded one might.
                match src.limit() {
                    Some(_) => Err(CodecError::PayloadOverrun {
                        limit: src.remaining(),
                    }),
                    None => Err(CodecError::Incomplete { needed: additional }),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    fn encode(&self, message: &M, dst: &mut BytesMut) -> Result<(), CodecError> {
        let bytes = bincode::encode_to_vec(message, config::standard())?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
