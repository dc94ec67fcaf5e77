//! Session with handshake state and caller-driven queue draining.
//!
//! Received messages and early sends are parked on two FIFO queues. Nothing
//! leaves them until the owner calls [`PulsingSession::pulse`], which lets the
//! host decide on which task and at which moment application code runs.
//!
//! Each drain in a pulse handles only the messages queued when that drain
//! starts. Messages queued while it runs, for example by a handler replying
//! to the message it was given, wait for the next pulse.

use std::sync::{
    Arc,
    Mutex,
    TryLockError,
    atomic::{AtomicU8, AtomicUsize, Ordering},
};

use thiserror::Error;
use tokio::sync::mpsc;

use super::{MessageHandler, SendType, Session, SessionCore, State, send_each};
use crate::{
    config::SessionConfig,
    error::{NetworkError, SendAllError},
    message::MessageRef,
    metrics,
};

/// Work done by one [`pulse`](PulsingSession::pulse).
#[derive(Debug, Default)]
pub struct PulseStats {
    /// Queued messages written to the transport.
    pub sent: usize,
    /// Queued messages delivered to the handler.
    pub delivered: usize,
    /// Queued messages that failed to write, in queue order.
    pub failures: Vec<NetworkError>,
}

/// Reasons a pulse did not run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PulseError {
    /// Another pulse is draining this session.
    #[error("a pulse is already in progress for this session")]
    InProgress,
}

struct Queues {
    inbound: mpsc::UnboundedReceiver<MessageRef>,
    outbound: mpsc::UnboundedReceiver<MessageRef>,
}

/// Session gating sends on its [`State`] and deferring delivery to
/// [`pulse`](Self::pulse).
///
/// Enqueueing never blocks, so `send` and `message_received` are safe to call
/// from any task while another runs `pulse`.
pub struct PulsingSession {
    core: SessionCore,
    handler: Arc<dyn MessageHandler<PulsingSession>>,
    state: AtomicU8,
    inbound_tx: mpsc::UnboundedSender<MessageRef>,
    outbound_tx: mpsc::UnboundedSender<MessageRef>,
    inbound_len: AtomicUsize,
    outbound_len: AtomicUsize,
    queues: Mutex<Queues>,
}

impl PulsingSession {
    /// Create a session in the default starting state.
    pub fn new(core: SessionCore, handler: impl MessageHandler<Self>) -> Self {
        Self::with_config(core, handler, SessionConfig::default())
    }

    /// Create a session using `config`.
    pub fn with_config(
        core: SessionCore,
        handler: impl MessageHandler<Self>,
        config: SessionConfig,
    ) -> Self {
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let (outbound_tx, outbound) = mpsc::unbounded_channel();
        Self {
            core,
            handler: Arc::new(handler),
            state: AtomicU8::new(config.state() as u8),
            inbound_tx,
            outbound_tx,
            inbound_len: AtomicUsize::new(0),
            outbound_len: AtomicUsize::new(0),
            queues: Mutex::new(Queues { inbound, outbound }),
        }
    }

    /// Current handshake state.
    #[must_use]
    pub fn state(&self) -> State { State::from_u8(self.state.load(Ordering::Acquire)) }

    /// Set the handshake state. Any state may follow any other.
    pub fn set_state(&self, state: State) {
        let previous = State::from_u8(self.state.swap(state as u8, Ordering::AcqRel));
        if state < previous {
            tracing::info!(
                session_id = %self.core.id(),
                from = %previous,
                to = %state,
                "session state moved backwards"
            );
        } else {
            tracing::debug!(
                session_id = %self.core.id(),
                from = %previous,
                to = %state,
                "session state changed"
            );
        }
    }

    /// Send with [`SendType::Queue`].
    ///
    /// # Errors
    ///
    /// See [`send_with`](Self::send_with).
    pub fn send(&self, message: impl Into<Option<MessageRef>>) -> Result<(), NetworkError> {
        self.send_with(SendType::Queue, message)
    }

    /// Send `message` under `send_type`. `None` is a no-op.
    ///
    /// [`SendType::Force`], or any type while the session is open, writes the
    /// message now. Otherwise [`SendType::Queue`] parks it on the outbound
    /// queue and [`SendType::OpenOnly`] drops it.
    ///
    /// # Errors
    ///
    /// When the message is written now: [`NetworkError::ChannelClosed`] if the
    /// transport is closed, or an encode error. Queueing and dropping never
    /// fail.
    pub fn send_with(
        &self,
        send_type: SendType,
        message: impl Into<Option<MessageRef>>,
    ) -> Result<(), NetworkError> {
        let Some(message) = message.into() else {
            return Ok(());
        };
        match (send_type, self.state()) {
            (SendType::Force, _) | (_, State::Open) => self.core.write_now(message),
            (SendType::Queue, state) => {
                tracing::debug!(
                    session_id = %self.core.id(),
                    %state,
                    message_type = %message.message_type(),
                    "queued outbound message"
                );
                self.outbound_len.fetch_add(1, Ordering::AcqRel);
                if self.outbound_tx.send(message).is_err() {
                    self.outbound_len.fetch_sub(1, Ordering::AcqRel);
                    return Err(NetworkError::ChannelClosed);
                }
                Ok(())
            }
            (SendType::OpenOnly, state) => {
                tracing::debug!(
                    session_id = %self.core.id(),
                    %state,
                    message_type = %message.message_type(),
                    "dropped open-only message"
                );
                metrics::inc_dropped_sends();
                Ok(())
            }
        }
    }

    /// [`send`](Self::send) each message in order, attempting all of them.
    ///
    /// # Errors
    ///
    /// Returns a [`SendAllError`] listing every message that failed.
    pub fn send_all<I>(&self, messages: I) -> Result<(), SendAllError>
    where
        I: IntoIterator,
        I::Item: Into<Option<MessageRef>>,
    {
        self.send_all_with(SendType::Queue, messages)
    }

    /// [`send_with`](Self::send_with) each message in order, attempting all of
    /// them.
    ///
    /// # Errors
    ///
    /// Returns a [`SendAllError`] listing every message that failed.
    pub fn send_all_with<I>(&self, send_type: SendType, messages: I) -> Result<(), SendAllError>
    where
        I: IntoIterator,
        I::Item: Into<Option<MessageRef>>,
    {
        send_each(messages, |message| self.send_with(send_type, message))
    }

    /// Flush queued sends if open, then deliver queued messages.
    ///
    /// The open check happens once, before the outbound drain. The inbound
    /// drain runs in every state. A failed write is logged and recorded in
    /// [`PulseStats::failures`]; the remaining messages are still attempted.
    ///
    /// # Errors
    ///
    /// [`PulseError::InProgress`] if called while another pulse on this
    /// session is running, including from inside a handler.
    pub fn pulse(&self) -> Result<PulseStats, PulseError> {
        let mut queues = match self.queues.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::warn!(session_id = %self.core.id(), "pulse already in progress");
                return Err(PulseError::InProgress);
            }
        };
        let mut stats = PulseStats::default();

        if self.state().is_open() {
            let pending = queues.outbound.len();
            for _ in 0..pending {
                let Ok(message) = queues.outbound.try_recv() else {
                    break;
                };
                self.outbound_len.fetch_sub(1, Ordering::AcqRel);
                match self.core.write_now(message) {
                    Ok(()) => stats.sent += 1,
                    Err(err) => {
                        tracing::warn!(
                            session_id = %self.core.id(),
                            error = %err,
                            "queued send failed"
                        );
                        stats.failures.push(err);
                    }
                }
            }
        }

        let pending = queues.inbound.len();
        for _ in 0..pending {
            let Ok(message) = queues.inbound.try_recv() else {
                break;
            };
            self.inbound_len.fetch_sub(1, Ordering::AcqRel);
            self.handler.handle(self, message);
            stats.delivered += 1;
        }
        Ok(stats)
    }

    /// Messages waiting for delivery.
    #[must_use]
    pub fn queued_inbound(&self) -> usize { self.inbound_len.load(Ordering::Acquire) }

    /// Messages waiting to be written.
    #[must_use]
    pub fn queued_outbound(&self) -> usize { self.outbound_len.load(Ordering::Acquire) }
}

impl Session for PulsingSession {
    fn core(&self) -> &SessionCore { &self.core }

    fn message_received(&self, message: MessageRef) {
        if message.is_async() {
            tracing::debug!(
                session_id = %self.core.id(),
                message_type = %message.message_type(),
                "delivering async message"
            );
            self.handler.handle(self, message);
            return;
        }
        self.inbound_len.fetch_add(1, Ordering::AcqRel);
        if self.inbound_tx.send(message).is_err() {
            self.inbound_len.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!(session_id = %self.core.id(), "inbound queue closed");
        }
    }
}

impl std::fmt::Debug for PulsingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulsingSession")
            .field("core", &self.core)
            .field("state", &self.state())
            .field("queued_inbound", &self.queued_inbound())
            .field("queued_outbound", &self.queued_outbound())
            .finish_non_exhaustive()
    }
}
