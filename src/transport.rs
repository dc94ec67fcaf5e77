//! Write side of the transport boundary.
//!
//! Sessions never touch sockets. They hand encoded frames to a [`Transport`],
//! which must accept them without blocking. [`ChannelTransport`] queues frames
//! on an unbounded channel drained by
//! [`write_loop`](crate::connection::write_loop) on the network task.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::NetworkError;

/// Non-blocking sink for encoded frames.
pub trait Transport: Send + Sync {
    /// Queue `frame` for writing.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::ChannelClosed`] once the transport is closed.
    fn write(&self, frame: Bytes) -> Result<(), NetworkError>;

    /// Returns true while writes are accepted.
    fn is_open(&self) -> bool;

    /// Stop accepting writes. Idempotent.
    fn close(&self);
}

/// [`Transport`] feeding an in-process channel.
#[derive(Clone, Debug)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Bytes>,
    closed: CancellationToken,
}

/// Receiving half of a [`ChannelTransport`].
#[derive(Debug)]
pub struct OutboundFrames {
    rx: mpsc::UnboundedReceiver<Bytes>,
    closed: CancellationToken,
}

impl ChannelTransport {
    /// Create a transport and the stream of frames written to it.
    #[must_use]
    pub fn channel() -> (Self, OutboundFrames) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = CancellationToken::new();
        (
            Self {
                tx,
                closed: closed.clone(),
            },
            OutboundFrames { rx, closed },
        )
    }

    /// Token cancelled when the transport closes.
    #[must_use]
    pub fn closed_token(&self) -> &CancellationToken { &self.closed }
}

impl Transport for ChannelTransport {
    fn write(&self, frame: Bytes) -> Result<(), NetworkError> {
        if self.closed.is_cancelled() {
            return Err(NetworkError::ChannelClosed);
        }
        self.tx.send(frame).map_err(|_| NetworkError::ChannelClosed)
    }

    fn is_open(&self) -> bool { !self.closed.is_cancelled() && !self.tx.is_closed() }

    fn close(&self) { self.closed.cancel(); }
}

impl OutboundFrames {
    /// Next frame to write, or `None` once the transport is closed.
    ///
    /// Frames written before the close are still delivered. Once the close is
    /// observed the channel stops accepting frames, so a write racing the
    /// close fails instead of being dropped unseen.
    pub async fn recv(&mut self) -> Option<Bytes> {
        if let Ok(frame) = self.rx.try_recv() {
            return Some(frame);
        }
        tokio::select! {
            biased;
            frame = self.rx.recv() => frame,
            () = self.closed.cancelled() => {
                self.rx.close();
                self.rx.try_recv().ok()
            }
        }
    }

    /// Close the transport from the receiving side, for example after a
    /// write error.
    pub fn close(&mut self) {
        self.closed.cancel();
        self.rx.close();
    }

    /// Token cancelled when the transport closes.
    #[must_use]
    pub fn closed_token(&self) -> &CancellationToken { &self.closed }
}
