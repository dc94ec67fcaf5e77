//! Connection driver tying a byte stream to a session.
//!
//! [`run_connection`] splits an I/O object into a read loop, which decodes
//! frames and hands messages to the session, and a write loop, which copies
//! frames from the session's [`ChannelTransport`](crate::transport::ChannelTransport)
//! to the socket. Closing the transport stops both loops; the write loop
//! flushes frames written before the close.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::{codec::Decoder, sync::CancellationToken};

use crate::{
    codec::CodecError,
    config::ConnectionConfig,
    error::NetworkError,
    hooks::ConnectionHooks,
    metrics,
    pipeline::MessageDecoder,
    recovery::RecoveryPolicy,
    session::Session,
    transport::OutboundFrames,
};

/// Drive `io` for `session` until either side closes.
///
/// `frames` must be the receiving half of the transport the session writes
/// to. On return the transport is closed,
/// [`ConnectionHooks::on_close`] has run and
/// [`Session::on_disconnect`] has been called.
///
/// # Errors
///
/// Returns the error that ended the connection: a decode error whose
/// recovery policy is [`RecoveryPolicy::Disconnect`], a buffer overflow, a
/// truncated stream or an I/O failure.
pub async fn run_connection<S, IO, H>(
    session: Arc<S>,
    frames: OutboundFrames,
    io: IO,
    config: ConnectionConfig,
    hooks: H,
) -> Result<(), NetworkError>
where
    S: Session,
    IO: AsyncRead + AsyncWrite + Send + Unpin,
    H: ConnectionHooks<S>,
{
    let (reader, writer) = tokio::io::split(io);
    let shutdown = frames.closed_token().clone();
    metrics::inc_connections();
    tracing::info!(session_id = %session.id(), "connection opened");
    hooks.on_open(&session);

    let read = async {
        let result = read_loop(&*session, reader, &config, &hooks, &shutdown).await;
        session.disconnect();
        result
    };
    let (read_result, write_result) = tokio::join!(read, write_loop(frames, writer));
    let result = read_result.and(write_result.map_err(NetworkError::from));

    match &result {
        Ok(()) => tracing::info!(session_id = %session.id(), "connection closed"),
        Err(err) => {
            tracing::warn!(session_id = %session.id(), error = %err, "connection closed with error");
        }
    }
    hooks.on_close(&session, result.as_ref().err());
    session.on_disconnect();
    metrics::dec_connections();
    result
}

/// Decode frames from `reader` and deliver them until EOF, shutdown or a
/// fatal error.
///
/// # Errors
///
/// See [`run_connection`].
pub async fn read_loop<S, R, H>(
    session: &S,
    mut reader: R,
    config: &ConnectionConfig,
    hooks: &H,
    shutdown: &CancellationToken,
) -> Result<(), NetworkError>
where
    S: Session + ?Sized,
    R: AsyncRead + Unpin,
    H: ConnectionHooks<S> + ?Sized,
{
    let mut decoder = session.core().decoder();
    let mut buf = BytesMut::with_capacity(config.buffer_capacity());
    loop {
        drain(session, &mut decoder, &mut buf, hooks)?;

        if buf.len() > config.buffer_limit() {
            return Err(CodecError::Oversized {
                size: buf.len(),
                max: config.buffer_limit(),
            }
            .into());
        }

        let read = tokio::select! {
            biased;
            () = shutdown.cancelled() => return Ok(()),
            read = reader.read_buf(&mut buf) => read?,
        };
        if read == 0 {
            while let Some(message) = decoder.decode_eof(&mut buf)? {
                session.message_received(message);
            }
            tracing::debug!(session_id = %session.id(), "peer closed stream");
            return Ok(());
        }
    }
}

fn drain<S, H>(
    session: &S,
    decoder: &mut MessageDecoder,
    buf: &mut BytesMut,
    hooks: &H,
) -> Result<(), NetworkError>
where
    S: Session + ?Sized,
    H: ConnectionHooks<S> + ?Sized,
{
    loop {
        let before = buf.len();
        match decoder.decode(buf) {
            Ok(Some(message)) => session.message_received(message),
            Ok(None) => return Ok(()),
            Err(err) => {
                let mut policy = hooks.recovery_policy(session, &err);
                if buf.len() == before {
                    policy = RecoveryPolicy::Disconnect;
                }
                match policy {
                    RecoveryPolicy::Drop => tracing::warn!(
                        session_id = %session.id(),
                        error = %err,
                        policy = policy.as_str(),
                        "dropped frame"
                    ),
                    RecoveryPolicy::Disconnect => return Err(err),
                }
            }
        }
    }
}

/// Copy frames to `writer` until the transport closes.
///
/// A write failure closes the transport so the session stops accepting
/// sends.
///
/// # Errors
///
/// Returns the I/O error that stopped the loop.
pub async fn write_loop<W>(mut frames: OutboundFrames, mut writer: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = frames.recv().await {
        let written = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        }
        .await;
        if let Err(err) = written {
            frames.close();
            return Err(err);
        }
    }
    if let Err(err) = writer.shutdown().await {
        tracing::debug!(error = %err, "shutdown after close failed");
    }
    Ok(())
}
