//! In-memory connection driving helpers.

use std::{io, sync::Arc};

use pulseframe::{
    NetworkError,
    Session,
    config::ConnectionConfig,
    connection::run_connection,
    hooks::DefaultHooks,
    transport::OutboundFrames,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

/// Default duplex buffer size used by [`drive_session`].
pub const DEFAULT_CAPACITY: usize = 4096;

/// Run `session` over a duplex stream, writing each input chunk to the
/// client half, then closing it.
///
/// Returns the connection result together with every byte the session
/// wrote before the stream closed.
///
/// # Errors
///
/// Returns any I/O error raised on the client half.
pub async fn drive_session<S: Session>(
    session: Arc<S>,
    frames: OutboundFrames,
    input: Vec<Vec<u8>>,
) -> io::Result<(Result<(), NetworkError>, Vec<u8>)> {
    drive_session_with_capacity(session, frames, input, DEFAULT_CAPACITY).await
}

/// Variant of [`drive_session`] with an explicit duplex buffer size.
///
/// # Errors
///
/// Returns any I/O error raised on the client half.
pub async fn drive_session_with_capacity<S: Session>(
    session: Arc<S>,
    frames: OutboundFrames,
    input: Vec<Vec<u8>>,
    capacity: usize,
) -> io::Result<(Result<(), NetworkError>, Vec<u8>)> {
    let (mut client, server) = duplex(capacity);

    let server_fut = run_connection(
        session,
        frames,
        server,
        ConnectionConfig::default(),
        DefaultHooks,
    );

    let client_fut = async {
        for chunk in &input {
            client.write_all(chunk).await?;
        }
        client.shutdown().await?;

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await?;
        io::Result::Ok(buf)
    };

    let (result, buf) = tokio::join!(server_fut, client_fut);
    Ok((result, buf?))
}
