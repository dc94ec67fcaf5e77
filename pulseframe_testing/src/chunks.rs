//! Fragmented decoding helpers.

use bytes::BytesMut;
use pulseframe::{MessageDecoder, MessageRef, NetworkError};
use tokio_util::codec::Decoder;

/// Decode `bytes` by appending them to the buffer in chunks of the given
/// sizes, draining every complete message after each chunk.
///
/// Chunk sizes cycle; zero-sized entries are treated as one byte. Once the
/// input is exhausted the decoder sees end of stream.
///
/// # Errors
///
/// Returns the first decode error, including
/// [`NetworkError::TruncatedStream`] if the input ends inside a frame.
pub fn decode_chunked(
    decoder: &mut MessageDecoder,
    bytes: &[u8],
    chunk_sizes: &[usize],
) -> Result<Vec<MessageRef>, NetworkError> {
    let mut buf = BytesMut::new();
    let mut out = Vec::new();
    let mut rest = bytes;
    let mut sizes = chunk_sizes.iter().copied().cycle();

    while !rest.is_empty() {
        let size = sizes.next().unwrap_or(rest.len()).clamp(1, rest.len());
        let (chunk, tail) = rest.split_at(size);
        rest = tail;
        buf.extend_from_slice(chunk);
        while let Some(message) = decoder.decode(&mut buf)? {
            out.push(message);
        }
    }
    while let Some(message) = decoder.decode_eof(&mut buf)? {
        out.push(message);
    }
    Ok(out)
}
