//! Rewindable read cursor used for replay-on-suspend decoding.
//!
//! A [`ReplayCursor`] borrows the bytes buffered for a connection and tracks
//! how far a decode attempt has read. Nothing is consumed from the underlying
//! buffer until the attempt commits; an attempt that runs out of bytes simply
//! drops the cursor, which rewinds it to the pre-attempt position.

use crate::{
    byte_order::{network_u16, network_u32},
    codec::CodecError,
};

/// Read position over a borrowed byte slice.
///
/// Reads past the end of the available data fail with
/// [`CodecError::Incomplete`], which the decoder treats as "wait for more
/// bytes". A header reader may [`bound`](Self::bound) the cursor to the
/// declared payload length; reads past that bound fail with
/// [`CodecError::PayloadOverrun`] instead, because more bytes will never make
/// them succeed.
///
/// # Examples
///
/// ```
/// use pulseframe::{codec::CodecError, cursor::ReplayCursor};
///
/// let data = [0x00, 0x2a, 0xff];
/// let mut cursor = ReplayCursor::new(&data);
/// assert_eq!(cursor.read_u16().unwrap(), 42);
/// assert_eq!(cursor.read_u8().unwrap(), 0xff);
/// assert!(matches!(cursor.read_u8(), Err(CodecError::Incomplete { needed: 1 })));
/// assert_eq!(cursor.position(), 3);
/// ```
#[derive(Debug)]
pub struct ReplayCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    limit: Option<usize>,
}

impl<'a> ReplayCursor<'a> {
    /// Start a cursor at the beginning of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            limit: None,
        }
    }

    /// Bytes read so far in this attempt.
    #[must_use]
    pub fn position(&self) -> usize { self.pos }

    /// Bytes readable before hitting the end of data or the payload bound.
    #[must_use]
    pub fn remaining(&self) -> usize { self.end().saturating_sub(self.pos) }

    /// Unread bytes up to the end of data or the payload bound.
    #[must_use]
    pub fn remaining_slice(&self) -> &'a [u8] { self.buf.get(self.pos..self.end()).unwrap_or(&[]) }

    /// Payload bound set by [`bound`](Self::bound), as an absolute offset.
    #[must_use]
    pub fn limit(&self) -> Option<usize> { self.limit }

    /// Restrict subsequent reads to the next `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Incomplete`] when fewer than `len` bytes are
    /// buffered, so the whole attempt is replayed once they arrive.
    pub fn bound(&mut self, len: usize) -> Result<(), CodecError> {
        self.require(len)?;
        self.limit = Some(self.pos + len);
        Ok(())
    }

    /// Drop the payload bound, moving the position to its end.
    ///
    /// Returns the number of unread payload bytes that were skipped.
    pub fn finish_bound(&mut self) -> usize {
        match self.limit.take() {
            Some(end) => {
                let skipped = end.saturating_sub(self.pos);
                self.pos = self.pos.max(end);
                skipped
            }
            None => 0,
        }
    }

    /// Ensure `len` more bytes are readable.
    ///
    /// # Errors
    ///
    /// [`CodecError::PayloadOverrun`] if `len` crosses the payload bound,
    /// [`CodecError::Incomplete`] if the bytes have not arrived yet.
    pub fn require(&self, len: usize) -> Result<(), CodecError> {
        let wanted = self.pos.saturating_add(len);
        if let Some(limit) = self.limit.filter(|&limit| wanted > limit) {
            return Err(CodecError::PayloadOverrun {
                limit: limit.saturating_sub(self.pos),
            });
        }
        if wanted > self.buf.len() {
            return Err(CodecError::Incomplete {
                needed: wanted - self.buf.len(),
            });
        }
        Ok(())
    }

    /// Take the next `len` bytes.
    ///
    /// # Errors
    ///
    /// See [`require`](Self::require).
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        self.require(len)?;
        let start = self.pos;
        self.pos += len;
        self.buf
            .get(start..self.pos)
            .ok_or(CodecError::Incomplete { needed: len })
    }

    /// Skip the next `len` bytes.
    ///
    /// # Errors
    ///
    /// See [`require`](Self::require).
    pub fn skip(&mut self, len: usize) -> Result<(), CodecError> { self.take(len).map(|_| ()) }

    /// Take every remaining byte up to the end of data or the payload bound.
    pub fn take_remaining(&mut self) -> &'a [u8] {
        let rest = self.remaining_slice();
        self.pos += rest.len();
        rest
    }

    /// Read one byte.
    ///
    /// # Errors
    ///
    /// See [`require`](Self::require).
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        let bytes = self.take(1)?;
        Ok(bytes.first().copied().unwrap_or_default())
    }

    /// Read a big-endian `u16`.
    ///
    /// # Errors
    ///
    /// See [`require`](Self::require).
    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        network_u16(self.take(2)?).ok_or(CodecError::Incomplete { needed: 2 })
    }

    /// Read a big-endian `u32`.
    ///
    /// # Errors
    ///
    /// See [`require`](Self::require).
    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        network_u32(self.take(4)?).ok_or(CodecError::Incomplete { needed: 4 })
    }

    /// Read an unsigned LEB128 varint of at most five bytes.
    ///
    /// # Errors
    ///
    /// [`CodecError::Malformed`] when the encoding exceeds 32 bits, otherwise
    /// see [`require`](Self::require).
    pub fn read_varint(&mut self) -> Result<u32, CodecError> {
        let mut value: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8()?;
            if shift == 28 && byte & 0x70 != 0 {
                return Err(CodecError::Malformed("varint exceeds 32 bits".into()));
            }
            value |= u32::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::Malformed("varint longer than 5 bytes".into()))
    }

    fn end(&self) -> usize { self.limit.unwrap_or(self.buf.len()).min(self.buf.len()) }
}
