//! Wire encodings for header integers.
//!
//! Fixed-width fields travel in network byte order; variable-width fields use
//! unsigned LEB128. Header formats write through the `put_*` helpers and the
//! replay cursor parses through the slice readers, keeping Clippy
//! expectations scoped to the conversion points.

use bytes::{BufMut, BytesMut};

/// Append a `u16` in network byte order (big-endian).
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use pulseframe::byte_order::put_network_u16;
///
/// let mut buf = BytesMut::new();
/// put_network_u16(&mut buf, 0x1234);
/// assert_eq!(&buf[..], &[0x12, 0x34]);
/// ```
pub fn put_network_u16(dst: &mut BytesMut, value: u16) {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    dst.put_slice(&value.to_be_bytes());
}

/// Append a `u32` in network byte order (big-endian).
pub fn put_network_u32(dst: &mut BytesMut, value: u32) {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    dst.put_slice(&value.to_be_bytes());
}

/// Parse a network-order `u16` from exactly two bytes.
///
/// Returns `None` if `bytes` has any other length.
#[must_use]
pub fn network_u16(bytes: &[u8]) -> Option<u16> {
    let arr = <[u8; 2]>::try_from(bytes).ok()?;
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    Some(u16::from_be_bytes(arr))
}

/// Parse a network-order `u32` from exactly four bytes.
///
/// Returns `None` if `bytes` has any other length.
#[must_use]
pub fn network_u32(bytes: &[u8]) -> Option<u32> {
    let arr = <[u8; 4]>::try_from(bytes).ok()?;
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    Some(u32::from_be_bytes(arr))
}

/// Largest encoded size of a `u32` varint.
pub const MAX_VARINT_LEN: usize = 5;

/// Append `value` as an unsigned LEB128 varint.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use pulseframe::byte_order::put_varint;
///
/// let mut buf = BytesMut::new();
/// put_varint(&mut buf, 300);
/// assert_eq!(&buf[..], &[0xac, 0x02]);
/// ```
pub fn put_varint(dst: &mut BytesMut, mut value: u32) {
    loop {
        #[expect(clippy::cast_possible_truncation, reason = "masked to seven bits")]
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            dst.put_u8(byte);
            return;
        }
        dst.put_u8(byte | 0x80);
    }
}

/// Number of bytes [`put_varint`] writes for `value`.
#[must_use]
pub fn varint_len(value: u32) -> usize {
    let bits = 32 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn fixed_width_fields_are_big_endian() {
        let mut buf = BytesMut::new();
        put_network_u16(&mut buf, 0x0102);
        put_network_u32(&mut buf, 0x0304_0506);

        assert_eq!(&buf[..], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(network_u16(&buf[..2]), Some(0x0102));
        assert_eq!(network_u32(&buf[2..]), Some(0x0304_0506));
    }

    #[test]
    fn readers_reject_wrong_lengths() {
        assert_eq!(network_u16(&[1]), None);
        assert_eq!(network_u32(&[1, 2, 3]), None);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(127, 1)]
    #[case(128, 2)]
    #[case(16_383, 2)]
    #[case(16_384, 3)]
    #[case(u32::MAX, MAX_VARINT_LEN)]
    fn varint_length_matches_encoding(#[case] value: u32, #[case] len: usize) {
        let mut buf = BytesMut::new();
        put_varint(&mut buf, value);
        assert_eq!(buf.len(), len);
        assert_eq!(varint_len(value), len);
    }
}
