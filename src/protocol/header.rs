//! Stock header formats for [`RegistryProtocol`](super::RegistryProtocol).
//!
//! A header carries the opcode and, optionally, the payload length. Headers
//! with a length let the decoder skip payloads of unknown opcodes and stay in
//! sync; headers without one cannot recover from an unknown opcode.

use bytes::BytesMut;

use crate::{
    byte_order::{put_network_u16, put_network_u32, put_varint, varint_len},
    codec::CodecError,
    cursor::ReplayCursor,
};

/// Default maximum payload accepted by [`LengthPrefixedHeader`] and
/// [`VarIntHeader`].
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

/// Fields parsed from a frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Opcode identifying the payload codec.
    pub opcode: u32,
    /// Declared payload length, if the format carries one.
    pub length: Option<usize>,
}

/// Reads and writes one header layout.
pub trait HeaderFormat: Send + Sync + 'static {
    /// Parse a header from `src`, consuming exactly its bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Incomplete`] until the whole header is buffered
    /// and another [`CodecError`] if it is invalid.
    fn read(&self, src: &mut ReplayCursor<'_>) -> Result<FrameHeader, CodecError>;

    /// Append a header for `opcode` and a payload of `payload_len` bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if either value cannot be represented.
    fn write(&self, dst: &mut BytesMut, opcode: u32, payload_len: usize) -> Result<(), CodecError>;

    /// Highest opcode this layout can carry.
    fn max_opcode(&self) -> u32;
}

fn opcode_u16(opcode: u32) -> Result<u16, CodecError> {
    u16::try_from(opcode).map_err(|_| CodecError::Malformed(format!("opcode {opcode:#x} exceeds u16")))
}

fn check_payload(size: usize, max: usize) -> Result<(), CodecError> {
    if size > max {
        return Err(CodecError::Oversized { size, max });
    }
    Ok(())
}

fn length_usize(length: u32) -> Result<usize, CodecError> {
    usize::try_from(length).map_err(|_| CodecError::Malformed("payload length exceeds usize".into()))
}

/// Two-byte big-endian opcode and no length.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpcodeHeader;

impl HeaderFormat for OpcodeHeader {
    fn read(&self, src: &mut ReplayCursor<'_>) -> Result<FrameHeader, CodecError> {
        Ok(FrameHeader {
            opcode: u32::from(src.read_u16()?),
            length: None,
        })
    }

    fn write(&self, dst: &mut BytesMut, opcode: u32, _payload_len: usize) -> Result<(), CodecError> {
        put_network_u16(dst, opcode_u16(opcode)?);
        Ok(())
    }

    fn max_opcode(&self) -> u32 { u32::from(u16::MAX) }
}

/// Two-byte big-endian opcode followed by a four-byte big-endian length.
#[derive(Clone, Copy, Debug)]
pub struct LengthPrefixedHeader {
    max_payload: usize,
}

impl LengthPrefixedHeader {
    /// Header rejecting payloads larger than `max_payload` bytes.
    #[must_use]
    pub fn new(max_payload: usize) -> Self { Self { max_payload } }

    /// Largest payload accepted in either direction.
    #[must_use]
    pub fn max_payload(&self) -> usize { self.max_payload }
}

impl Default for LengthPrefixedHeader {
    fn default() -> Self { Self::new(DEFAULT_MAX_PAYLOAD) }
}

impl HeaderFormat for LengthPrefixedHeader {
    fn read(&self, src: &mut ReplayCursor<'_>) -> Result<FrameHeader, CodecError> {
        let opcode = u32::from(src.read_u16()?);
        let length = length_usize(src.read_u32()?)?;
        check_payload(length, self.max_payload)?;
        Ok(FrameHeader {
            opcode,
            length: Some(length),
        })
    }

    fn write(&self, dst: &mut BytesMut, opcode: u32, payload_len: usize) -> Result<(), CodecError> {
        check_payload(payload_len, self.max_payload)?;
        let len = u32::try_from(payload_len).map_err(|_| CodecError::Oversized {
            size: payload_len,
            max: self.max_payload,
        })?;
        dst.reserve(6);
        put_network_u16(dst, opcode_u16(opcode)?);
        put_network_u32(dst, len);
        Ok(())
    }

    fn max_opcode(&self) -> u32 { u32::from(u16::MAX) }
}

/// Varint payload length followed by a varint opcode.
///
/// The length covers only the payload, not the opcode.
#[derive(Clone, Copy, Debug)]
pub struct VarIntHeader {
    max_payload: usize,
}

impl VarIntHeader {
    /// Header rejecting payloads larger than `max_payload` bytes.
    #[must_use]
    pub fn new(max_payload: usize) -> Self { Self { max_payload } }

    /// Largest payload accepted in either direction.
    #[must_use]
    pub fn max_payload(&self) -> usize { self.max_payload }
}

impl Default for VarIntHeader {
    fn default() -> Self { Self::new(DEFAULT_MAX_PAYLOAD) }
}

impl HeaderFormat for VarIntHeader {
    fn read(&self, src: &mut ReplayCursor<'_>) -> Result<FrameHeader, CodecError> {
        let length = length_usize(src.read_varint()?)?;
        check_payload(length, self.max_payload)?;
        let opcode = src.read_varint()?;
        Ok(FrameHeader {
            opcode,
            length: Some(length),
        })
    }

    fn write(&self, dst: &mut BytesMut, opcode: u32, payload_len: usize) -> Result<(), CodecError> {
        check_payload(payload_len, self.max_payload)?;
        let len = u32::try_from(payload_len).map_err(|_| CodecError::Oversized {
            size: payload_len,
            max: self.max_payload,
        })?;
        dst.reserve(varint_len(len) + varint_len(opcode));
        put_varint(dst, len);
        put_varint(dst, opcode);
        Ok(())
    }

    fn max_opcode(&self) -> u32 { u32::MAX }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn round_trip<H: HeaderFormat>(header: &H, opcode: u32, len: usize) -> (FrameHeader, usize) {
        let mut buf = BytesMut::new();
        header.write(&mut buf, opcode, len).expect("header should encode");
        let mut cursor = ReplayCursor::new(&buf);
        let parsed = header.read(&mut cursor).expect("header should decode");
        assert_eq!(cursor.position(), buf.len(), "header read must consume exactly its bytes");
        (parsed, buf.len())
    }

    #[test]
    fn opcode_header_has_no_length() {
        let (parsed, size) = round_trip(&OpcodeHeader, 0x0102, 99);
        assert_eq!(parsed, FrameHeader { opcode: 0x0102, length: None });
        assert_eq!(size, 2);
    }

    #[test]
    fn length_prefixed_header_carries_length() {
        let (parsed, size) = round_trip(&LengthPrefixedHeader::default(), 7, 300);
        assert_eq!(parsed, FrameHeader { opcode: 7, length: Some(300) });
        assert_eq!(size, 6);
    }

    #[test]
    fn length_prefixed_header_rejects_oversized_payload() {
        let header = LengthPrefixedHeader::new(4);
        let data = [0x00, 0x01, 0x00, 0x00, 0x00, 0x05];
        let err = header
            .read(&mut ReplayCursor::new(&data))
            .expect_err("length above maximum must fail");
        assert!(matches!(err, CodecError::Oversized { size: 5, max: 4 }));

        let mut buf = BytesMut::new();
        assert!(header.write(&mut buf, 1, 5).is_err());
    }

    #[rstest]
    #[case::small(1, 0, 2)]
    #[case::wide_opcode(0x4000, 10, 4)]
    #[case::wide_length(3, 200, 3)]
    fn varint_header_sizes(#[case] opcode: u32, #[case] len: usize, #[case] expected_size: usize) {
        let (parsed, size) = round_trip(&VarIntHeader::default(), opcode, len);
        assert_eq!(parsed, FrameHeader { opcode, length: Some(len) });
        assert_eq!(size, expected_size);
    }

    #[test]
    fn varint_header_rejects_oversized_payload() {
        let header = VarIntHeader::new(4);
        let data = [0x05, 0x01];
        let err = header
            .read(&mut ReplayCursor::new(&data))
            .expect_err("length above maximum must fail");
        assert!(matches!(err, CodecError::Oversized { size: 5, max: 4 }));

        let mut buf = BytesMut::new();
        assert!(matches!(
            header.write(&mut buf, 1, 5),
            Err(CodecError::Oversized { size: 5, max: 4 })
        ));
        assert!(buf.is_empty(), "rejected header must not be written");
    }

    #[test]
    fn varint_header_rejects_huge_declared_length_before_buffering() {
        // 0xffff_ffff declared with no payload buffered yet.
        let data = [0xff, 0xff, 0xff, 0xff, 0x0f, 0x01];
        let err = VarIntHeader::default()
            .read(&mut ReplayCursor::new(&data))
            .expect_err("declared length exceeds default maximum");
        assert!(matches!(err, CodecError::Oversized { .. }));
    }

    #[test]
    fn varint_header_rejects_length_wider_than_u32() {
        let data = [0x80, 0x80, 0x80, 0x80, 0x10, 0x01];
        let err = VarIntHeader::new(usize::MAX)
            .read(&mut ReplayCursor::new(&data))
            .expect_err("2^32 does not fit the length field");
        assert!(matches!(err, CodecError::Malformed(_)));
    }

    #[test]
    fn u16_headers_reject_wide_opcodes() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            OpcodeHeader.write(&mut buf, 0x1_0000, 0),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn partial_header_is_incomplete() {
        let data = [0x00, 0x01, 0x00];
        let err = LengthPrefixedHeader::default()
            .read(&mut ReplayCursor::new(&data))
            .expect_err("header is truncated");
        assert!(err.is_incomplete());
    }
}
