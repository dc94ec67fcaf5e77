//! Unit tests for payload codecs.
//!
//! Covers the bincode codec round trip, replay behaviour on truncated input
//! and type checking on the erased encode path.

use bytes::BytesMut;
use proptest::prelude::*;

use super::*;

#[derive(bincode::Encode, bincode::Decode, Debug, Clone, PartialEq)]
struct Chat {
    channel: u16,
    text: String,
}

impl Message for Chat {}

#[derive(Debug)]
struct Other;

impl Message for Other {}

fn encode_chat(chat: &Chat) -> BytesMut {
    let mut buf = BytesMut::new();
    BincodeCodec::<Chat>::new()
        .encode(chat, &mut buf)
        .expect("encode should succeed");
    buf
}

#[test]
fn bincode_codec_consumes_exactly_one_payload() {
    let chat = Chat {
        channel: 3,
        text: "hi".into(),
    };
    let mut buf = encode_chat(&chat);
    let payload_len = buf.len();
    buf.extend_from_slice(&[0xaa, 0xbb]);

    let mut cursor = ReplayCursor::new(&buf);
    let decoded = BincodeCodec::<Chat>::new()
        .decode(&mut cursor)
        .expect("decode should succeed");
    assert_eq!(decoded, chat);
    assert_eq!(cursor.position(), payload_len);
}

#[test]
fn bincode_codec_reports_incomplete_on_truncated_input() {
    let buf = encode_chat(&Chat {
        channel: 1,
        text: "a longer line of text".into(),
    });
    let truncated = buf.get(..buf.len() - 3).expect("payload has more than 3 bytes");

    let mut cursor = ReplayCursor::new(truncated);
    let err = BincodeCodec::<Chat>::new()
        .decode(&mut cursor)
        .expect_err("truncated payload should not decode");
    assert!(err.is_incomplete(), "expected Incomplete, got {err:?}");
}

#[test]
fn bincode_codec_reports_overrun_inside_bounded_payload() {
    let buf = encode_chat(&Chat {
        channel: 1,
        text: "bounded".into(),
    });
    let mut cursor = ReplayCursor::new(&buf);
    cursor.bound(buf.len() - 2).expect("bytes are buffered");

    let err = BincodeCodec::<Chat>::new()
        .decode(&mut cursor)
        .expect_err("short bound should not decode");
    assert!(matches!(err, CodecError::PayloadOverrun { .. }), "got {err:?}");
}

#[test]
fn erased_codec_rejects_foreign_message_type() {
    let codec = handle(BincodeCodec::<Chat>::new());
    let mut buf = BytesMut::new();
    let err = codec
        .encode_message(&Other, &mut buf)
        .expect_err("foreign type must not encode");
    assert!(matches!(err, CodecError::TypeMismatch { .. }));
    assert!(buf.is_empty());
}

#[test]
fn erased_codec_reports_its_message_type() {
    let codec = handle(BincodeCodec::<Chat>::new());
    assert_eq!(codec.message_type(), MessageType::of::<Chat>());
}

proptest! {
    #[test]
    fn erased_round_trip_reproduces_message(channel in any::<u16>(), text in ".{0,64}") {
        let chat = Chat { channel, text };
        let codec = handle(BincodeCodec::<Chat>::new());

        let mut buf = BytesMut::new();
        codec.encode_message(&chat, &mut buf).expect("encode should succeed");
        let decoded = codec
            .decode_message(&mut ReplayCursor::new(&buf))
            .expect("decode should succeed");

        prop_assert_eq!(decoded.downcast_ref::<Chat>(), Some(&chat));
    }
}
