//! Codec Tests
//!
//! Tests for frame encoding and incremental frame reading.

use arclink::config::EolMode;
use arclink::protocol::{decode_text, encode_frame, read_exact_bytes, read_frame};
use arclink::LinkError;
use bytes::BytesMut;

use crate::common::MockTransport;

const MAX: usize = 1024;

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_line_frame() {
    let frame = encode_frame("Device ToString", EolMode::Line).unwrap();
    assert_eq!(frame, b"Device ToString\n");
}

#[test]
fn test_encode_length_prefixed_frame() {
    let frame = encode_frame("Device Open 0", EolMode::LengthPrefixed).unwrap();
    assert_eq!(&frame[..4], &13u32.to_be_bytes());
    assert_eq!(&frame[4..], b"Device Open 0");
}

#[test]
fn test_line_frame_rejects_embedded_newline() {
    let err = encode_frame("Device\nOpen", EolMode::Line).unwrap_err();
    assert!(matches!(err, LinkError::Protocol(_)));

    // length-prefixed frames carry any text
    assert!(encode_frame("Device\nOpen", EolMode::LengthPrefixed).is_ok());
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_read_line_frame_across_fragments() {
    let mut transport = MockTransport::new().reply("SERVER_OK fragmented payload").chunked(3);
    let mut buffer = BytesMut::new();

    let frame = read_frame(&mut transport, &mut buffer, EolMode::Line, MAX, 64).unwrap();
    assert_eq!(&frame[..], b"SERVER_OK fragmented payload");
    assert!(buffer.is_empty());
}

#[test]
fn test_read_line_frame_strips_carriage_return() {
    let mut transport = MockTransport::new().reply_bytes(b"SERVER_OK\r\n");
    let mut buffer = BytesMut::new();

    let frame = read_frame(&mut transport, &mut buffer, EolMode::Line, MAX, 64).unwrap();
    assert_eq!(&frame[..], b"SERVER_OK");
}

#[test]
fn test_read_line_frame_keeps_following_bytes() {
    let mut transport = MockTransport::new().reply_bytes(b"SERVER_OK one\nSERVER_OK two\n");
    let mut buffer = BytesMut::new();

    let first = read_frame(&mut transport, &mut buffer, EolMode::Line, MAX, 64).unwrap();
    assert_eq!(&first[..], b"SERVER_OK one");
    assert_eq!(&buffer[..], b"SERVER_OK two\n");

    let second = read_frame(&mut transport, &mut buffer, EolMode::Line, MAX, 64).unwrap();
    assert_eq!(&second[..], b"SERVER_OK two");
}

#[test]
fn test_read_line_frame_too_long() {
    let long = "x".repeat(MAX * 2);
    let mut transport = MockTransport::new().reply(&long).chunked(100);
    let mut buffer = BytesMut::new();

    let err = read_frame(&mut transport, &mut buffer, EolMode::Line, MAX, 4096).unwrap_err();
    assert!(matches!(err, LinkError::Protocol(_)));
}

#[test]
fn test_read_prefixed_frame_across_fragments() {
    let mut transport = MockTransport::new()
        .reply_prefixed("SERVER_OK with\nnewline")
        .chunked(2);
    let mut buffer = BytesMut::new();

    let frame =
        read_frame(&mut transport, &mut buffer, EolMode::LengthPrefixed, MAX, 64).unwrap();
    assert_eq!(&frame[..], b"SERVER_OK with\nnewline");
}

#[test]
fn test_read_prefixed_frame_too_large() {
    let mut header = ((MAX + 1) as u32).to_be_bytes().to_vec();
    header.extend_from_slice(b"ignored");
    let mut transport = MockTransport::new().reply_bytes(&header);
    let mut buffer = BytesMut::new();

    let err =
        read_frame(&mut transport, &mut buffer, EolMode::LengthPrefixed, MAX, 64).unwrap_err();
    assert!(matches!(err, LinkError::Protocol(_)));
}

#[test]
fn test_read_frame_peer_closed() {
    let mut transport = MockTransport::new().reply_bytes(b"SERVER_OK no terminator");
    let mut buffer = BytesMut::new();

    let err = read_frame(&mut transport, &mut buffer, EolMode::Line, MAX, 64).unwrap_err();
    assert!(matches!(err, LinkError::Connection(_)));
}

#[test]
fn test_read_exact_bytes_does_not_overread() {
    let mut transport = MockTransport::new().reply_bytes(b"0123456789");
    let mut buffer = BytesMut::new();

    let bytes = read_exact_bytes(&mut transport, &mut buffer, 4, 64).unwrap();
    assert_eq!(&bytes[..], b"0123");
    assert!(buffer.is_empty());
    assert_eq!(
        arclink::transport::Transport::bytes_available(&mut transport).unwrap(),
        6
    );
}

#[test]
fn test_decode_text_rejects_invalid_utf8() {
    assert_eq!(decode_text(b"SERVER_OK").unwrap(), "SERVER_OK");
    assert!(matches!(decode_text(&[0xff, 0xfe]), Err(LinkError::Protocol(_))));
}
