//! Tests for Connection
//!
//! These tests verify:
//! - Payload and remote exception results
//! - Local precondition failures send nothing
//! - State handling (closed, broken, unconsumed data)
//! - Both framing modes

use arclink::config::{ClientConfig, EolMode};
use arclink::{args, Arg, ClassToken, Connection, ConnectionState, Device, LinkError, Method};

use crate::common::{mock_connection, MockTransport};

// =============================================================================
// Successful Calls
// =============================================================================

#[test]
fn test_call_returns_payload() {
    let mut conn = mock_connection(MockTransport::new().reply("SERVER_OK arclink device"));

    let reply = conn
        .call_method(ClassToken::Device, Method::ToString, "", &[])
        .unwrap();

    assert_eq!(reply, "arclink device");
    assert_eq!(conn.transport().sent_text(), "Device ToString\n");
    assert!(conn.is_open());
}

#[test]
fn test_call_formats_arguments() {
    let mut conn = mock_connection(MockTransport::new().reply("SERVER_OK 0x444F4E"));

    let reply = conn
        .call_method(
            ClassToken::Device,
            Method::Command,
            "%u %#x %#x",
            &args![2u32, 0x544444u32, 0x30u32],
        )
        .unwrap();

    assert_eq!(reply, "0x444F4E");
    assert_eq!(conn.transport().sent_text(), "Device Command 2 0x544444 0x30\n");
}

#[test]
fn test_padded_arguments_sent_verbatim() {
    let mut conn = mock_connection(MockTransport::new().reply("SERVER_OK"));

    conn.call_method(ClassToken::Device, Method::Open, "%5d", &args![7])
        .unwrap();

    assert_eq!(conn.transport().sent_text(), "Device Open     7\n");
}

#[test]
fn test_bare_ok_returns_empty_string() {
    let mut conn = mock_connection(MockTransport::new().reply("CLIENT_OK"));
    let reply = conn.call_method(ClassToken::Device, Method::Reset, "", &[]).unwrap();
    assert_eq!(reply, "");
}

#[test]
fn test_trailing_ok_token() {
    let mut conn = mock_connection(MockTransport::new().reply("4200 SERVER_OK"));
    let reply = conn
        .call_method(ClassToken::Device, Method::GetImageRows, "", &[])
        .unwrap();
    assert_eq!(reply, "4200");
}

#[test]
fn test_call_method_list() {
    let mut conn = mock_connection(MockTransport::new().reply("SERVER_OK b.fits\0a.fits\0c.fits"));

    let list = conn
        .call_method_list(ClassToken::Image, Method::GetDirectoryList, "%s", &args!["/data"])
        .unwrap();

    assert_eq!(list, vec!["b.fits", "a.fits", "c.fits"]);
}

#[test]
fn test_fragmented_response() {
    let mut conn = mock_connection(
        MockTransport::new()
            .reply("SERVER_OK slowly arriving payload")
            .chunked(1),
    );
    let reply = conn.call_method(ClassToken::Device, Method::ToString, "", &[]).unwrap();
    assert_eq!(reply, "slowly arriving payload");
}

#[test]
fn test_sequential_calls_reuse_connection() {
    let mut conn = mock_connection(
        MockTransport::new()
            .reply("SERVER_OK 1")
            .reply("SERVER_OK 2")
            .reply("SERVER_OK 3"),
    );

    for expected in ["1", "2", "3"] {
        let reply = conn.call_method(ClassToken::Device, Method::IsOpen, "", &[]).unwrap();
        assert_eq!(reply, expected);
    }
    assert_eq!(conn.transport().send_calls, 3);
}

#[test]
fn test_length_prefixed_mode() {
    let config = ClientConfig::builder().eol_mode(EolMode::LengthPrefixed).build();
    let transport = MockTransport::new().reply_prefixed("SERVER_OK multi\nline");
    let mut conn = Connection::with_transport(transport, config);

    let reply = conn
        .call_method(ClassToken::FitsFile, Method::GetFitsHeader, "%s", &args!["/tmp/a.fits"])
        .unwrap();

    assert_eq!(reply, "multi\nline");
    let sent = &conn.transport().sent;
    let text = b"FitsFile GetFitsHeader /tmp/a.fits";
    assert_eq!(&sent[..4], &(text.len() as u32).to_be_bytes());
    assert_eq!(&sent[4..], text);
}

// =============================================================================
// Remote Exceptions
// =============================================================================

#[test]
fn test_remote_exception() {
    let mut conn = mock_connection(MockTransport::new().reply("EXCEPTION Open device 3 not found"));

    let err = conn
        .call_method(ClassToken::Device, Method::Open, "%u", &args![3u32])
        .unwrap_err();

    match err {
        LinkError::RemoteException { method, message } => {
            assert_eq!(method, "Open");
            assert_eq!(message, "device 3 not found");
        }
        other => panic!("Expected remote exception, got {:?}", other),
    }
    // the full response was consumed, so the connection is reusable
    assert_eq!(conn.state(), ConnectionState::Open);
}

#[test]
fn test_call_method_response_keeps_exception_as_status() {
    let mut conn = mock_connection(MockTransport::new().reply("EXCEPTION Expose shutter"));
    let response = conn
        .call_method_response(ClassToken::Device, Method::Expose, "%f %u %u", &args![1.0, 10u32, 10u32])
        .unwrap();
    assert!(!response.is_ok());
}

#[test]
fn test_connection_usable_after_exception() {
    let mut conn = mock_connection(
        MockTransport::new()
            .reply("EXCEPTION Open busy")
            .reply("SERVER_OK"),
    );

    assert!(conn.call_method(ClassToken::Device, Method::Open, "%u", &args![0u32]).is_err());
    assert!(conn.call_method(ClassToken::Device, Method::Open, "%u", &args![1u32]).is_ok());
}

// =============================================================================
// Local Precondition Failures
// =============================================================================

#[test]
fn test_argument_count_mismatch_sends_nothing() {
    let mut conn = mock_connection(MockTransport::new().reply("SERVER_OK"));

    for (format, args) in [
        ("%d %d", vec![Arg::Int(1)]),
        ("%d", vec![]),
        ("", vec![Arg::Int(1)]),
        ("%s %s %s", vec![Arg::from("a"), Arg::from("b")]),
    ] {
        let err = conn
            .call_method(ClassToken::Device, Method::SetImageSize, format, &args)
            .unwrap_err();
        assert!(matches!(err, LinkError::Protocol(_)), "format {:?}", format);
    }

    assert!(conn.transport().sent.is_empty());
    assert_eq!(conn.transport().send_calls, 0);
    assert!(conn.is_open());
}

#[test]
fn test_argument_type_mismatch_sends_nothing() {
    let mut conn = mock_connection(MockTransport::new().reply("SERVER_OK"));

    let err = conn
        .call_method(ClassToken::Device, Method::Open, "%u", &args!["zero"])
        .unwrap_err();

    assert!(matches!(err, LinkError::Protocol(_)));
    assert!(conn.transport().sent.is_empty());
}

#[test]
fn test_newline_in_argument_sends_nothing() {
    let mut conn = mock_connection(MockTransport::new().reply("SERVER_OK"));

    let err = conn
        .call_method(ClassToken::FitsFile, Method::GetFitsHeader, "%s", &args!["a\nb"])
        .unwrap_err();

    assert!(matches!(err, LinkError::Protocol(_)));
    assert!(conn.transport().sent.is_empty());
}

// =============================================================================
// Connection State
// =============================================================================

#[test]
fn test_closed_connection_fails_without_io() {
    let mut conn = mock_connection(MockTransport::new().reply("SERVER_OK"));
    conn.close();

    let err = conn
        .call_method(ClassToken::Device, Method::ToString, "", &[])
        .unwrap_err();

    assert!(matches!(err, LinkError::Connection(_)));
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(conn.transport().sent.is_empty());
}

#[test]
fn test_close_is_idempotent() {
    let mut conn = mock_connection(MockTransport::new());
    conn.close();
    conn.close();
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(!arclink::transport::Transport::is_open(conn.transport()));
}

#[test]
fn test_closed_transport_starts_closed() {
    let mut transport = MockTransport::new();
    arclink::transport::Transport::close(&mut transport);
    let conn = mock_connection(transport);
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[test]
fn test_peer_disconnect_breaks_connection() {
    // no scripted reply: the peer closes instead of answering
    let mut conn = mock_connection(MockTransport::new());

    let err = conn
        .call_method(ClassToken::Device, Method::ToString, "", &[])
        .unwrap_err();
    assert!(matches!(err, LinkError::Connection(_)));
    assert_eq!(conn.state(), ConnectionState::Broken);

    let sent_before = conn.transport().sent.len();
    let err = conn
        .call_method(ClassToken::Device, Method::ToString, "", &[])
        .unwrap_err();
    assert!(matches!(err, LinkError::Connection(_)));
    assert_eq!(conn.transport().sent.len(), sent_before);
}

#[test]
fn test_send_failure_breaks_connection() {
    let mut conn = mock_connection(MockTransport::new().reply("SERVER_OK").fail_send_after(4));

    let err = conn
        .call_method(ClassToken::Device, Method::ToString, "", &[])
        .unwrap_err();

    assert!(matches!(err, LinkError::Connection(_)));
    assert_eq!(conn.state(), ConnectionState::Broken);
}

#[test]
fn test_malformed_response_keeps_connection_open() {
    let mut conn = mock_connection(
        MockTransport::new()
            .reply("this is not a valid response")
            .reply("SERVER_OK recovered"),
    );

    let err = conn
        .call_method(ClassToken::Device, Method::ToString, "", &[])
        .unwrap_err();
    assert!(matches!(err, LinkError::Protocol(_)));
    assert!(conn.is_open());

    let reply = conn.call_method(ClassToken::Device, Method::ToString, "", &[]).unwrap();
    assert_eq!(reply, "recovered");
}

#[test]
fn test_oversize_response_breaks_connection() {
    let config = ClientConfig::builder().max_response_size(16).build();
    let transport = MockTransport::new().reply("SERVER_OK this payload is far too long");
    let mut conn = Connection::with_transport(transport, config);

    let err = conn
        .call_method(ClassToken::Device, Method::ToString, "", &[])
        .unwrap_err();

    assert!(matches!(err, LinkError::Protocol(_)));
    assert_eq!(conn.state(), ConnectionState::Broken);
}

// =============================================================================
// Single Outstanding Call
// =============================================================================

#[test]
fn test_unconsumed_response_is_detected() {
    // two frames arrive for one request
    let mut conn = mock_connection(MockTransport::new().reply_bytes(b"SERVER_OK a\nSERVER_OK b\n"));

    let reply = conn.call_method(ClassToken::Device, Method::ToString, "", &[]).unwrap();
    assert_eq!(reply, "a");
    let sent_before = conn.transport().sent.len();

    let err = conn
        .call_method(ClassToken::Device, Method::ToString, "", &[])
        .unwrap_err();
    assert!(matches!(err, LinkError::Protocol(_)));
    assert_eq!(conn.transport().sent.len(), sent_before);
}

#[test]
fn test_pending_inbound_data_is_detected() {
    let mut conn = mock_connection(
        MockTransport::new()
            .unsolicited(b"SERVER_OK stale\n")
            .reply("SERVER_OK fresh"),
    );

    let err = conn
        .call_method(ClassToken::Device, Method::ToString, "", &[])
        .unwrap_err();
    assert!(matches!(err, LinkError::Protocol(_)));
    assert!(conn.transport().sent.is_empty());

    assert_eq!(conn.discard_pending().unwrap(), 16);
    let reply = conn.call_method(ClassToken::Device, Method::ToString, "", &[]).unwrap();
    assert_eq!(reply, "fresh");
}

// =============================================================================
// Raw Commands
// =============================================================================

#[test]
fn test_send_invalid_command_surfaces_remote_exception() {
    let mut conn = mock_connection(MockTransport::new().reply("EXCEPTION Unknown malformed command"));

    let err = conn.send_invalid_command("garbage").unwrap_err();

    assert!(matches!(err, LinkError::RemoteException { .. }));
    assert_eq!(conn.transport().sent_text(), "garbage\n");
}

#[test]
fn test_send_invalid_command_surfaces_protocol_error() {
    let mut conn = mock_connection(MockTransport::new().reply("???"));
    let err = conn.send_invalid_command("Device ???").unwrap_err();
    assert!(matches!(err, LinkError::Protocol(_)));
}

// =============================================================================
// Device Facade
// =============================================================================

#[test]
fn test_device_facade_commands() {
    let mut conn = mock_connection(
        MockTransport::new()
            .reply("SERVER_OK PCIe:0\0PCI:0")
            .reply("SERVER_OK")
            .reply("SERVER_OK 1")
            .reply("SERVER_OK 0x444F4E")
            .reply("SERVER_OK"),
    );

    let mut device = Device::new(&mut conn);
    assert_eq!(device.device_list().unwrap(), vec!["PCIe:0", "PCI:0"]);
    device.open(0).unwrap();
    assert!(device.is_open().unwrap());
    assert_eq!(device.command(2, 0x544444, &[0x30]).unwrap(), 0x444F4E);
    device
        .write_fits_keyword("/tmp/a.fits", "EXPTIME", "1.5", "seconds")
        .unwrap();

    assert_eq!(
        conn.transport().sent_text(),
        "Device GetDeviceList\n\
         Device Open 0\n\
         Device IsOpen\n\
         Device Command 2 0x544444 0x30\n\
         FitsFile WriteFitsKeyword /tmp/a.fits EXPTIME 1.5 seconds\n"
    );
}
