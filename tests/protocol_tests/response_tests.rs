//! Response Tests
//!
//! Tests for response classification and the error-word scan.

use arclink::protocol::{contains_error_word, split_list, Response, Status};
use arclink::LinkError;

fn status(raw: &str) -> Status {
    Response::parse(raw).unwrap().status().clone()
}

fn exception(method: &str, message: &str) -> Status {
    Status::RemoteException {
        method: method.to_string(),
        message: message.to_string(),
    }
}

// =============================================================================
// Ok Responses
// =============================================================================

#[test]
fn test_bare_ok_tokens() {
    assert_eq!(status("SERVER_OK"), Status::Ok);
    assert_eq!(status("CLIENT_OK"), Status::Ok);
    assert_eq!(status("  SERVER_OK  "), Status::Ok);
}

#[test]
fn test_leading_ok_with_payload() {
    assert_eq!(
        status("SERVER_OK PCIe device 0"),
        Status::OkWithPayload("PCIe device 0".to_string())
    );
}

#[test]
fn test_trailing_ok_with_payload() {
    assert_eq!(
        status("0x444F4E CLIENT_OK"),
        Status::OkWithPayload("0x444F4E".to_string())
    );
}

#[test]
fn test_ok_payload_may_contain_exception_token() {
    // data after a leading ok token is never reinterpreted
    assert_eq!(
        status("SERVER_OK EXCEPTION.log\0other.fits"),
        Status::OkWithPayload("EXCEPTION.log\0other.fits".to_string())
    );
    assert_eq!(
        status("SERVER_OK file EXCEPTION here"),
        Status::OkWithPayload("file EXCEPTION here".to_string())
    );
}

#[test]
fn test_ok_token_must_be_whole() {
    let err = Response::parse("SERVER_OKAY").unwrap_err();
    assert!(matches!(err, LinkError::Protocol(_)));
}

// =============================================================================
// Exceptions
// =============================================================================

#[test]
fn test_exception_method_follows_sentinel() {
    assert_eq!(
        status("EXCEPTION Open Failed to open device 0: busy"),
        exception("Open", "Failed to open device 0: busy")
    );
}

#[test]
fn test_exception_method_precedes_sentinel() {
    assert_eq!(
        status("LoadControllerFile EXCEPTION timeout waiting for reply"),
        exception("LoadControllerFile", "timeout waiting for reply")
    );
}

#[test]
fn test_exception_without_message() {
    assert_eq!(status("EXCEPTION Reset"), exception("Reset", ""));
}

#[test]
fn test_exception_without_method_is_protocol_error() {
    assert!(matches!(Response::parse("EXCEPTION"), Err(LinkError::Protocol(_))));
}

#[test]
fn test_exceptional_is_not_an_exception() {
    let err = Response::parse("EXCEPTIONAL Open nope").unwrap_err();
    assert!(matches!(err, LinkError::Protocol(_)));
}

#[test]
fn test_into_result() {
    let ok = Response::parse("SERVER_OK 42").unwrap();
    assert!(ok.is_ok());
    assert_eq!(ok.into_result().unwrap(), "42");

    let bare = Response::parse("CLIENT_OK").unwrap();
    assert_eq!(bare.into_result().unwrap(), "");

    let failed = Response::parse("EXCEPTION Expose shutter jammed").unwrap();
    assert!(!failed.is_ok());
    match failed.into_result() {
        Err(LinkError::RemoteException { method, message }) => {
            assert_eq!(method, "Expose");
            assert_eq!(message, "shutter jammed");
        }
        other => panic!("Expected remote exception, got {:?}", other),
    }
}

// =============================================================================
// Malformed Responses
// =============================================================================

#[test]
fn test_empty_response_is_protocol_error() {
    assert!(matches!(Response::parse(""), Err(LinkError::Protocol(_))));
    assert!(matches!(Response::parse(" \t "), Err(LinkError::Protocol(_))));
}

#[test]
fn test_missing_sentinel_is_protocol_error() {
    assert!(matches!(
        Response::parse("some data without status"),
        Err(LinkError::Protocol(_))
    ));
}

#[test]
fn test_raw_text_is_preserved() {
    let response = Response::parse("SERVER_OK  spaced   out ").unwrap();
    assert_eq!(response.raw(), "SERVER_OK  spaced   out ");
    assert_eq!(response.payload(), Some("spaced   out"));
}

// =============================================================================
// String Lists
// =============================================================================

#[test]
fn test_string_list_preserves_order() {
    let response = Response::parse("SERVER_OK image3.fits\0image1.fits\0image2.fits").unwrap();
    assert_eq!(
        response.string_list(),
        vec!["image3.fits", "image1.fits", "image2.fits"]
    );
}

#[test]
fn test_string_list_trailing_separator() {
    assert_eq!(split_list("a\0b\0"), vec!["a", "b"]);
    assert_eq!(split_list("a\0\0b"), vec!["a", "", "b"]);
    assert_eq!(split_list("single"), vec!["single"]);
    assert!(split_list("").is_empty());
}

#[test]
fn test_string_list_of_bare_ok_is_empty() {
    assert!(Response::parse("SERVER_OK").unwrap().string_list().is_empty());
}

// =============================================================================
// Error Word Scan
// =============================================================================

#[test]
fn test_contains_error_word_exact_only() {
    assert!(contains_error_word("EXCEPTION"));
    assert!(contains_error_word(" EXCEPTION\n"));

    assert!(!contains_error_word("EXCEPTIONAL"));
    assert!(!contains_error_word("XEXCEPTION"));
    assert!(!contains_error_word("EXCEPT"));
    assert!(!contains_error_word("exception"));
    assert!(!contains_error_word("AN EXCEPTION"));
    assert!(!contains_error_word(""));
}
