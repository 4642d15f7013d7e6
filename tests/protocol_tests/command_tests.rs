//! Command Tests
//!
//! Tests for building commands from format strings.

use arclink::args;
use arclink::protocol::{Arg, ClassToken, Command, FormatSpec, Method, MethodRegistry};
use arclink::LinkError;

#[test]
fn test_command_with_mixed_arguments() {
    let cmd = Command::new(
        ClassToken::Device,
        Method::Expose,
        "%.3f %u %u",
        &args![1.5f32, 4200u32, 4400u32],
    )
    .unwrap();
    assert_eq!(cmd.to_wire(), "Device Expose 1.500 4200 4400");
    assert_eq!(cmd.arguments(), "1.500 4200 4400");
}

#[test]
fn test_command_with_string_arguments() {
    let cmd = Command::new(
        ClassToken::FitsFile,
        Method::WriteFitsKeyword,
        "%s %s %d",
        &args!["/tmp/image.fits", "EXPTIME", 3],
    )
    .unwrap();
    assert_eq!(cmd.to_wire(), "FitsFile WriteFitsKeyword /tmp/image.fits EXPTIME 3");
}

#[test]
fn test_too_few_arguments() {
    let err = Command::new(ClassToken::Device, Method::SetImageSize, "%d %d", &args![1]).unwrap_err();
    assert!(matches!(err, LinkError::Protocol(_)));
}

#[test]
fn test_too_many_arguments() {
    let err = Command::new(ClassToken::Device, Method::Reset, "", &args![1]).unwrap_err();
    assert!(matches!(err, LinkError::Protocol(_)));
}

#[test]
fn test_wrong_argument_type() {
    let err = Command::new(ClassToken::Device, Method::Open, "%u", &[Arg::Float(1.0)]).unwrap_err();
    assert!(matches!(err, LinkError::Protocol(_)));
}

#[test]
fn test_format_spec_counts_conversions() {
    let spec = FormatSpec::parse("%d of %5.2f%% %s").unwrap();
    assert_eq!(spec.arg_count(), 3);
}

#[test]
fn test_registry_tokens_are_exact() {
    let registry = MethodRegistry::default();
    assert_eq!(Method::GetDeviceList.token(), "GetDeviceList");
    assert_eq!(ClassToken::Device.token(), "Device");
    assert_eq!(registry.exception(), "EXCEPTION");
    assert!(registry.is_ok_token("SERVER_OK"));
    assert!(registry.is_ok_token("CLIENT_OK"));
    assert!(!registry.is_ok_token("OK"));
}
