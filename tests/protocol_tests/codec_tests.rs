//! Codec Tests
//!
//! Tests for request and response encoding/decoding.

use std::io::Cursor;

use ledgerkv::protocol::{
    decode_request, decode_response, encode_request, encode_response, read_request,
    read_response, write_request, write_response, Request, Response, Status, HEADER_SIZE,
    MAX_PAYLOAD_SIZE,
};
use ledgerkv::LedgerError;

// =============================================================================
// Request Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_get_layout() {
    let request = Request::Get {
        key: "hello".to_string(),
    };
    let encoded = encode_request(&request);

    assert_eq!(encoded[0], 0x01);
    assert_eq!(&encoded[1..5], &9u32.to_be_bytes());
    assert_eq!(&encoded[5..9], &5u32.to_be_bytes());
    assert_eq!(&encoded[9..], b"hello");
}

#[test]
fn test_encode_set_layout() {
    let request = Request::Set {
        key: "k".to_string(),
        value: "value".to_string(),
    };
    let encoded = encode_request(&request);

    assert_eq!(encoded[0], 0x02);
    assert_eq!(&encoded[1..5], &10u32.to_be_bytes());
    assert_eq!(&encoded[5..9], &1u32.to_be_bytes());
    assert_eq!(&encoded[9..10], b"k");
    assert_eq!(&encoded[10..], b"value");
}

#[test]
fn test_decode_requests() {
    let requests = vec![
        Request::Get {
            key: "a".to_string(),
        },
        Request::Set {
            key: "key with spaces".to_string(),
            value: "ünïcødé".to_string(),
        },
        Request::Set {
            key: "empty".to_string(),
            value: String::new(),
        },
        Request::Rm {
            key: "a".to_string(),
        },
    ];

    for request in requests {
        assert_eq!(decode_request(&encode_request(&request)).unwrap(), request);
    }
}

#[test]
fn test_decode_unknown_op() {
    let mut encoded = encode_request(&Request::Get {
        key: "k".to_string(),
    });
    encoded[0] = 0x7F;

    let err = decode_request(&encoded).unwrap_err();
    assert!(matches!(err, LedgerError::Protocol(_)));
    assert!(err.to_string().contains("0x7f"));
}

#[test]
fn test_decode_truncated_request() {
    let encoded = encode_request(&Request::Set {
        key: "key".to_string(),
        value: "value".to_string(),
    });

    assert!(matches!(
        decode_request(&encoded[..3]),
        Err(LedgerError::Protocol(_))
    ));
    assert!(matches!(
        decode_request(&encoded[..encoded.len() - 1]),
        Err(LedgerError::Protocol(_))
    ));
}

#[test]
fn test_decode_key_longer_than_payload() {
    // GET whose key_len claims 100 bytes but carries 2
    let mut message = vec![0x01];
    message.extend_from_slice(&6u32.to_be_bytes());
    message.extend_from_slice(&100u32.to_be_bytes());
    message.extend_from_slice(b"ab");

    assert!(matches!(
        decode_request(&message),
        Err(LedgerError::Protocol(_))
    ));
}

#[test]
fn test_decode_get_with_trailing_bytes() {
    let mut message = vec![0x01];
    message.extend_from_slice(&7u32.to_be_bytes());
    message.extend_from_slice(&1u32.to_be_bytes());
    message.extend_from_slice(b"kxy");

    assert!(matches!(
        decode_request(&message),
        Err(LedgerError::Protocol(_))
    ));
}

#[test]
fn test_decode_invalid_utf8_key() {
    let mut message = vec![0x03];
    message.extend_from_slice(&6u32.to_be_bytes());
    message.extend_from_slice(&2u32.to_be_bytes());
    message.extend_from_slice(&[0xC3, 0x28]);

    let err = decode_request(&message).unwrap_err();
    assert!(err.to_string().contains("UTF-8"));
}

#[test]
fn test_oversized_payload_rejected() {
    let mut header = vec![0x02];
    header.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());
    assert_eq!(header.len(), HEADER_SIZE);

    assert!(matches!(
        decode_request(&header),
        Err(LedgerError::Protocol(_))
    ));
    // The stream reader refuses before allocating the payload
    assert!(matches!(
        read_request(&mut Cursor::new(header)),
        Err(LedgerError::Protocol(_))
    ));
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_response_layout() {
    let encoded = encode_response(&Response::success(Some("v".to_string())));
    assert_eq!(encoded, vec![0x00, 0, 0, 0, 2, 1, b'v']);

    let encoded = encode_response(&Response::success(None));
    assert_eq!(encoded, vec![0x00, 0, 0, 0, 1, 0]);
}

#[test]
fn test_decode_responses() {
    let responses = vec![
        Response::success(None),
        Response::success(Some(String::new())),
        Response::success(Some("value".to_string())),
        Response::failure("key too long"),
    ];

    for response in responses {
        assert_eq!(decode_response(&encode_response(&response)).unwrap(), response);
    }
}

#[test]
fn test_failure_carries_message() {
    let decoded = decode_response(&encode_response(&Response::failure("boom"))).unwrap();

    assert_eq!(decoded.status, Status::Failure);
    assert!(!decoded.is_success());
    assert_eq!(decoded.value.as_deref(), Some("boom"));
}

#[test]
fn test_decode_bad_response_status() {
    let message = vec![0x09, 0, 0, 0, 1, 0];
    assert!(matches!(
        decode_response(&message),
        Err(LedgerError::Protocol(_))
    ));
}

#[test]
fn test_decode_bad_value_flag() {
    let message = vec![0x00, 0, 0, 0, 1, 7];
    assert!(matches!(
        decode_response(&message),
        Err(LedgerError::Protocol(_))
    ));

    let missing_flag = vec![0x00, 0, 0, 0, 0];
    assert!(matches!(
        decode_response(&missing_flag),
        Err(LedgerError::Protocol(_))
    ));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_requests_back_to_back() {
    let first = Request::Set {
        key: "a".to_string(),
        value: "1".to_string(),
    };
    let second = Request::Rm {
        key: "a".to_string(),
    };

    let mut buf = Vec::new();
    write_request(&mut buf, &first).unwrap();
    write_request(&mut buf, &second).unwrap();

    let mut cursor = Cursor::new(buf);
    assert_eq!(read_request(&mut cursor).unwrap(), first);
    assert_eq!(read_request(&mut cursor).unwrap(), second);
    assert!(matches!(
        read_request(&mut cursor),
        Err(LedgerError::Io(_))
    ));
}

#[test]
fn test_stream_response() {
    let response = Response::success(Some("hello".to_string()));

    let mut buf = Vec::new();
    write_response(&mut buf, &response).unwrap();

    let mut cursor = Cursor::new(buf);
    assert_eq!(read_response(&mut cursor).unwrap(), response);
}

#[test]
fn test_stream_truncated_response_is_io_error() {
    let mut buf = encode_response(&Response::success(Some("hello".to_string())));
    buf.truncate(buf.len() - 2);

    assert!(matches!(
        read_response(&mut Cursor::new(buf)),
        Err(LedgerError::Io(_))
    ));
}
