//! Codec Tests
//!
//! Tests for request encoding and response decoding.

use std::io::{self, Cursor, Write};

use transgate::protocol::{
    decode_command, decode_response, encode_command, encode_response, read_request,
    strip_terminator, write_command, Command, Parameter, ParamValue, Response,
};
use transgate::GatewayError;

// =============================================================================
// Helper Functions
// =============================================================================

/// What a backend would send back if it echoed the request fields
fn server_echo(request: &[u8]) -> Vec<u8> {
    strip_terminator(request).unwrap().to_vec()
}

/// Writer whose peer has gone away
struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer closed"))
    }
}

// =============================================================================
// Command Encoding Tests
// =============================================================================

#[test]
fn test_encode_command_no_params() {
    let encoded = encode_command(&Command::new("ping"));
    assert_eq!(encoded, b"cmd:ping\ncommit:1\nend\n");
}

#[test]
fn test_encode_command_plain_params_in_order() {
    let cmd = Command::new("test").param("param1", "ok").param("b", "2");
    assert_eq!(
        encode_command(&cmd),
        b"cmd:test\nparam1:ok\nb:2\ncommit:1\nend\n"
    );
}

#[test]
fn test_encode_command_integer_params() {
    let cmd = Command::new("get_ad")
        .param("ad_id", 42)
        .param("offset", -7i64)
        .param("limit", 10usize);
    assert_eq!(
        encode_command(&cmd),
        b"cmd:get_ad\nad_id:42\noffset:-7\nlimit:10\ncommit:1\nend\n"
    );
}

#[test]
fn test_encode_command_explicit_blob() {
    let cmd = Command::new("store").blob("data", "abc");
    assert_eq!(
        encode_command(&cmd),
        b"cmd:store\nblob:3:data\nabc\ncommit:1\nend\n"
    );
}

#[test]
fn test_encode_command_newline_promotes_to_blob() {
    let cmd = Command::new("store").param("body", "line1\nline2");
    assert_eq!(
        encode_command(&cmd),
        b"cmd:store\nblob:11:body\nline1\nline2\ncommit:1\nend\n"
    );
}

#[test]
fn test_encode_command_blob_length_counts_bytes() {
    // "ñ" is two bytes in UTF-8
    let cmd = Command::new("store").blob("name", "ñu");
    assert_eq!(
        encode_command(&cmd),
        "cmd:store\nblob:3:name\nñu\ncommit:1\nend\n".as_bytes()
    );
}

#[test]
fn test_encode_command_does_not_escape_colons() {
    let cmd = Command::new("set").param("url", "http://example.com:8080");
    assert_eq!(
        encode_command(&cmd),
        b"cmd:set\nurl:http://example.com:8080\ncommit:1\nend\n"
    );
}

#[test]
fn test_encode_command_empty_blob() {
    let cmd = Command::new("store").blob("data", "");
    assert_eq!(
        encode_command(&cmd),
        b"cmd:store\nblob:0:data\n\ncommit:1\nend\n"
    );
}

// =============================================================================
// Response Decoding Tests
// =============================================================================

#[test]
fn test_decode_simple_response() {
    let response = decode_response(b"status:TRANS_OK\nad_id:12\n").unwrap();

    assert_eq!(response.status(), "TRANS_OK");
    assert_eq!(response.error(), None);
    assert_eq!(response.get("ad_id"), Some("12"));
}

#[test]
fn test_decode_empty_body() {
    let response = decode_response(b"").unwrap();

    assert_eq!(response.status(), "");
    assert!(response.map().is_empty());
    assert!(response.records().is_empty());
}

#[test]
fn test_decode_multi_record_grouping() {
    let wire = b"status:OK\na:1\nb:x\na:2\nb:y\nend\n";
    let response = decode_response(strip_terminator(wire).unwrap()).unwrap();

    assert_eq!(response.status(), "OK");

    let records = response.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("a").map(String::as_str), Some("1"));
    assert_eq!(records[0].get("b").map(String::as_str), Some("x"));
    assert_eq!(records[1].get("a").map(String::as_str), Some("2"));
    assert_eq!(records[1].get("b").map(String::as_str), Some("y"));

    let map = response.map();
    assert_eq!(map.len(), 2);
    assert_eq!(map["a"], "2");
    assert_eq!(map["b"], "y");
}

#[test]
fn test_decode_status_only_has_zero_records() {
    let response = decode_response(b"status:TRANS_OK\n").unwrap();
    assert!(response.records().is_empty());
}

#[test]
fn test_decode_value_containing_colon() {
    let response = decode_response(b"url:http://host:80/x\n").unwrap();
    assert_eq!(response.get("url"), Some("http://host:80/x"));
}

#[test]
fn test_decode_empty_value() {
    let response = decode_response(b"name:\n").unwrap();
    assert_eq!(response.get("name"), Some(""));
}

#[test]
fn test_decode_blob_with_newlines() {
    let response =
        decode_response(b"status:TRANS_OK\nblob:12:body\nline1\nline2\n\nafter:yes\n").unwrap();

    assert_eq!(response.get("body"), Some("line1\nline2\n"));
    assert_eq!(response.get("after"), Some("yes"));
}

#[test]
fn test_decode_blob_containing_terminator_line() {
    let response = decode_response(b"blob:8:data\nend\nend\n\n").unwrap();
    assert_eq!(response.get("data"), Some("end\nend\n"));
}

#[test]
fn test_decode_error_field_promoted() {
    let response = decode_response(b"status:TRANS_ERROR\nerror:bad things\n").unwrap();

    assert_eq!(response.status(), "TRANS_ERROR");
    assert_eq!(response.error(), Some("bad things"));
    assert!(response.map().is_empty());
}

#[test]
fn test_decode_invalid_blob_length() {
    let err = decode_response(b"blob:abc:key\nvalue\n").unwrap_err();
    assert!(matches!(err, GatewayError::DecodeMalformed(_)), "got {:?}", err);
}

#[test]
fn test_decode_negative_blob_length() {
    let err = decode_response(b"blob:-1:key\n\n").unwrap_err();
    assert!(matches!(err, GatewayError::DecodeMalformed(_)), "got {:?}", err);
}

#[test]
fn test_decode_blob_header_without_separator() {
    let err = decode_response(b"blob:12").unwrap_err();
    assert!(matches!(err, GatewayError::DecodeMalformed(_)), "got {:?}", err);
}

#[test]
fn test_decode_blob_value_overruns_buffer() {
    let err = decode_response(b"blob:50:key\nshort\n").unwrap_err();
    assert!(matches!(err, GatewayError::DecodeMalformed(_)), "got {:?}", err);
}

#[test]
fn test_decode_blob_without_trailing_newline() {
    let err = decode_response(b"blob:3:key\nabcX").unwrap_err();
    assert!(matches!(err, GatewayError::DecodeMalformed(_)), "got {:?}", err);
}

#[test]
fn test_decode_missing_newline() {
    let err = decode_response(b"status:TRANS_OK\nkey:value").unwrap_err();
    assert!(matches!(err, GatewayError::DecodeMalformed(_)), "got {:?}", err);
}

#[test]
fn test_decode_missing_key_separator() {
    let err = decode_response(b"status:TRANS_OK\ngarbage\n").unwrap_err();
    assert!(matches!(err, GatewayError::DecodeMalformed(_)), "got {:?}", err);
}

#[test]
fn test_decode_invalid_utf8() {
    let err = decode_response(b"key:\xff\xfe\n").unwrap_err();
    assert!(matches!(err, GatewayError::DecodeMalformed(_)), "got {:?}", err);
}

// =============================================================================
// Terminator Tests
// =============================================================================

#[test]
fn test_strip_terminator() {
    assert_eq!(strip_terminator(b"a:1\nend\n").unwrap(), b"a:1\n");
    assert_eq!(strip_terminator(b"end\n").unwrap(), b"");
}

#[test]
fn test_strip_terminator_truncated() {
    let err = strip_terminator(b"status:TRANS_OK\n").unwrap_err();
    assert!(matches!(err, GatewayError::ResponseTruncated(_)), "got {:?}", err);

    let err = strip_terminator(b"").unwrap_err();
    assert!(matches!(err, GatewayError::ResponseTruncated(_)), "got {:?}", err);

    let err = strip_terminator(b"status:TRANS_OK\nend").unwrap_err();
    assert!(matches!(err, GatewayError::ResponseTruncated(_)), "got {:?}", err);
}

// =============================================================================
// Echo Tests
// =============================================================================

#[test]
fn test_plain_params_survive_server_echo() {
    let cmd = Command::new("newad")
        .param("email", "someone@example.com")
        .param("price", 1500)
        .param("region", "15");

    let response = decode_response(&server_echo(&encode_command(&cmd))).unwrap();

    let pairs: Vec<(&str, &str)> = response
        .data_fields()
        .filter(|(key, _)| *key != "cmd" && *key != "commit")
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("email", "someone@example.com"),
            ("price", "1500"),
            ("region", "15"),
        ]
    );
}

#[test]
fn test_blob_survives_server_echo() {
    let body = "first line\n\nthird line\nend\n";
    let cmd = Command::new("store").blob("body", body);

    let response = decode_response(&server_echo(&encode_command(&cmd))).unwrap();

    let value = response.get("body").unwrap();
    assert_eq!(value.len(), body.len());
    assert_eq!(value, body);
}

// =============================================================================
// Request Decoding Tests (backend side)
// =============================================================================

#[test]
fn test_decode_command_recovers_params_and_blob_flags() {
    let cmd = Command::new("store")
        .param("id", 7)
        .param("note", "two\nlines")
        .blob("raw", "x");

    let decoded = decode_command(&server_echo(&encode_command(&cmd))).unwrap();

    assert_eq!(decoded.name, "store");
    assert_eq!(
        decoded.params,
        vec![
            Parameter::new("id", "7"),
            Parameter::blob("note", "two\nlines"),
            Parameter::blob("raw", "x"),
        ]
    );
}

#[test]
fn test_decode_command_requires_cmd_first() {
    let err = decode_command(b"a:1\ncmd:x\n").unwrap_err();
    assert!(matches!(err, GatewayError::DecodeMalformed(_)), "got {:?}", err);

    let err = decode_command(b"").unwrap_err();
    assert!(matches!(err, GatewayError::DecodeMalformed(_)), "got {:?}", err);
}

#[test]
fn test_read_request_honors_blob_framing() {
    let cmd = Command::new("store").blob("body", "a\nend\nb");
    let mut reader = Cursor::new(encode_command(&cmd));

    let raw = read_request(&mut reader).unwrap();
    let decoded = decode_command(&raw).unwrap();

    assert_eq!(decoded.params[0].value, ParamValue::from("a\nend\nb"));
}

#[test]
fn test_read_request_truncated() {
    let mut reader = Cursor::new(b"cmd:ping\ncommit:1\n".to_vec());
    let err = read_request(&mut reader).unwrap_err();
    assert!(matches!(err, GatewayError::ResponseTruncated(_)), "got {:?}", err);
}

// =============================================================================
// Response Encoding Tests (backend side)
// =============================================================================

#[test]
fn test_encode_response_status_first_then_fields() {
    let response = Response::default()
        .field("a", "1")
        .field("status", "TRANS_OK")
        .field("body", "x\ny");

    assert_eq!(
        encode_response(&response),
        b"status:TRANS_OK\na:1\nblob:3:body\nx\ny\nend\n"
    );
}

#[test]
fn test_encode_response_with_error() {
    let mut response = Response::with_status("TRANS_ERROR");
    response.set_error("boom");

    assert_eq!(
        encode_response(&response),
        b"status:TRANS_ERROR\nerror:boom\nend\n"
    );
}

// =============================================================================
// Stream Writing Tests
// =============================================================================

#[test]
fn test_write_command_writes_encoded_bytes() {
    let command = Command::new("save").param("id", 7).blob("note", "a\nb");
    let mut out = Vec::new();

    write_command(&mut out, &command).unwrap();

    assert_eq!(out, encode_command(&command));
}

#[test]
fn test_write_command_failure_is_write_failed() {
    let err = write_command(&mut BrokenPipe, &Command::new("ping")).unwrap_err();

    match err {
        GatewayError::WriteFailed(source) => {
            assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
        }
        other => panic!("expected WriteFailed, got {:?}", other),
    }
}
