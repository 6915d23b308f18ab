//! Response Tests
//!
//! Tests for response projections, accessors and JSON rendering.

use transgate::protocol::{decode_response, Response, ResponseFormat};

// =============================================================================
// Projection Tests
// =============================================================================

#[test]
fn test_records_with_uneven_key_counts() {
    // Third row only carries `a`
    let response = decode_response(b"a:1\nb:x\na:2\nb:y\na:3\n").unwrap();
    let records = response.records();

    assert_eq!(records.len(), 3);
    assert_eq!(records[2].len(), 1);
    assert_eq!(records[2]["a"], "3");
}

#[test]
fn test_records_exclude_status_and_error() {
    let response =
        decode_response(b"status:TRANS_OK\nerror:none\nid:1\nstatus:TRANS_OK\nid:2\n").unwrap();
    let records = response.records();

    assert_eq!(records.len(), 2);
    for record in &records {
        assert!(!record.contains_key("status"));
        assert!(!record.contains_key("error"));
    }
}

#[test]
fn test_map_last_occurrence_wins() {
    let response = decode_response(b"k:first\nk:second\nk:third\n").unwrap();

    assert_eq!(response.map()["k"], "third");
    assert_eq!(response.get("k"), Some("third"));
    assert_eq!(response.records().len(), 3);
}

#[test]
fn test_fields_keep_wire_order() {
    let response = decode_response(b"status:TRANS_OK\nz:1\na:2\n").unwrap();
    let keys: Vec<&str> = response.fields().iter().map(|(k, _)| k.as_str()).collect();

    assert_eq!(keys, vec!["status", "z", "a"]);
}

// =============================================================================
// Accessor Tests
// =============================================================================

#[test]
fn test_status_helpers() {
    assert!(Response::ok().is_ok());
    assert!(!Response::with_status("TRANS_ERROR").is_ok());
    assert_eq!(Response::default().status(), "");
}

#[test]
fn test_set_status_and_error() {
    let mut response = decode_response(b"status:TRANS_ERROR_X\n").unwrap();
    response.set_status("TRANS_ERROR");
    response.set_error("replaced");

    assert_eq!(response.status(), "TRANS_ERROR");
    assert_eq!(response.error(), Some("replaced"));
}

#[test]
fn test_get_missing_key() {
    let response = Response::ok().field("a", "1");
    assert_eq!(response.get("b"), None);
    assert_eq!(response.get("status"), None);
}

#[test]
fn test_response_format_from_str() {
    assert_eq!("map".parse::<ResponseFormat>().unwrap(), ResponseFormat::Map);
    assert_eq!("slice".parse::<ResponseFormat>().unwrap(), ResponseFormat::Slice);
    assert!("table".parse::<ResponseFormat>().is_err());
}

// =============================================================================
// JSON Rendering Tests
// =============================================================================

#[test]
fn test_serialize_map_view() {
    let response = decode_response(b"status:TRANS_OK\na:1\na:2\n").unwrap();
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "status": "TRANS_OK",
            "response": { "a": "2" }
        })
    );
}

#[test]
fn test_serialize_slice_view_with_error() {
    let mut response = decode_response(b"status:TRANS_OK\na:1\na:2\n").unwrap();
    response.set_error("partial");
    let json = serde_json::to_value(response.view(ResponseFormat::Slice)).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "status": "TRANS_OK",
            "error": "partial",
            "response": [{ "a": "1" }, { "a": "2" }]
        })
    );
}
