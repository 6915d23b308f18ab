//! Tests for the backend simulator
//!
//! Drives the simulator with raw sockets to check it speaks the protocol.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use transgate::network::{echo_handler, Server};
use transgate::protocol::{decode_response, encode_command, strip_terminator, Response};
use transgate::Command;

// =============================================================================
// Helper Functions
// =============================================================================

/// Send raw request bytes and return everything the server wrote
fn raw_exchange(addr: std::net::SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream.write_all(request).unwrap();
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).unwrap();
    reply
}

// =============================================================================
// Protocol Tests
// =============================================================================

#[test]
fn test_server_greets_and_answers() {
    let server = Server::bind("127.0.0.1:0", echo_handler).unwrap().spawn().unwrap();

    let reply = raw_exchange(server.local_addr(), b"cmd:ping\ncommit:1\nend\n");

    assert_eq!(reply, b"220 Welcome.\nstatus:TRANS_OK\nend\n");
    assert_eq!(server.connections_accepted(), 1);
}

#[test]
fn test_server_echoes_params_and_blobs() {
    let server = Server::bind("127.0.0.1:0", echo_handler).unwrap().spawn().unwrap();
    let cmd = Command::new("echo").param("a", 1).blob("body", "x\nend\ny");

    let reply = raw_exchange(server.local_addr(), &encode_command(&cmd));
    let body = reply.strip_prefix(b"220 Welcome.\n".as_slice()).unwrap();
    let response = decode_response(strip_terminator(body).unwrap()).unwrap();

    assert!(response.is_ok());
    assert_eq!(response.get("a"), Some("1"));
    assert_eq!(response.get("body"), Some("x\nend\ny"));
}

#[test]
fn test_server_reports_unknown_command() {
    let server = Server::bind("127.0.0.1:0", echo_handler).unwrap().spawn().unwrap();

    let reply = raw_exchange(server.local_addr(), b"cmd:nope\ncommit:1\nend\n");

    assert_eq!(
        reply,
        b"220 Welcome.\nstatus:TRANS_ERROR_NO_SUCH_COMMAND:Err no such command\nend\n"
    );
}

#[test]
fn test_server_rejects_malformed_request() {
    let server = Server::bind("127.0.0.1:0", echo_handler).unwrap().spawn().unwrap();

    let reply = raw_exchange(server.local_addr(), b"garbage\nend\n");
    let body = reply.strip_prefix(b"220 Welcome.\n".as_slice()).unwrap();
    let response = decode_response(strip_terminator(body).unwrap()).unwrap();

    assert_eq!(response.status(), "TRANS_ERROR");
    assert!(response.error().is_some());
}

#[test]
fn test_server_custom_handler_sees_decoded_command() {
    let server = Server::bind("127.0.0.1:0", |command: &Command| {
        Response::ok()
            .field("name", command.name.clone())
            .field("params", command.params.len().to_string())
    })
    .unwrap()
    .spawn()
    .unwrap();

    let cmd = Command::new("count").param("x", "1").param("y", "2");
    let reply = raw_exchange(server.local_addr(), &encode_command(&cmd));

    assert_eq!(
        reply,
        b"220 Welcome.\nstatus:TRANS_OK\nname:count\nparams:2\nend\n"
    );
}

#[test]
fn test_server_counts_connections_and_stops() {
    let mut server = Server::bind("127.0.0.1:0", echo_handler).unwrap().spawn().unwrap();
    let addr = server.local_addr();

    for _ in 0..3 {
        raw_exchange(addr, b"cmd:ping\ncommit:1\nend\n");
    }
    assert_eq!(server.connections_accepted(), 3);

    server.shutdown();
    assert_eq!(server.connections_accepted(), 3);
}
