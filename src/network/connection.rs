//! Backend Connection
//!
//! Owns one TCP connection to the backend for the duration of a single call.

use std::io::{BufRead, BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::BytesMut;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::protocol::{decode_response, strip_terminator, write_command, Command, Response, GREETING};

/// Shared handle that shuts a connection down at most once
///
/// Shutting the socket down from another thread is what unblocks a read or
/// write stuck inside the kernel.
#[derive(Clone)]
pub struct CloseHandle {
    stream: Arc<Mutex<Option<TcpStream>>>,
}

impl CloseHandle {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream: Arc::new(Mutex::new(Some(stream))),
        }
    }

    /// Shut the connection down. Returns true only for the call that did it.
    pub fn close(&self) -> bool {
        match self.stream.lock().take() {
            Some(stream) => {
                if let Err(e) = stream.shutdown(std::net::Shutdown::Both) {
                    // Already reset by the peer; the socket is gone either way
                    tracing::trace!("Shutdown after peer close: {}", e);
                }
                true
            }
            None => false,
        }
    }

    /// Whether the connection has been shut down
    pub fn is_closed(&self) -> bool {
        self.stream.lock().is_none()
    }
}

/// A single connection to the backend
pub struct Connection {
    /// TCP stream reader (buffered, sized by config)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered so a request leaves in one write)
    writer: BufWriter<TcpStream>,

    /// Close-once guard shared with the deadline side
    closer: CloseHandle,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Dial the backend, retrying once after `retry_after` if the first attempt fails
    pub fn dial(config: &Config) -> Result<Self> {
        let addr = config.addr();
        let delays = [config.retry_after];

        let mut attempts = 1;
        let mut last_err = match Self::try_dial(&addr, config.connect_timeout) {
            Ok(stream) => return Self::new(stream, config),
            Err(e) => e,
        };

        for delay in delays {
            tracing::warn!(
                "Dial to {} failed ({}), retrying in {:?}",
                addr, last_err, delay
            );
            thread::sleep(delay);

            attempts += 1;
            match Self::try_dial(&addr, config.connect_timeout) {
                Ok(stream) => return Self::new(stream, config),
                Err(e) => last_err = e,
            }
        }

        Err(GatewayError::DialFailed {
            addr,
            attempts,
            source: last_err,
        })
    }

    /// One dial attempt, trying every resolved address in turn
    fn try_dial(addr: &str, timeout: Duration) -> std::io::Result<TcpStream> {
        let resolved: Vec<SocketAddr> = addr.to_socket_addrs()?.collect();

        let mut last_err = std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("{} did not resolve to any address", addr),
        );
        for socket_addr in resolved {
            match TcpStream::connect_timeout(&socket_addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    /// Wrap an established stream
    pub fn new(stream: TcpStream, config: &Config) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Requests are small and written once
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::with_capacity(config.read_buffer_size, read_stream),
            writer: BufWriter::new(write_stream),
            closer: CloseHandle::new(stream),
            peer_addr,
        })
    }

    /// Handle that can shut this connection down from another thread
    pub fn close_handle(&self) -> CloseHandle {
        self.closer.clone()
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Greeting, send, receive: the whole exchange for one command
    pub fn exchange(&mut self, command: &Command) -> Result<Response> {
        self.read_greeting()?;
        self.send(command)?;
        self.read_response()
    }

    /// Read one line and require it to be the backend greeting
    pub fn read_greeting(&mut self) -> Result<()> {
        let mut line = Vec::with_capacity(GREETING.len());
        self.reader.read_until(b'\n', &mut line)?;

        if line != GREETING {
            return Err(GatewayError::GreetingMismatch(
                String::from_utf8_lossy(&line).into_owned(),
            ));
        }

        tracing::trace!("Greeting received from {}", self.peer_addr);
        Ok(())
    }

    /// Write the encoded command in full
    pub fn send(&mut self, command: &Command) -> Result<()> {
        write_command(&mut self.writer, command)?;
        tracing::trace!("Sent {:?} to {}", command.name, self.peer_addr);
        Ok(())
    }

    /// Read until the backend closes, then verify the terminator and decode
    pub fn read_response(&mut self) -> Result<Response> {
        let mut buf = BytesMut::with_capacity(self.reader.capacity());
        let mut line = Vec::new();

        loop {
            line.clear();
            let read = self.reader.read_until(b'\n', &mut line)?;
            if read == 0 {
                break;
            }
            buf.extend_from_slice(&line);
        }

        tracing::trace!("Received {} bytes from {}", buf.len(), self.peer_addr);

        let body = strip_terminator(&buf)?;
        decode_response(body)
    }

    /// Shut the connection down (no-op if already closed)
    pub fn close(&self) -> bool {
        self.closer.close()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.closer.close();
    }
}
