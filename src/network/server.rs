//! Backend Simulator
//!
//! A small TCP server speaking the backend's line protocol. Each accepted
//! connection gets the greeting, one request, one response, then a close.
//! Used for local runs of the gateway and by the test suite.

use std::io::{BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::Result;
use crate::protocol::{
    decode_command, read_request, write_response, Command, Response, GREETING, STATUS_ERROR,
    STATUS_NO_SUCH_COMMAND,
};

/// Produces the response for one decoded request
pub type Handler = dyn Fn(&Command) -> Response + Send + Sync + 'static;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// TCP server simulating the backend
pub struct Server {
    listener: TcpListener,
    handler: Arc<Handler>,
    shutdown: Arc<AtomicBool>,
    accepted: Arc<AtomicUsize>,
}

impl Server {
    /// Bind a server with the given request handler
    pub fn bind<A, F>(addr: A, handler: F) -> Result<Self>
    where
        A: ToSocketAddrs,
        F: Fn(&Command) -> Response + Send + Sync + 'static,
    {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            listener,
            handler: Arc::new(handler),
            shutdown: Arc::new(AtomicBool::new(false)),
            accepted: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Number of connections accepted so far
    pub fn connections_accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Start the server (blocking until [`Server::shutdown`])
    pub fn run(&self) -> Result<()> {
        tracing::info!("Backend simulator listening on {}", self.local_addr()?);

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    self.accepted.fetch_add(1, Ordering::SeqCst);
                    tracing::debug!("Accepted connection from {}", peer);

                    let handler = Arc::clone(&self.handler);
                    thread::spawn(move || {
                        if let Err(e) = handle_connection(stream, handler.as_ref()) {
                            tracing::debug!("Connection from {} ended with error: {}", peer, e);
                        }
                    });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Backend simulator stopped");
        Ok(())
    }

    /// Signal the server to stop accepting connections
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Run the server on a background thread
    pub fn spawn(self) -> Result<ServerHandle> {
        let addr = self.local_addr()?;
        let shutdown = Arc::clone(&self.shutdown);
        let accepted = Arc::clone(&self.accepted);

        let join = thread::Builder::new()
            .name("transgate-backend".to_string())
            .spawn(move || self.run())?;

        Ok(ServerHandle {
            addr,
            shutdown,
            accepted,
            join: Some(join),
        })
    }
}

/// Handle to a server running on a background thread. Stops it on drop.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    accepted: Arc<AtomicUsize>,
    join: Option<JoinHandle<Result<()>>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn connections_accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Stop the accept loop and wait for it to exit
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            match join.join() {
                Ok(Err(e)) => tracing::warn!("Backend simulator failed: {}", e),
                Err(_) => tracing::warn!("Backend simulator thread panicked"),
                Ok(Ok(())) => {}
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Serve exactly one request on an accepted connection
fn handle_connection(stream: TcpStream, handler: &Handler) -> Result<()> {
    stream.set_nonblocking(false)?;

    let mut writer = BufWriter::new(stream.try_clone()?);
    let mut reader = BufReader::new(stream.try_clone()?);

    writer.write_all(GREETING)?;
    writer.flush()?;

    let response = match read_request(&mut reader).and_then(|raw| decode_command(&raw)) {
        Ok(command) => {
            tracing::trace!("Request {:?} with {} params", command.name, command.params.len());
            handler(&command)
        }
        Err(e) => {
            tracing::debug!("Bad request: {}", e);
            Response::with_status(STATUS_ERROR).field("error", e.to_string())
        }
    };

    write_response(&mut writer, &response)?;
    stream.shutdown(std::net::Shutdown::Both)?;
    Ok(())
}

// =============================================================================
// Stock Handlers
// =============================================================================

/// Answers `ping` with `TRANS_OK` and echoes the parameters of `echo`;
/// everything else gets the backend's "no such command" status
pub fn echo_handler(command: &Command) -> Response {
    match command.name.as_str() {
        "ping" => Response::ok(),
        "echo" => command
            .params
            .iter()
            .fold(Response::ok(), |response, param| {
                response.field(param.key.clone(), param.value.to_wire())
            }),
        _ => Response::with_status(STATUS_NO_SUCH_COMMAND),
    }
}
