//! Transport
//!
//! Runs one command against the backend under an overall deadline.
//!
//! ## Per-call lifecycle
//! ```text
//! Idle → Connecting → AwaitingGreeting → Sending → AwaitingResponse → Done | Failed
//! ```
//!
//! The exchange runs on one scoped worker thread that reports on a single-slot
//! channel. The caller races that channel against the deadline. When the
//! deadline wins, the connection is shut down to unblock the worker, and the
//! worker's (discarded) outcome is still awaited. The scope joins the worker
//! before `send` returns, so nothing outlives the call.

use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, select};

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::protocol::{Command, Response};
use super::connection::Connection;

/// Sends commands to the backend, one connection per call
#[derive(Clone)]
pub struct Transport {
    config: Arc<Config>,
}

impl Transport {
    /// Create a transport sharing the given configuration
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Dial, exchange and close. The connection is closed on every path.
    pub fn send(&self, command: &Command) -> Result<Response> {
        let connection = Connection::dial(&self.config)?;
        tracing::debug!(
            "Connected to {} for {:?}",
            connection.peer_addr(),
            command.name
        );

        let closer = connection.close_handle();
        let result = self.exchange_with_deadline(connection, command);
        closer.close();
        result
    }

    /// Run the exchange on a worker and race it against the request deadline
    fn exchange_with_deadline(
        &self,
        mut connection: Connection,
        command: &Command,
    ) -> Result<Response> {
        let timeout = self.config.request_timeout;
        let closer = connection.close_handle();
        let (done_tx, done_rx) = channel::bounded::<Result<Response>>(1);

        thread::scope(|scope| -> Result<Response> {
            thread::Builder::new()
                .name("transgate-exchange".to_string())
                .spawn_scoped(scope, move || {
                    let result = connection.exchange(command);
                    drop(connection);
                    // Receiver outlives the worker inside this scope
                    let _ = done_tx.send(result);
                })?;

            let deadline = channel::after(timeout);

            select! {
                recv(done_rx) -> outcome => outcome.unwrap_or_else(|_| Err(worker_vanished())),
                recv(deadline) -> _ => {
                    if closer.close() {
                        tracing::debug!("Deadline of {:?} hit for {:?}, connection closed", timeout, command.name);
                    }
                    match done_rx.recv() {
                        Ok(Ok(_)) => tracing::trace!("Late response for {:?} discarded", command.name),
                        Ok(Err(e)) => tracing::trace!("Worker for {:?} unblocked with: {}", command.name, e),
                        Err(_) => tracing::trace!("Worker for {:?} exited without reporting", command.name),
                    }
                    Err(GatewayError::Timeout(timeout))
                }
            }
        })
    }
}

fn worker_vanished() -> GatewayError {
    GatewayError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "exchange worker exited without reporting",
    ))
}
