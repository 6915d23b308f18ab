//! Network Module
//!
//! TCP client for the backend, plus a simulator of the backend itself.
//!
//! ## Architecture
//! - One connection per command, never reused
//! - Exchange runs on a scoped worker thread raced against a deadline
//! - Simulator: non-blocking accept loop, one thread per connection

mod connection;
mod transport;
mod server;

pub use connection::{CloseHandle, Connection};
pub use transport::Transport;
pub use server::{echo_handler, Handler, Server, ServerHandle};
