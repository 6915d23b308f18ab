//! Gateway Module
//!
//! Public entry point for sending commands to the backend.
//!
//! ## Responsibilities
//! - Enforce the command whitelist before any network activity
//! - Run the command through the transport
//! - Normalize backend-reported failures into typed errors

use std::sync::Arc;

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::interpreter;
use crate::network::Transport;
use crate::protocol::{Command, Parameter, Response};

/// Anything that can execute a command and hand back a response
pub trait CommandExecutor {
    fn execute(&self, command: &Command) -> Result<Response>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for Arc<T> {
    fn execute(&self, command: &Command) -> Result<Response> {
        (**self).execute(command)
    }
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn execute(&self, command: &Command) -> Result<Response> {
        (**self).execute(command)
    }
}

/// The command gateway
///
/// Cheap to clone and safe to share: every call owns its own connection and
/// worker, and the configuration is read-only.
#[derive(Clone)]
pub struct Gateway {
    config: Arc<Config>,
    transport: Transport,
}

impl Gateway {
    /// Create a gateway after validating the configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        Ok(Self {
            transport: Transport::new(Arc::clone(&config)),
            config,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Send `name` with its ordered parameters
    pub fn send(&self, name: &str, params: Vec<Parameter>) -> Result<Response> {
        self.send_command(&Command {
            name: name.to_string(),
            params,
        })
    }

    /// Whitelist check, exchange, status normalization
    pub fn send_command(&self, command: &Command) -> Result<Response> {
        if !self.config.is_allowed(&command.name) {
            let err = GatewayError::WhitelistRejected {
                command: command.name.clone(),
                allowed: self.config.allowed_commands_display(),
            };
            tracing::debug!("{}", err);
            return Err(err);
        }
        command.validate()?;

        let response = self.transport.send(command).map_err(|e| {
            tracing::debug!("Error sending command {:?}: {}", command.name, e);
            e
        })?;

        interpreter::interpret(response)
    }
}

impl CommandExecutor for Gateway {
    fn execute(&self, command: &Command) -> Result<Response> {
        self.send_command(command)
    }
}
