//! Response Interpreter
//!
//! Classifies backend status strings and decides what is surfaced as an error.
//! Also hosts the use-case layer ([`Interactor`]) that sits between the
//! HTTP-facing handler and the gateway.

use crate::error::{GatewayError, Result};
use crate::gateway::CommandExecutor;
use crate::protocol::{Command, Response, STATUS_DATABASE_ERROR, STATUS_ERROR, STATUS_NO_SUCH_COMMAND};

/// Message placed in the `error` field when the backend does not know a command
pub const COMMAND_NOT_FOUND_MESSAGE: &str = "command does not exist";

/// Separator between the database status prefix and its message
const DATABASE_ERROR_SEPARATOR: char = ':';

/// Outcome class of a backend status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusClass {
    /// Backend does not know the command
    CommandNotFound,

    /// Backend database failure, with the embedded message
    Database(String),

    /// Anything else, returned to the caller untouched
    Passthrough,
}

/// Classify a raw status string
pub fn classify_status(status: &str) -> StatusClass {
    if status == STATUS_NO_SUCH_COMMAND {
        return StatusClass::CommandNotFound;
    }

    // Either the bare status or the status, a separator and the message
    match status.strip_prefix(STATUS_DATABASE_ERROR) {
        Some("") => StatusClass::Database(String::new()),
        Some(rest) => match rest.strip_prefix(DATABASE_ERROR_SEPARATOR) {
            Some(message) => StatusClass::Database(message.to_string()),
            None => StatusClass::Passthrough,
        },
        None => StatusClass::Passthrough,
    }
}

/// Normalize a decoded response according to its status
///
/// Backend-reported failures come back as errors carrying the rewritten
/// response; everything else is returned as-is.
pub fn interpret(mut response: Response) -> Result<Response> {
    match classify_status(response.status()) {
        StatusClass::CommandNotFound => {
            response.set_status(STATUS_ERROR);
            response.set_error(COMMAND_NOT_FOUND_MESSAGE);
            Err(GatewayError::CommandNotFound {
                response: Box::new(response),
            })
        }
        StatusClass::Database(message) => {
            // A bare status with no message keeps whatever error the backend sent
            let message = match (message.is_empty(), response.error()) {
                (true, Some(existing)) => existing.to_string(),
                _ => message,
            };
            response.set_status(STATUS_DATABASE_ERROR);
            response.set_error(message.clone());
            Err(GatewayError::DatabaseError {
                message,
                response: Box::new(response),
            })
        }
        StatusClass::Passthrough => Ok(response),
    }
}

/// Use case: execute a command and report what went wrong
pub struct Interactor<E> {
    executor: E,
}

impl<E: CommandExecutor> Interactor<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Get the underlying executor
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Execute the command.
    ///
    /// An empty command name is bad input and never reaches the network.
    /// Transport failures are logged at debug level, backend-reported ones as
    /// repository errors.
    pub fn execute_command(&self, command: &Command) -> Result<Response> {
        if command.name.is_empty() {
            tracing::debug!("Invalid command. Input: {:?}", command);
            return Err(GatewayError::BadInput(format!(
                "invalid command {:?}",
                command
            )));
        }

        match self.executor.execute(command) {
            Ok(response) => Ok(response),
            Err(e) if e.is_backend_reported() => {
                tracing::error!("Error executing command {:?}: {}", command.name, e);
                Err(e)
            }
            Err(e) => {
                tracing::debug!("Command {:?} failed: {}", command.name, e);
                Err(e)
            }
        }
    }
}
