//! Configuration for transgate
//!
//! Centralized configuration with sensible defaults. A `Config` is built once
//! and shared read-only by every call made through a gateway.

use std::env;
use std::time::Duration;

use crate::error::{GatewayError, Result};

/// Main configuration for a gateway instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Backend Address
    // -------------------------------------------------------------------------
    /// Backend host name or IP
    pub host: String,

    /// Backend TCP port
    pub port: u16,

    // -------------------------------------------------------------------------
    // Timing
    // -------------------------------------------------------------------------
    /// Per-attempt dial timeout
    pub connect_timeout: Duration,

    /// Overall deadline for sending a command and reading its response
    pub request_timeout: Duration,

    /// Delay before the single dial retry
    pub retry_after: Duration,

    // -------------------------------------------------------------------------
    // I/O
    // -------------------------------------------------------------------------
    /// Capacity of the buffered reader wrapping the connection
    pub read_buffer_size: usize,

    // -------------------------------------------------------------------------
    // Whitelist
    // -------------------------------------------------------------------------
    /// Commands that may be forwarded to the backend (insertion ordered, unique)
    pub allowed_commands: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 20005,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
            retry_after: Duration::from_secs(5),
            read_buffer_size: 4096,
            allowed_commands: Vec::new(),
        }
    }
}

impl Config {
    /// Environment variable names read by [`Config::from_env`]
    pub const ENV_HOST: &'static str = "TRANS_HOST";
    pub const ENV_PORT: &'static str = "TRANS_PORT";
    pub const ENV_CONNECT_TIMEOUT_MS: &'static str = "TRANS_CONNECT_TIMEOUT_MS";
    pub const ENV_TIMEOUT_MS: &'static str = "TRANS_TIMEOUT_MS";
    pub const ENV_RETRY_AFTER_MS: &'static str = "TRANS_RETRY_AFTER_MS";
    pub const ENV_BUFFER_SIZE: &'static str = "TRANS_BUFFER_SIZE";
    pub const ENV_ALLOWED_COMMANDS: &'static str = "TRANS_ALLOWED_COMMANDS";

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from `TRANS_*` environment variables.
    ///
    /// Missing variables keep their defaults; values that fail to parse are
    /// reported as configuration errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder();

        if let Some(host) = lookup(Self::ENV_HOST) {
            builder = builder.host(host);
        }
        if let Some(port) = lookup(Self::ENV_PORT) {
            builder = builder.port(parse_var(Self::ENV_PORT, &port)?);
        }
        if let Some(ms) = lookup(Self::ENV_CONNECT_TIMEOUT_MS) {
            builder = builder.connect_timeout_ms(parse_var(Self::ENV_CONNECT_TIMEOUT_MS, &ms)?);
        }
        if let Some(ms) = lookup(Self::ENV_TIMEOUT_MS) {
            builder = builder.request_timeout_ms(parse_var(Self::ENV_TIMEOUT_MS, &ms)?);
        }
        if let Some(ms) = lookup(Self::ENV_RETRY_AFTER_MS) {
            builder = builder.retry_after_ms(parse_var(Self::ENV_RETRY_AFTER_MS, &ms)?);
        }
        if let Some(size) = lookup(Self::ENV_BUFFER_SIZE) {
            builder = builder.read_buffer_size(parse_var(Self::ENV_BUFFER_SIZE, &size)?);
        }
        if let Some(commands) = lookup(Self::ENV_ALLOWED_COMMANDS) {
            builder = builder.allowed_commands_str(&commands);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values no connection could work with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(GatewayError::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(GatewayError::Config("port must not be zero".to_string()));
        }
        if self.read_buffer_size == 0 {
            return Err(GatewayError::Config(
                "read buffer size must not be zero".to_string(),
            ));
        }
        for command in &self.allowed_commands {
            if command.is_empty() || command.contains(':') || command.contains('\n') {
                return Err(GatewayError::Config(format!(
                    "invalid allowed command {:?}",
                    command
                )));
            }
        }
        Ok(())
    }

    /// Backend address as `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether a command name is on the whitelist
    pub fn is_allowed(&self, command: &str) -> bool {
        self.allowed_commands.iter().any(|allowed| allowed == command)
    }

    /// Whitelist rendered for error messages (`a, b, c`)
    pub fn allowed_commands_display(&self) -> String {
        self.allowed_commands.join(", ")
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| GatewayError::Config(format!("{} has invalid value {:?}", name, raw)))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the backend host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the backend port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the per-attempt dial timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the per-attempt dial timeout (in milliseconds)
    pub fn connect_timeout_ms(self, ms: u64) -> Self {
        self.connect_timeout(Duration::from_millis(ms))
    }

    /// Set the overall request deadline
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the overall request deadline (in milliseconds)
    pub fn request_timeout_ms(self, ms: u64) -> Self {
        self.request_timeout(Duration::from_millis(ms))
    }

    /// Set the delay before the dial retry
    pub fn retry_after(mut self, delay: Duration) -> Self {
        self.config.retry_after = delay;
        self
    }

    /// Set the delay before the dial retry (in milliseconds)
    pub fn retry_after_ms(self, ms: u64) -> Self {
        self.retry_after(Duration::from_millis(ms))
    }

    /// Set the read buffer capacity (in bytes)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Add one command to the whitelist
    pub fn allow_command(mut self, command: impl Into<String>) -> Self {
        let command = command.into();
        if !self.config.allowed_commands.contains(&command) {
            self.config.allowed_commands.push(command);
        }
        self
    }

    /// Replace the whitelist
    pub fn allowed_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_commands.clear();
        commands
            .into_iter()
            .fold(self, |builder, command| builder.allow_command(command))
    }

    /// Replace the whitelist from its pipe-separated form (`ping|echo|get`)
    pub fn allowed_commands_str(self, commands: &str) -> Self {
        self.allowed_commands(
            commands
                .split('|')
                .map(str::trim)
                .filter(|command| !command.is_empty()),
        )
    }

    pub fn build(self) -> Config {
        self.config
    }
}
