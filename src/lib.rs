//! # transgate
//!
//! A gateway client for a legacy line-oriented TCP command service:
//! - Text line protocol with length-framed blob fields
//! - One connection per command, dialed with a single retry
//! - Greeting check, then a deadline-bounded send/receive
//! - Single-record and multi-record response projections
//! - Backend status normalization into typed errors
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 HTTP/JSON handler (external)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                Interactor (bad input, logging)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │          Gateway (whitelist, status interpretation)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Transport  │─────────▶│    Codec    │
//!   │ (deadline)  │          │ (encode/    │
//!   └──────┬──────┘          │  decode)    │
//!          │                 └─────────────┘
//!          ▼
//!   ┌─────────────┐
//!   │   Backend   │
//!   │ (TCP, text) │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod interpreter;
pub mod gateway;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{GatewayError, Result};
pub use config::Config;
pub use gateway::{CommandExecutor, Gateway};
pub use interpreter::Interactor;
pub use protocol::{Command, Parameter, ParamValue, Response, ResponseFormat};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of transgate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
