//! Application layer errors

use std::time::Duration;
use thiserror::Error;

/// Session-level errors. Every variant is fatal to the phase that raised it.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Failed to connect to the session API: {0}")]
    ConnectFailed(String),

    #[error("Session API answered with HTTP {code}")]
    UnexpectedStatus { code: u16 },

    #[error("Malformed session response: {0}")]
    MalformedResponse(String),

    #[error("Session rejected: {reason}")]
    SessionRejected { reason: String },

    #[error("Failed to open streaming connection: {0}")]
    UpgradeFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("No heartbeat acknowledgment within {0:?}")]
    AckTimeout(Duration),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Transport-level errors raised by frame sinks and streams
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("frame codec error: {0}")]
    Codec(String),
}

/// Command registration and execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Reply failed: {0}")]
    Reply(#[from] BotError),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
