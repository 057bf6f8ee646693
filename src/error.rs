//! Error types for refcmd.
//!
//! Only the reliable path and configuration loading produce errors. Frame
//! command encoding and dispatch are silent by contract: drops are counted in
//! [`DropCounters`](crate::frame::DropCounters) and dispatch outcomes are
//! summarized in a [`RunReport`](crate::frame::RunReport).

use thiserror::Error;

/// Main error type for all refcmd operations.
#[derive(Debug, Error)]
pub enum CmdQueueError {
    /// I/O error while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error (configuration only).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed reliable record (truncated, wrong length, bad string).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Reliable command id outside the known range.
    #[error("Unknown reliable command id: {0}")]
    UnknownCommand(u32),

    /// The reading side of the reliable pipe is gone.
    #[error("Reliable pipe closed")]
    PipeClosed,

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The reliable worker task panicked or was cancelled.
    #[error("Reliable worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Result type alias using CmdQueueError.
pub type Result<T> = std::result::Result<T, CmdQueueError>;
