//! Error types for the office simulation
//!
//! The simulation itself never fails: bad events and contention degrade to
//! no-ops. Errors only exist at the edges, for configuration and for parsing
//! raw ingestion payloads.

use thiserror::Error;

/// Top-level office error
#[derive(Debug, Error)]
pub enum OfficeError {
    /// Configuration rejected by validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Raw event payload could not be parsed
    #[error("Ingest error: {0}")]
    Ingest(#[from] serde_json::Error),

    /// Agent id not on the roster
    #[error("Agent '{0}' not found")]
    UnknownAgent(String),
}

/// Result type using OfficeError
pub type Result<T> = std::result::Result<T, OfficeError>;
