//! Error types for a transfer attempt
//!
//! Chain facade calls use `eyre` for ergonomic errors with context. Everything
//! that can end a transfer attempt is folded into [`TransferError`] at the
//! orchestrator boundary, whose `Display` text is what the observer reads.

pub use eyre::{eyre, Context, Report, Result};

/// Failure kinds of a single transfer attempt
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// One or more mandatory fields were absent from both the request and the defaults
    #[error("Missing required configuration: {}", .0.join(", "))]
    ConfigurationMissing(Vec<&'static str>),

    /// Token or recipient address could not be parsed
    #[error("Invalid {field} address '{value}'")]
    AddressInvalid { field: &'static str, value: String },

    /// Configured endpoint could not be reached
    #[error("Failed to connect to RPC endpoint: {0}")]
    ConnectionFailure(String),

    /// Signing credential is malformed
    #[error("Invalid private key: {0}")]
    CredentialInvalid(String),

    /// Amount or gas price cannot be expressed in base units
    #[error("{0}")]
    ConversionFailure(String),

    /// Gas estimation failed; only ever surfaced as a warning
    #[error("Gas estimation failed: {0}")]
    EstimationFailure(String),

    /// Signed transfer was rejected by the network
    #[error("Failed to broadcast transfer: {0}")]
    BroadcastFailure(String),

    /// Unexpected error while polling for the outcome
    #[error("Monitoring failed: {0}")]
    MonitoringFailure(String),
}

impl TransferError {
    /// Build a monitoring failure from an eyre report, keeping the full context chain
    pub fn monitoring(err: &Report) -> Self {
        Self::MonitoringFailure(format!("{err:#}"))
    }
}
