//! Error types for the proposal submitter

use thiserror::Error;

/// Main error type for the submitter
#[derive(Error, Debug)]
pub enum SubmitterError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error for {endpoint}: {message}")]
    Connection { endpoint: String, message: String },

    #[error("Identity error: {0}")]
    Identity(String),

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Query error for tx {tx_hash}: {message}")]
    Query { tx_hash: String, message: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl SubmitterError {
    /// Identity failures abort the process before anything is signed
    pub fn is_fatal(&self) -> bool {
        matches!(self, SubmitterError::Identity(_))
    }

    /// Name of the flow stage the error belongs to
    pub fn stage(&self) -> &'static str {
        match self {
            SubmitterError::Configuration(_) => "configuration",
            SubmitterError::Connection { .. } => "connection",
            SubmitterError::Identity(_) => "identity",
            SubmitterError::InvalidProposal(_) => "proposal",
            SubmitterError::Submission(_) => "submission",
            SubmitterError::Query { .. } => "query",
            SubmitterError::Rpc { .. } => "transport",
        }
    }

    pub(crate) fn query(tx_hash: &str, message: impl Into<String>) -> Self {
        SubmitterError::Query {
            tx_hash: tx_hash.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for submitter operations
pub type SubmitterResult<T> = Result<T, SubmitterError>;
