//! Error types for the settlement module.

use paychat_types::AmountError;
use thiserror::Error;

/// Result type alias for settlement operations.
pub type SettleResult<T> = Result<T, SettleError>;

/// Errors that can occur while querying balances.
#[derive(Debug, Error)]
pub enum SettleError {
    /// The account holds no token account for the configured mint.
    #[error("no token account found for {0}")]
    AccountNotFound(String),

    /// The RPC node answered with a JSON-RPC error.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message from the node
        message: String,
    },

    /// The RPC response did not have the expected shape.
    #[error("malformed RPC response: {0}")]
    MalformedResponse(String),

    /// Network error (retryable).
    #[error("network error: {0}")]
    Network(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Amount arithmetic or parsing failed.
    #[error(transparent)]
    Amount(#[from] AmountError),
}

impl SettleError {
    /// Create a new AccountNotFound error.
    pub fn account_not_found(account: impl Into<String>) -> Self {
        Self::AccountNotFound(account.into())
    }

    /// Create a new MalformedResponse error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a new Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true if the operation may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for SettleError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}
