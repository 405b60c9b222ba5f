//! Error types for conversation turns.
//!
//! Every variant except [`ChatError::MalformedEvent`] ends the turn: the
//! user-visible error string is set, the status becomes `error`, and the
//! payment status is cleared. Malformed stream events are skipped by the
//! decoder and never reach the caller.

use paychat_types::TokenAmount;
use paychat_x402::X402Error;
use thiserror::Error;

/// Result type for conversation operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Errors that can occur during a conversation turn.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No wallet session, or the session has no signer.
    #[error("Wallet not connected or signer not available")]
    WalletUnavailable,

    /// The account balance is below the price of a message.
    #[error(
        "Insufficient {symbol} balance. Required: ${}, Available: ${}. Please transfer {symbol} to your local wallet.",
        required.to_fixed(2),
        available.to_fixed(2)
    )]
    InsufficientFunds {
        /// Token symbol
        symbol: String,
        /// Price of one message
        required: TokenAmount,
        /// Balance observed
        available: TokenAmount,
    },

    /// The balance oracle query itself failed.
    #[error("Failed to check {symbol} balance. Please ensure your local wallet has sufficient funds.")]
    BalanceProbeFailed {
        /// Token symbol
        symbol: String,
        /// Failure reported by the oracle
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP error! status: {status}, message: {body}")]
    HttpError {
        /// HTTP status code
        status: u16,
        /// Response body text
        body: String,
    },

    /// The receipt reported that the payment did not settle.
    #[error("payment declined{}", reason.as_deref().map(|r| format!(": {}", r)).unwrap_or_default())]
    PaymentDeclined {
        /// Reason given by the facilitator
        reason: Option<String>,
    },

    /// The payment receipt header could not be decoded.
    #[error("malformed payment receipt: {reason}")]
    MalformedReceipt {
        /// What went wrong
        reason: String,
    },

    /// Reading the response body failed; the rest of the stream is lost.
    #[error("{reason}")]
    StreamReadFailure {
        /// Underlying failure text
        reason: String,
    },

    /// A stream line carried a payload that is not a valid event.
    #[error("malformed stream event: {reason}")]
    MalformedEvent {
        /// Parser error
        reason: String,
    },

    /// A turn is already in flight.
    #[error("a message is already being sent")]
    TurnInFlight,

    /// The turn was abandoned before it finished.
    #[error("Request was cancelled")]
    TurnCancelled,

    /// Persisted key material could not be restored.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The paid exchange failed before a response arrived.
    #[error("{0}")]
    Payment(X402Error),
}

impl ChatError {
    /// Create a StreamReadFailure error.
    pub fn stream_read(reason: impl Into<String>) -> Self {
        Self::StreamReadFailure {
            reason: reason.into(),
        }
    }

    /// Create a MalformedEvent error.
    pub fn malformed_event(reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            reason: reason.into(),
        }
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error ends the current turn.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedEvent { .. } | Self::PaymentDeclined { .. })
    }

    /// Whether the turn failed before any request was sent.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::WalletUnavailable
                | Self::InsufficientFunds { .. }
                | Self::BalanceProbeFailed { .. }
                | Self::TurnInFlight
        )
    }
}

impl From<X402Error> for ChatError {
    fn from(e: X402Error) -> Self {
        match e {
            X402Error::Stream(reason) => Self::StreamReadFailure { reason },
            X402Error::MalformedReceipt { reason } => Self::MalformedReceipt { reason },
            other => Self::Payment(other),
        }
    }
}
