//! Error types for x402 client plumbing.

use thiserror::Error;

/// Result type for x402 operations.
pub type X402Result<T> = Result<T, X402Error>;

/// Errors that can occur while performing a paid HTTP exchange.
#[derive(Debug, Error)]
pub enum X402Error {
    /// The `X-PAYMENT-RESPONSE` header was present but could not be decoded.
    #[error("malformed payment receipt: {reason}")]
    MalformedReceipt {
        /// What went wrong
        reason: String,
    },

    /// A 402 response carried a body that is not a payment requirement.
    #[error("malformed payment requirements: {reason}")]
    MalformedRequirements {
        /// What went wrong
        reason: String,
    },

    /// The server offered no payment method we can satisfy.
    #[error("no acceptable payment method offered")]
    NoAcceptablePayment,

    /// The payment signer could not produce a payment header.
    #[error("payment signer failed: {0}")]
    Signer(String),

    /// The request URL could not be built.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// Transport-level failure sending the request.
    #[error("network error: {0}")]
    Network(String),

    /// Failure while reading the response body.
    #[error("stream read failed: {0}")]
    Stream(String),
}

impl X402Error {
    /// Create a MalformedReceipt error.
    pub fn malformed_receipt(reason: impl Into<String>) -> Self {
        Self::MalformedReceipt {
            reason: reason.into(),
        }
    }

    /// Create a MalformedRequirements error.
    pub fn malformed_requirements(reason: impl Into<String>) -> Self {
        Self::MalformedRequirements {
            reason: reason.into(),
        }
    }

    /// Create a Signer error.
    pub fn signer(reason: impl Into<String>) -> Self {
        Self::Signer(reason.into())
    }

    /// Returns a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::MalformedReceipt { .. } => "The server returned an unreadable payment receipt",
            Self::MalformedRequirements { .. } => {
                "The server's 402 response does not follow the x402 format"
            }
            Self::NoAcceptablePayment => "Check that the server accepts the configured network",
            Self::Signer(_) => "Check the wallet configuration and payment header",
            Self::InvalidUrl(_) => "Check server.base_url in the configuration",
            Self::Network(_) => "Check network connectivity to the server",
            Self::Stream(_) => "The connection dropped mid-response; resend the message",
        }
    }

    /// Returns true if this error is transient and the operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Stream(_))
    }
}

impl From<reqwest::Error> for X402Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_body() || e.is_decode() {
            Self::Stream(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}
