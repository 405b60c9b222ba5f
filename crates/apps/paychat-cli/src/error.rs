//! CLI error types.

use paychat_chat::ChatError;
use paychat_settle::SettleError;
use paychat_types::AmountError;
use paychat_x402::X402Error;
use thiserror::Error;

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error enum wrapping all crate errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Conversation error.
    #[error("{0}")]
    Chat(#[from] ChatError),

    /// Balance lookup error.
    #[error("{0}")]
    Settlement(#[from] SettleError),

    /// Paid request error.
    #[error("{0}")]
    Payment(#[from] X402Error),

    /// Invalid amount in configuration or arguments.
    #[error("Invalid amount: {0}")]
    Amount(#[from] AmountError),

    /// IO error.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// User-facing error with actionable message.
    #[error("{0}")]
    User(String),

    /// No wallet account configured.
    #[error("Wallet not configured. Run 'paychat init --account <ADDRESS>' first.")]
    WalletNotConfigured,

    /// Configuration file already exists.
    #[error("Configuration already exists at {0}. Use --force to overwrite.")]
    ConfigExists(String),
}

impl CliError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a user-facing error.
    pub fn user(msg: impl Into<String>) -> Self {
        Self::User(msg.into())
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors: 1
            Self::User(_) | Self::WalletNotConfigured | Self::ConfigExists(_) => 1,
            // Config errors: 3
            Self::Config(_) | Self::Toml(_) | Self::Amount(_) => 3,
            Self::Chat(e) => match e {
                ChatError::Config(_) | ChatError::InvalidKey(_) => 3,
                // Balance/payment errors: 4
                ChatError::WalletUnavailable
                | ChatError::InsufficientFunds { .. }
                | ChatError::PaymentDeclined { .. }
                | ChatError::MalformedReceipt { .. } => 4,
                // Network errors: 5
                ChatError::HttpError { .. }
                | ChatError::StreamReadFailure { .. }
                | ChatError::MalformedEvent { .. }
                | ChatError::Payment(_) => 5,
                // Settlement errors: 7
                ChatError::BalanceProbeFailed { .. } => 7,
                ChatError::TurnInFlight | ChatError::TurnCancelled => 1,
            },
            Self::Payment(_) => 5,
            Self::Settlement(_) => 7,
            // IO errors: 9
            Self::Io(_) => 9,
            // JSON/format errors: 10
            Self::Json(_) => 10,
        }
    }

    /// A recovery hint printed after the error line.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Config(_) | Self::Toml(_) | Self::Amount(_) => {
                Some("Check the configuration file, or pass --config to use another one")
            }
            Self::WalletNotConfigured => Some("Set wallet.account in the configuration file"),
            Self::Chat(ChatError::WalletUnavailable) => {
                Some("Set wallet.payment_header so requests can be paid")
            }
            Self::Chat(ChatError::InsufficientFunds { .. }) => {
                Some("Run 'paychat balance' to see the wallet balance")
            }
            Self::Chat(ChatError::BalanceProbeFailed { .. }) | Self::Settlement(_) => {
                Some("Check rpc.url and that the wallet holds a token account for rpc.mint")
            }
            Self::Chat(ChatError::HttpError { .. }) => {
                Some("Check that server.base_url points at a running server")
            }
            Self::Chat(ChatError::Payment(e)) | Self::Payment(e) => Some(e.suggestion()),
            _ => None,
        }
    }
}
