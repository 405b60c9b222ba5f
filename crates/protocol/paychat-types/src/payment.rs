//! Payment status projection and caller-visible chat status.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::amount::TokenAmount;

/// Reference to the paying account, as understood by the balance oracle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountRef(String);

impl AccountRef {
    /// Wrap an account address.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Borrow the address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of the charge for the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Request sent; no receipt decoded yet.
    Processing,
    /// Receipt reported a settled payment.
    Completed,
    /// Receipt reported a failed payment.
    Error,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Per-session payment projection, overwritten every turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    /// Display price, e.g. `$0.1`.
    pub amount: String,
    /// Transaction signature from the receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Charge status; `None` when no charge is in flight.
    pub status: Option<PaymentStatus>,
}

impl PaymentInfo {
    /// No charge in flight.
    pub fn idle(price: &TokenAmount) -> Self {
        Self {
            amount: display_price(price),
            signature: None,
            status: None,
        }
    }

    /// Charge sent, awaiting receipt.
    pub fn processing(price: &TokenAmount) -> Self {
        Self {
            status: Some(PaymentStatus::Processing),
            ..Self::idle(price)
        }
    }

    /// Receipt decoded with the given outcome.
    pub fn settled(price: &TokenAmount, success: bool, signature: Option<String>) -> Self {
        Self {
            amount: display_price(price),
            signature,
            status: Some(if success {
                PaymentStatus::Completed
            } else {
                PaymentStatus::Error
            }),
        }
    }
}

fn display_price(price: &TokenAmount) -> String {
    format!("${}", price)
}

/// Caller-visible chat status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    /// Nothing in flight, or the reply has started streaming.
    #[default]
    Idle,
    /// A turn was accepted and no reply text has arrived yet.
    Loading,
    /// The last turn failed.
    Error,
}

impl fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Error => write!(f, "error"),
        }
    }
}
