//! Funds precondition checked before any paid request.
//!
//! The gate is consulted before a turn spends a network round-trip or a
//! payment. It never retries: a failed probe is reported as
//! [`FundsCheck::ProbeFailed`] and the turn is aborted by the caller.

use std::sync::Arc;

use paychat_types::{AccountRef, TokenAmount};
use tracing::{debug, warn};

use crate::traits::BalanceOracle;

/// Outcome of a funds check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundsCheck {
    /// The account can cover the required amount.
    Sufficient {
        /// Balance observed
        available: TokenAmount,
    },
    /// The balance is below the required amount.
    Insufficient {
        /// Amount the request costs
        required: TokenAmount,
        /// Balance observed
        available: TokenAmount,
    },
    /// The oracle query itself failed.
    ProbeFailed {
        /// Failure reported by the oracle
        reason: String,
    },
}

impl FundsCheck {
    /// Whether the request may proceed.
    pub fn is_sufficient(&self) -> bool {
        matches!(self, Self::Sufficient { .. })
    }
}

/// Read-only precondition check against a [`BalanceOracle`].
#[derive(Clone)]
pub struct BalanceGate {
    oracle: Arc<dyn BalanceOracle>,
}

impl BalanceGate {
    /// Create a gate over an oracle.
    pub fn new(oracle: Arc<dyn BalanceOracle>) -> Self {
        Self { oracle }
    }

    /// Check that `account` holds at least `required`.
    pub async fn check_funds(&self, account: &AccountRef, required: &TokenAmount) -> FundsCheck {
        match self.oracle.balance(account).await {
            Ok(available) if available >= *required => {
                debug!(account = %account, available = %available, required = %required, "Funds sufficient");
                FundsCheck::Sufficient { available }
            }
            Ok(available) => {
                debug!(account = %account, available = %available, required = %required, "Funds insufficient");
                FundsCheck::Insufficient {
                    required: *required,
                    available,
                }
            }
            Err(e) => {
                warn!(account = %account, error = %e, "Balance probe failed");
                FundsCheck::ProbeFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

impl std::fmt::Debug for BalanceGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceGate").finish_non_exhaustive()
    }
}
