//! Balance oracle trait definition.

use async_trait::async_trait;
use paychat_types::{AccountRef, TokenAmount};

use crate::error::SettleResult;

/// Read-only source of token balances.
///
/// This trait abstracts the chain query, allowing for:
/// - A JSON-RPC implementation for production
/// - A mock implementation for testing
///
/// Implementations make a single attempt per call; callers decide what a
/// failure means.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// Current token balance of `account`, in whole-token units with the
    /// token's decimals scale.
    async fn balance(&self, account: &AccountRef) -> SettleResult<TokenAmount>;
}
