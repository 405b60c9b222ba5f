//! Mock implementation of the `BalanceOracle` trait for testing.

use async_trait::async_trait;
use paychat_settle::{BalanceOracle, SettleError, SettleResult};
use paychat_types::{AccountRef, TokenAmount, USDC_DECIMALS};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

struct MockOracleInner {
    /// Balance returned for accounts without an override.
    default_balance: TokenAmount,
    /// Per-account balances.
    balances: HashMap<AccountRef, TokenAmount>,
    /// When true, every query fails with a network error.
    should_fail: bool,
    /// Accounts queried, in order.
    queries: Vec<AccountRef>,
}

/// A mock balance oracle.
///
/// Uses `Arc<RwLock<...>>` internally, so clones share state and a test
/// can keep a handle after moving one into the code under test.
#[derive(Clone)]
pub struct MockBalanceOracle {
    inner: Arc<RwLock<MockOracleInner>>,
}

impl Default for MockBalanceOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBalanceOracle {
    /// Create an oracle reporting 10 USDC for every account.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockOracleInner {
                default_balance: TokenAmount::from_units(10_000_000, USDC_DECIMALS),
                balances: HashMap::new(),
                should_fail: false,
                queries: Vec::new(),
            })),
        }
    }

    /// Set the balance reported for every account.
    pub fn with_balance(self, balance: TokenAmount) -> Self {
        self.inner.write().unwrap().default_balance = balance;
        self
    }

    /// Set the balance of one account.
    pub fn with_account(self, account: AccountRef, balance: TokenAmount) -> Self {
        self.inner.write().unwrap().balances.insert(account, balance);
        self
    }

    /// Configure the mock to fail every query.
    pub fn with_failure(self) -> Self {
        self.inner.write().unwrap().should_fail = true;
        self
    }

    /// Set the failure mode at runtime.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.inner.write().unwrap().should_fail = should_fail;
    }

    /// Change the default balance at runtime.
    pub fn set_balance(&self, balance: TokenAmount) {
        self.inner.write().unwrap().default_balance = balance;
    }

    // =========================================================================
    // Assertion Helpers
    // =========================================================================

    /// Accounts queried so far.
    pub fn queries(&self) -> Vec<AccountRef> {
        self.inner.read().unwrap().queries.clone()
    }

    /// Number of queries made.
    pub fn query_count(&self) -> usize {
        self.inner.read().unwrap().queries.len()
    }
}

#[async_trait]
impl BalanceOracle for MockBalanceOracle {
    async fn balance(&self, account: &AccountRef) -> SettleResult<TokenAmount> {
        let mut inner = self.inner.write().unwrap();
        inner.queries.push(account.clone());
        if inner.should_fail {
            return Err(SettleError::Network("mock oracle failure".to_string()));
        }
        Ok(inner
            .balances
            .get(account)
            .copied()
            .unwrap_or(inner.default_balance))
    }
}
