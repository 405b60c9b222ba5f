//! JSON-RPC token balance oracle.
//!
//! Sums the token accounts an owner holds for one mint using the
//! `getTokenAccountsByOwner` method with `jsonParsed` encoding, the way
//! Solana-compatible RPC nodes expose SPL token balances.
//!
//! ```rust,no_run
//! # async fn example() -> paychat_settle::SettleResult<()> {
//! use paychat_settle::{BalanceOracle, RpcBalanceOracle, RpcConfig};
//! use paychat_types::AccountRef;
//!
//! let oracle = RpcBalanceOracle::new(RpcConfig::devnet_usdc())?;
//! let balance = oracle.balance(&AccountRef::new("wallet-address")).await?;
//! println!("{} USDC", balance.to_fixed(2));
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use paychat_types::{AccountRef, TokenAmount, USDC_DECIMALS};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{SettleError, SettleResult};
use crate::traits::BalanceOracle;

/// Public Solana devnet endpoint.
pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

/// USDC mint on Solana devnet.
pub const DEVNET_USDC_MINT: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

/// Configuration for [`RpcBalanceOracle`].
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// JSON-RPC endpoint.
    pub url: String,
    /// Token mint address.
    pub mint: String,
    /// Decimals the returned balance is expressed in.
    pub decimals: u8,
    /// Request timeout.
    pub timeout: Duration,
}

impl RpcConfig {
    /// USDC on Solana devnet.
    pub fn devnet_usdc() -> Self {
        Self {
            url: DEVNET_RPC_URL.to_string(),
            mint: DEVNET_USDC_MINT.to_string(),
            decimals: USDC_DECIMALS,
            timeout: Duration::from_secs(30),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::devnet_usdc()
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct TokenAccountsResult {
    value: Vec<KeyedTokenAccount>,
}

#[derive(Debug, Deserialize)]
struct KeyedTokenAccount {
    account: TokenAccount,
}

#[derive(Debug, Deserialize)]
struct TokenAccount {
    data: TokenAccountData,
}

#[derive(Debug, Deserialize)]
struct TokenAccountData {
    parsed: ParsedTokenAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedTokenAccount {
    info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    token_amount: UiTokenAmount,
}

#[derive(Debug, Deserialize)]
struct UiTokenAmount {
    amount: String,
    decimals: u8,
}

/// Balance oracle backed by a JSON-RPC node.
#[derive(Clone)]
pub struct RpcBalanceOracle {
    client: Client,
    config: RpcConfig,
}

impl RpcBalanceOracle {
    /// Create an oracle from configuration.
    pub fn new(config: RpcConfig) -> SettleResult<Self> {
        if config.url.is_empty() {
            return Err(SettleError::config("RPC URL is empty"));
        }
        if config.mint.is_empty() {
            return Err(SettleError::config("token mint is empty"));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SettleError::Network(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    fn total(&self, accounts: TokenAccountsResult, owner: &AccountRef) -> SettleResult<TokenAmount> {
        if accounts.value.is_empty() {
            return Err(SettleError::account_not_found(owner.as_str()));
        }

        let mut total = TokenAmount::zero(self.config.decimals);
        for keyed in accounts.value {
            let token = keyed.account.data.parsed.info.token_amount;
            let units: u64 = token
                .amount
                .parse()
                .map_err(|_| SettleError::malformed(format!("bad token amount {:?}", token.amount)))?;
            let amount = TokenAmount::from_units(units, token.decimals).rescale(self.config.decimals)?;
            let sum = total
                .units()
                .checked_add(amount.units())
                .ok_or_else(|| SettleError::malformed("token balance overflow"))?;
            total = TokenAmount::from_units(sum, self.config.decimals);
        }
        Ok(total)
    }
}

impl std::fmt::Debug for RpcBalanceOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcBalanceOracle")
            .field("url", &self.config.url)
            .field("mint", &self.config.mint)
            .finish()
    }
}

#[async_trait]
impl BalanceOracle for RpcBalanceOracle {
    async fn balance(&self, account: &AccountRef) -> SettleResult<TokenAmount> {
        debug!(url = %self.config.url, account = %account, "Querying token balance");

        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getTokenAccountsByOwner",
            "params": [
                account.as_str(),
                { "mint": self.config.mint },
                { "encoding": "jsonParsed" }
            ]
        });

        let response = self.client.post(&self.config.url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SettleError::Network(format!(
                "RPC node returned {}: {}",
                status, body
            )));
        }

        let body: RpcResponse<TokenAccountsResult> = response
            .json()
            .await
            .map_err(|e| SettleError::malformed(e.to_string()))?;
        parse_rpc(body).and_then(|accounts| self.total(accounts, account))
    }
}

fn parse_rpc<T>(response: RpcResponse<T>) -> SettleResult<T> {
    if let Some(err) = response.error {
        return Err(SettleError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    response
        .result
        .ok_or_else(|| SettleError::malformed("response has neither result nor error"))
}
