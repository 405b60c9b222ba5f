//! Balance checks for the paychat client.
//!
//! Before a turn spends a network round-trip or a payment, the client asks
//! whether the paying account can cover the configured price. This crate
//! provides that precondition and the oracle it reads from.
//!
//! # Architecture
//!
//! ```text
//! paychat-chat                 paychat-settle
//! ┌────────────────┐         ┌─────────────────────────┐
//! │ submit()       │ ──────► │ BalanceGate             │
//! └────────────────┘         │   └─ BalanceOracle      │
//!                            │        └─ RpcBalance... │
//!                            └───────────┬─────────────┘
//!                                        │
//!                                        ▼
//!                            ┌─────────────────────────┐
//!                            │ JSON-RPC node           │
//!                            └─────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use paychat_settle::{BalanceGate, FundsCheck, RpcBalanceOracle, RpcConfig};
//! use paychat_types::{AccountRef, TokenAmount};
//!
//! # async fn example() -> paychat_settle::SettleResult<()> {
//! let oracle = RpcBalanceOracle::new(RpcConfig::devnet_usdc())?;
//! let gate = BalanceGate::new(Arc::new(oracle));
//! let price = TokenAmount::parse("0.1", 6)?;
//!
//! match gate.check_funds(&AccountRef::new("wallet-address"), &price).await {
//!     FundsCheck::Sufficient { .. } => println!("ok"),
//!     FundsCheck::Insufficient { available, .. } => println!("only {}", available),
//!     FundsCheck::ProbeFailed { reason } => println!("probe failed: {}", reason),
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod gate;
pub mod rpc;
mod traits;

// Re-export main types
pub use error::{SettleError, SettleResult};
pub use gate::{BalanceGate, FundsCheck};
pub use rpc::{RpcBalanceOracle, RpcConfig};
pub use traits::BalanceOracle;
