//! Command-line client for payment-gated streaming chat.
//!
//! This crate provides the `paychat` binary. Every message is paid for
//! with a small token transfer, after a local balance check:
//!
//! - **Setup**: `init` writes a configuration file
//! - **Wallet**: `balance` shows the token balance and how many messages it covers
//! - **Chat**: `send` for one message, `chat` for an interactive session
//! - **Paid resources**: `fetch` pays for and prints a protected resource
//!
//! # Quick Start
//!
//! ```bash
//! paychat init --account <WALLET_ADDRESS> --server http://localhost:3000
//! paychat balance
//! paychat send "What is x402?"
//! ```
//!
//! # Output Formats
//!
//! All commands support `--format`:
//!
//! - `human` (default): Human-readable with colors
//! - `json`: Machine-readable JSON
//!
//! # Configuration
//!
//! Loaded from `config.toml` in the platform data directory (override with
//! `--config` or `PAYCHAT_CONFIG`). `${VAR}` references in URLs and wallet
//! secrets are expanded from the environment.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod output;

// Re-export main types
pub use cli::{Cli, Commands, OutputFormatArg};
pub use config::CliConfig;
pub use context::ChatContext;
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, Render};
