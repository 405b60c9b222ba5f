//! Data structures for the paychat payment-gated chat client.
//!
//! This crate provides the types shared by every paychat crate: the
//! conversation transcript, the per-session payment projection, and the
//! fixed-point token amounts used by the balance gate. It contains no I/O,
//! only type definitions with serialization support.
//!
//! # Module Organization
//!
//! - [`amount`] - Fixed-point token amounts (`TokenAmount`)
//! - [`constants`] - Wire constants (frame marker, sentinel, defaults)
//! - [`message`] - Transcript messages and their parts
//! - [`payment`] - Payment status projection and caller-visible chat status
//!
//! # Example
//!
//! ```
//! use paychat_types::{Message, MessageIdGenerator, PaymentInfo, TokenAmount};
//!
//! let ids = MessageIdGenerator::new();
//! let msg = Message::user(ids.next_id(), "What is x402?");
//! assert_eq!(msg.text(), "What is x402?");
//!
//! let price = TokenAmount::parse("0.1", 6).unwrap();
//! let info = PaymentInfo::idle(&price);
//! assert_eq!(info.amount, "$0.1");
//! ```
//!
//! # Type Conventions
//!
//! - Wire-facing structs use `#[serde(rename_all = "camelCase")]` so the
//!   transcript serializes exactly as the serving collaborator expects
//! - Enums whose variant set may grow carry an explicit `Unknown` fallback
//!   rather than failing to deserialize

/// Crate version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod amount;
pub mod constants;
pub mod message;
pub mod payment;

pub use amount::{AmountError, TokenAmount};
pub use constants::*;
pub use message::{Message, MessageId, MessageIdGenerator, MessagePart, Role};
pub use payment::{AccountRef, ChatStatus, PaymentInfo, PaymentStatus};
