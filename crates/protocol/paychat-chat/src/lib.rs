//! Payment-gated streaming chat for paychat.
//!
//! A [`Conversation`] runs one turn at a time:
//!
//! 1. The [`Session`] must hold a wallet that can pay.
//! 2. A [`BalanceGate`](paychat_settle::BalanceGate) checks the account
//!    holds at least the message price.
//! 3. The transcript is sent through a [`PaymentFetcher`](paychat_x402::PaymentFetcher),
//!    which settles the payment with the server.
//! 4. The reply body is decoded into text deltas by the [`StreamDecoder`]
//!    and folded into the last assistant message as it arrives.
//!
//! Observers follow along through [`Conversation::subscribe`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use paychat_chat::{ChatConfig, Conversation, Session, Submission};
//! use paychat_settle::{RpcBalanceOracle, RpcConfig};
//! use paychat_types::AccountRef;
//! use paychat_x402::{PresignedPayment, X402Fetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let signer = Arc::new(PresignedPayment::new("payer", "base64-payment"));
//! let session = Arc::new(Session::with_wallet(AccountRef::new("payer"), signer.clone()));
//! let conversation = Conversation::new(
//!     ChatConfig::default(),
//!     session,
//!     Arc::new(RpcBalanceOracle::new(RpcConfig::devnet_usdc())?),
//!     Arc::new(X402Fetcher::new("http://localhost:3000", signer)?),
//! );
//!
//! conversation.submit(Submission::text("Hello")).await?;
//! if let Some(reply) = conversation.snapshot().last_reply() {
//!     println!("{}", reply.text());
//! }
//! # Ok(())
//! # }
//! ```

mod conversation;
mod decoder;
mod error;
mod protected;
mod session;

pub use conversation::{
    Attachment, ChatConfig, ChatState, Conversation, Phase, Submission, DEFAULT_CHAT_PATH,
};
pub use decoder::{decode_stream, DeltaStream, StreamDecoder, StreamEvent};
pub use error::{ChatError, ChatResult};
pub use protected::{fetch_paid, PaidContent, DEFAULT_PROTECTED_PATH};
pub use session::{KeyMaterial, Session, KEY_LENGTH};
