//! x402 Payment Required client plumbing for paychat.
//!
//! This crate implements the client half of the [x402 payment
//! protocol](https://www.x402.org/): sending a request, answering a
//! `402 Payment Required` with a payment artifact, and decoding the
//! settlement receipt the server returns with the content.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     POST /api/chat     ┌──────────────┐
//! │  paychat     │ ──────────────────────→│  Serving     │
//! │  (Client)    │ ←────────────────────  │  endpoint    │
//! │              │  402 Payment Required  │              │
//! │              │                        │              │
//! │              │  POST + X-PAYMENT hdr  │              │
//! │              │ ──────────────────────→│              │
//! │              │  200 OK + stream       │              │
//! │              │ ←────────────────────  │              │
//! │              │  + X-PAYMENT-RESPONSE  │              │
//! └─────────────┘                        └──────────────┘
//! ```
//!
//! # Components
//!
//! - **[`types`]**: x402 message types (`PaymentRequired`, `PaymentReceipt`)
//! - **[`fetcher`]**: the `PaymentFetcher` seam and its reqwest implementation
//! - **[`error`]**: Error types with recovery suggestions
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use paychat_x402::{PaymentFetcher, PresignedPayment, RequestSpec, X402Fetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let signer = Arc::new(PresignedPayment::new("payer-address", "base64-payment..."));
//! let fetcher = X402Fetcher::new("http://localhost:3000", signer)?;
//!
//! let response = fetcher.send(RequestSpec::get("/api/protected")).await?;
//! if let Some(receipt) = response.receipt()? {
//!     println!("paid: {} tx={:?}", receipt.success, receipt.transaction);
//! }
//! println!("{}", response.text().await?);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod fetcher;
pub mod types;

// Re-export main types
pub use error::{X402Error, X402Result};
pub use fetcher::{
    BodyStream, FetchResponse, PaymentFetcher, PaymentSigner, PresignedPayment, RequestSpec,
    X402Fetcher, DEFAULT_TIMEOUT,
};
pub use types::{
    decode_receipt, PaymentReceipt, PaymentRequired, PaymentRequirements, HEADER_PAYMENT,
    HEADER_PAYMENT_RESPONSE, SCHEME_EXACT, X402_VERSION,
};

// Re-exported so callers can build requests and responses without a direct
// reqwest dependency.
pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
pub use reqwest::{Method, StatusCode};
