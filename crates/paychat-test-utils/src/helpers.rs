//! Helper functions for creating test fixtures.
//!
//! Builders for stream lines, receipt headers, and amounts, so tests read
//! as the wire traffic they simulate.

use paychat_types::{TokenAmount, USDC_DECIMALS};
use paychat_x402::{PaymentReceipt, PaymentSigner, PresignedPayment};
use std::sync::Arc;

use crate::mock_fetcher::{Chunk, ScriptedResponse};

/// Parse a USDC amount, e.g. `usdc("0.1")`.
pub fn usdc(amount: &str) -> TokenAmount {
    TokenAmount::parse(amount, USDC_DECIMALS).unwrap()
}

/// A signer that always hands out a fixed payment header.
pub fn test_signer(payer: &str) -> Arc<dyn PaymentSigner> {
    Arc::new(PresignedPayment::new(payer, "dGVzdC1wYXltZW50"))
}

/// A `data: ` line carrying a `text-delta` event, newline included.
pub fn text_delta_line(delta: &str) -> String {
    let event = serde_json::json!({ "type": "text-delta", "delta": delta });
    format!("data: {}\n", event)
}

/// A `data: ` line carrying an arbitrary JSON payload, newline included.
pub fn data_line(payload: &str) -> String {
    format!("data: {}\n", payload)
}

/// A full reply body made of one `text-delta` line per fragment.
pub fn delta_body(deltas: &[&str]) -> String {
    deltas.iter().map(|d| text_delta_line(d)).collect()
}

/// Encode a receipt as an `X-PAYMENT-RESPONSE` header value.
pub fn receipt_header(success: bool, transaction: Option<&str>) -> String {
    PaymentReceipt {
        success,
        transaction: transaction.map(str::to_string),
        network: Some("solana-devnet".to_string()),
        payer: None,
        error_reason: if success {
            None
        } else {
            Some("settlement_failed".to_string())
        },
    }
    .to_header()
    .unwrap()
}

/// A 200 response streaming one chunk per fragment, with a settled receipt.
pub fn paid_reply(deltas: &[&str], transaction: &str) -> ScriptedResponse {
    ScriptedResponse::ok(deltas.iter().map(|d| Chunk::text(&text_delta_line(d))).collect())
        .with_receipt_header(&receipt_header(true, Some(transaction)))
}
