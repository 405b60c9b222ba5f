//! x402 protocol types, client side.
//!
//! Covers the two server-to-client messages a paying client has to read:
//! the `402 Payment Required` body and the `X-PAYMENT-RESPONSE` receipt.
//! See: https://github.com/coinbase/x402/blob/main/specs/x402-specification.md

use base64::Engine as _;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::error::{X402Error, X402Result};

/// x402 protocol version.
pub const X402_VERSION: u32 = 1;

/// HTTP header name for the payment artifact (client → server).
pub const HEADER_PAYMENT: &str = "X-PAYMENT";

/// HTTP header name for the settlement receipt (server → client).
pub const HEADER_PAYMENT_RESPONSE: &str = "X-PAYMENT-RESPONSE";

/// The payment scheme this client knows how to pay.
pub const SCHEME_EXACT: &str = "exact";

// =============================================================================
// Payment Requirements (402 Response)
// =============================================================================

/// Body of a `402 Payment Required` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    /// x402 protocol version.
    pub x402_version: u32,

    /// Human-readable reason the server gave.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Payment methods the server accepts.
    #[serde(default)]
    pub accepts: Vec<PaymentRequirements>,
}

/// A single accepted payment method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Payment scheme (e.g., "exact").
    pub scheme: String,

    /// Network identifier (e.g., "solana-devnet").
    pub network: String,

    /// Maximum amount, in the asset's base units.
    pub max_amount_required: String,

    /// URL of the resource being paid for.
    #[serde(default)]
    pub resource: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// MIME type of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Address to pay to.
    pub pay_to: String,

    /// Maximum time in seconds the payment is valid after creation.
    #[serde(default)]
    pub max_timeout_seconds: u64,

    /// Asset identifier (token mint or contract address).
    pub asset: String,

    /// Scheme-specific extra data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl PaymentRequired {
    /// Parse a 402 response body.
    pub fn from_body(body: &[u8]) -> X402Result<Self> {
        serde_json::from_slice(body).map_err(|e| X402Error::malformed_requirements(e.to_string()))
    }

    /// Pick the first requirement using the `exact` scheme.
    pub fn select(&self) -> X402Result<&PaymentRequirements> {
        self.accepts
            .iter()
            .find(|req| req.scheme == SCHEME_EXACT)
            .ok_or(X402Error::NoAcceptablePayment)
    }
}

// =============================================================================
// Payment Receipt (Server → Client after settlement)
// =============================================================================

/// Settlement receipt carried in the `X-PAYMENT-RESPONSE` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    /// Whether the payment settled.
    pub success: bool,

    /// Transaction identifier on the settlement network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,

    /// Network where settlement occurred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    /// Paying address, as seen by the facilitator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,

    /// If settlement failed, the reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

impl PaymentReceipt {
    /// Decode a receipt from a base64-encoded header value.
    pub fn from_header(header_value: &str) -> X402Result<Self> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(header_value.trim())
            .map_err(|e| X402Error::malformed_receipt(format!("base64 decode error: {}", e)))?;
        serde_json::from_slice(&decoded)
            .map_err(|e| X402Error::malformed_receipt(format!("JSON parse error: {}", e)))
    }

    /// Encode this receipt to a base64 string for the header.
    pub fn to_header(&self) -> X402Result<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| X402Error::malformed_receipt(format!("JSON encode error: {}", e)))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }

    /// Transaction id, ignoring empty strings.
    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction.as_deref().filter(|tx| !tx.is_empty())
    }
}

/// Decode the receipt from response headers.
///
/// Returns `Ok(None)` when the header is absent; the lookup is
/// case-insensitive.
pub fn decode_receipt(headers: &HeaderMap) -> X402Result<Option<PaymentReceipt>> {
    let Some(value) = headers.get(HEADER_PAYMENT_RESPONSE) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|e| X402Error::malformed_receipt(format!("non-ASCII header: {}", e)))?;
    PaymentReceipt::from_header(value).map(Some)
}
