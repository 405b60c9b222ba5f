//! Wire constants and defaults shared across paychat crates.

// =============================================================================
// Stream Framing
// =============================================================================

/// Prefix identifying a protocol-bearing line in a streamed response body.
pub const FRAME_MARKER: &str = "data: ";

/// Payload marking the end of the event payload (distinct from stream closure).
pub const STREAM_SENTINEL: &str = "[DONE]";

/// Event type carrying an incremental fragment of assistant text.
pub const EVENT_TEXT_DELTA: &str = "text-delta";

// =============================================================================
// Payment Defaults
// =============================================================================

/// Decimal places of the USDC token.
pub const USDC_DECIMALS: u8 = 6;

/// Symbol shown in balance messages.
pub const DEFAULT_TOKEN_SYMBOL: &str = "USDC";

/// Default per-message price, in whole tokens.
pub const DEFAULT_PRICE: &str = "0.1";

/// Soft ceiling the serving collaborator advertises for one streamed reply.
pub const MAX_STREAM_DURATION_SECS: u64 = 30;
