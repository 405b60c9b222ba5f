//! One-shot paid fetch of a protected resource.

use paychat_x402::{PaymentFetcher, PaymentReceipt, RequestSpec};
use tracing::{info, warn};

use crate::error::{ChatError, ChatResult};

/// Default path of the protected demo resource.
pub const DEFAULT_PROTECTED_PATH: &str = "/api/protected";

/// Body and receipt of a paid GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidContent {
    /// Response body text.
    pub body: String,
    /// Decoded receipt, when the server attached one.
    pub receipt: Option<PaymentReceipt>,
}

impl PaidContent {
    /// Transaction that paid for the content.
    pub fn transaction(&self) -> Option<&str> {
        self.receipt.as_ref().and_then(PaymentReceipt::transaction_id)
    }
}

/// GET `path` through the fetcher and read the whole body.
///
/// A receipt reporting a failed settlement yields
/// [`ChatError::PaymentDeclined`].
pub async fn fetch_paid(fetcher: &dyn PaymentFetcher, path: &str) -> ChatResult<PaidContent> {
    let response = fetcher.send(RequestSpec::get(path)).await?;
    let status = response.status;
    if !status.is_success() {
        return Err(ChatError::HttpError {
            status: status.as_u16(),
            body: response.text().await?,
        });
    }

    let receipt = response.receipt()?;
    let body = response.text().await?;

    match &receipt {
        Some(r) if !r.success => {
            warn!(reason = ?r.error_reason, "Payment for protected resource declined");
            return Err(ChatError::PaymentDeclined {
                reason: r.error_reason.clone(),
            });
        }
        Some(r) => info!(tx = ?r.transaction_id(), path = %path, "Protected resource paid"),
        None => info!(path = %path, "Protected resource served without receipt"),
    }

    Ok(PaidContent { body, receipt })
}
