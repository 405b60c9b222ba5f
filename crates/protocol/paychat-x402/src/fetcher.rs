//! Paid HTTP exchanges.
//!
//! [`PaymentFetcher`] is the seam the chat core talks through: one call, one
//! HTTP exchange, with the payment handshake hidden behind it. [`X402Fetcher`]
//! is the reqwest-backed implementation; it answers a `402` by asking a
//! [`PaymentSigner`] for an `X-PAYMENT` header and retrying once.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, info, warn};

use crate::error::{X402Error, X402Result};
use crate::types::{decode_receipt, PaymentReceipt, PaymentRequired, HEADER_PAYMENT};

/// Default HTTP timeout for paid requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw response body, pulled chunk by chunk.
pub type BodyStream = Pin<Box<dyn Stream<Item = X402Result<Bytes>> + Send>>;

/// What to send.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the fetcher's base URL (e.g. `/api/chat`).
    pub path: String,
    /// Optional JSON body.
    pub body: Option<serde_json::Value>,
}

impl RequestSpec {
    /// A GET request for `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    /// A POST request for `path` with a JSON body.
    pub fn post_json(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// A received response whose body has not been read yet.
pub struct FetchResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body chunks, consumed at most once.
    pub body: BodyStream,
}

impl FetchResponse {
    /// Build a response from parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: BodyStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Decode the payment receipt, if the server attached one.
    pub fn receipt(&self) -> X402Result<Option<PaymentReceipt>> {
        decode_receipt(&self.headers)
    }

    /// Drain the body into a string, replacing invalid UTF-8.
    pub async fn text(self) -> X402Result<String> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        let bytes: Vec<u8> = chunks.concat();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Performs one HTTP exchange, attaching payment as the server demands.
#[async_trait]
pub trait PaymentFetcher: Send + Sync {
    /// Send the request and return the final response.
    ///
    /// Non-success statuses are returned, not raised; only transport
    /// failures and handshake failures are errors.
    async fn send(&self, request: RequestSpec) -> X402Result<FetchResponse>;
}

/// Produces the `X-PAYMENT` header for a set of payment requirements.
///
/// Building and signing the payment transaction happens behind this trait.
#[async_trait]
pub trait PaymentSigner: Send + Sync {
    /// Address that pays.
    fn payer(&self) -> &str;

    /// Build the base64 payment artifact for the given requirements.
    async fn payment_header(&self, required: &PaymentRequired) -> X402Result<String>;
}

/// A signer that hands out a payment header prepared elsewhere.
#[derive(Clone)]
pub struct PresignedPayment {
    payer: String,
    header: String,
}

impl PresignedPayment {
    /// Create from a payer address and a ready-made header value.
    pub fn new(payer: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            payer: payer.into(),
            header: header.into(),
        }
    }
}

impl fmt::Debug for PresignedPayment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresignedPayment")
            .field("payer", &self.payer)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentSigner for PresignedPayment {
    fn payer(&self) -> &str {
        &self.payer
    }

    async fn payment_header(&self, required: &PaymentRequired) -> X402Result<String> {
        required.select()?;
        if self.header.is_empty() {
            return Err(X402Error::signer("no payment header configured"));
        }
        Ok(self.header.clone())
    }
}

/// reqwest-backed [`PaymentFetcher`] speaking the x402 handshake.
#[derive(Clone)]
pub struct X402Fetcher {
    /// HTTP client
    client: Client,
    /// Base URL of the serving collaborator
    base_url: String,
    /// Source of payment headers
    signer: Arc<dyn PaymentSigner>,
}

impl X402Fetcher {
    /// Create a fetcher with the default timeout.
    pub fn new(base_url: &str, signer: Arc<dyn PaymentSigner>) -> X402Result<Self> {
        Self::with_timeout(base_url, signer, DEFAULT_TIMEOUT)
    }

    /// Create a fetcher with a custom request timeout.
    pub fn with_timeout(
        base_url: &str,
        signer: Arc<dyn PaymentSigner>,
        timeout: Duration,
    ) -> X402Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| X402Error::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> X402Result<String> {
        if self.base_url.is_empty() {
            return Err(X402Error::InvalidUrl("empty base URL".to_string()));
        }
        Ok(format!("{}/{}", self.base_url, path.trim_start_matches('/')))
    }

    async fn exchange(
        &self,
        url: &str,
        request: &RequestSpec,
        payment: Option<&str>,
    ) -> X402Result<reqwest::Response> {
        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(header) = payment {
            builder = builder.header(HEADER_PAYMENT, header);
        }
        Ok(builder.send().await?)
    }
}

impl fmt::Debug for X402Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X402Fetcher")
            .field("base_url", &self.base_url)
            .field("payer", &self.signer.payer())
            .finish()
    }
}

#[async_trait]
impl PaymentFetcher for X402Fetcher {
    async fn send(&self, request: RequestSpec) -> X402Result<FetchResponse> {
        let url = self.url_for(&request.path)?;
        debug!(url = %url, method = %request.method, "Sending request");

        let mut response = self.exchange(&url, &request, None).await?;

        if response.status() == StatusCode::PAYMENT_REQUIRED {
            let body = response.bytes().await?;
            let required = PaymentRequired::from_body(&body)?;
            let requirement = required.select()?;
            info!(
                network = %requirement.network,
                amount = %requirement.max_amount_required,
                pay_to = %requirement.pay_to,
                "Payment required, attaching payment"
            );

            let header = self.signer.payment_header(&required).await?;
            response = self.exchange(&url, &request, Some(&header)).await?;

            if response.status() == StatusCode::PAYMENT_REQUIRED {
                warn!(url = %url, "Server rejected the payment");
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        debug!(status = %status, "Response received");

        let body: BodyStream = Box::pin(response.bytes_stream().map_err(X402Error::from));
        Ok(FetchResponse::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn signer() -> Arc<dyn PaymentSigner> {
        Arc::new(PresignedPayment::new("payer1", "aGVhZGVy"))
    }

    #[test]
    fn test_fetcher_url_normalization() {
        let fetcher = X402Fetcher::new("http://localhost:3000/", signer()).unwrap();
        assert_eq!(fetcher.base_url(), "http://localhost:3000");
        assert_eq!(
            fetcher.url_for("/api/chat").unwrap(),
            "http://localhost:3000/api/chat"
        );
        assert_eq!(
            fetcher.url_for("api/chat").unwrap(),
            "http://localhost:3000/api/chat"
        );
    }

    #[test]
    fn test_fetcher_rejects_empty_base() {
        let fetcher = X402Fetcher::new("", signer()).unwrap();
        assert!(matches!(
            fetcher.url_for("/api/chat"),
            Err(X402Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_fetcher_debug_hides_signer() {
        let fetcher = X402Fetcher::new("https://example.com", signer()).unwrap();
        let debug = format!("{:?}", fetcher);
        assert!(debug.contains("example.com"));
        assert!(debug.contains("payer1"));
        assert!(!debug.contains("aGVhZGVy"));
    }

    #[test]
    fn test_request_spec_builders() {
        let get = RequestSpec::get("/api/protected");
        assert_eq!(get.method, Method::GET);
        assert!(get.body.is_none());

        let post = RequestSpec::post_json("/api/chat", serde_json::json!({"messages": []}));
        assert_eq!(post.method, Method::POST);
        assert!(post.body.is_some());
    }

    #[tokio::test]
    async fn test_presigned_payment() {
        let required = PaymentRequired::from_body(
            br#"{"x402Version":1,"accepts":[{"scheme":"exact","network":"solana-devnet","maxAmountRequired":"100","payTo":"x","asset":"m"}]}"#,
        )
        .unwrap();

        let presigned = PresignedPayment::new("payer1", "aGVhZGVy");
        assert_eq!(presigned.payment_header(&required).await.unwrap(), "aGVhZGVy");

        let empty = PresignedPayment::new("payer1", "");
        assert!(matches!(
            empty.payment_header(&required).await,
            Err(X402Error::Signer(_))
        ));
    }

    #[tokio::test]
    async fn test_response_text_drains_chunks() {
        let body: BodyStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"pay")),
            Ok(Bytes::from_static(b"ment required")),
        ]));
        let response = FetchResponse::new(StatusCode::BAD_REQUEST, HeaderMap::new(), body);
        assert_eq!(response.text().await.unwrap(), "payment required");
    }
}
