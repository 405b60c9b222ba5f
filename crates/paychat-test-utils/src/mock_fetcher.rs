//! Mock implementation of the `PaymentFetcher` trait for testing.
//!
//! Responses are scripted up front and handed out in order. A body is a
//! list of [`Chunk`]s, so tests control exactly how the reply is split and
//! can park the stream on a [`Notify`] to observe intermediate state.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use paychat_x402::{
    BodyStream, FetchResponse, HeaderMap, HeaderName, HeaderValue, PaymentFetcher, RequestSpec,
    StatusCode, X402Error, X402Result, HEADER_PAYMENT_RESPONSE,
};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use tokio::sync::Notify;

/// One step of a scripted body.
#[derive(Clone)]
pub enum Chunk {
    /// Yield these bytes.
    Data(Bytes),
    /// Fail the read with this message.
    Fail(String),
    /// Wait until notified, then continue.
    Wait(Arc<Notify>),
}

impl Chunk {
    /// A data chunk from a string.
    pub fn text(s: &str) -> Self {
        Self::Data(Bytes::copy_from_slice(s.as_bytes()))
    }

    /// A data chunk from raw bytes.
    pub fn bytes(b: &[u8]) -> Self {
        Self::Data(Bytes::copy_from_slice(b))
    }
}

/// A scripted response.
#[derive(Clone)]
pub struct ScriptedResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body steps.
    pub chunks: Vec<Chunk>,
}

impl ScriptedResponse {
    /// A 200 response with the given body steps.
    pub fn ok(chunks: Vec<Chunk>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            chunks,
        }
    }

    /// A response with the given status and a single text body.
    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            chunks: vec![Chunk::text(body)],
        }
    }

    /// Attach a raw `X-PAYMENT-RESPONSE` header value.
    pub fn with_receipt_header(mut self, value: &str) -> Self {
        let name: HeaderName = HEADER_PAYMENT_RESPONSE.parse().unwrap();
        self.headers.insert(name, HeaderValue::from_str(value).unwrap());
        self
    }
}

struct MockFetcherInner {
    /// Responses still to hand out.
    responses: VecDeque<ScriptedResponse>,
    /// Requests received, in order.
    requests: Vec<RequestSpec>,
    /// When set, `send` fails with a network error.
    send_error: Option<String>,
}

/// A mock fetcher handing out scripted responses.
#[derive(Clone)]
pub struct MockFetcher {
    inner: Arc<RwLock<MockFetcherInner>>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// Create a fetcher with no scripted responses.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockFetcherInner {
                responses: VecDeque::new(),
                requests: Vec::new(),
                send_error: None,
            })),
        }
    }

    /// Queue a response.
    pub fn with_response(self, response: ScriptedResponse) -> Self {
        self.push_response(response);
        self
    }

    /// Make every `send` fail at the transport level.
    pub fn with_send_error(self, message: &str) -> Self {
        self.inner.write().unwrap().send_error = Some(message.to_string());
        self
    }

    /// Queue a response at runtime.
    pub fn push_response(&self, response: ScriptedResponse) {
        self.inner.write().unwrap().responses.push_back(response);
    }

    // =========================================================================
    // Assertion Helpers
    // =========================================================================

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RequestSpec> {
        self.inner.read().unwrap().requests.clone()
    }

    /// Number of requests received.
    pub fn request_count(&self) -> usize {
        self.inner.read().unwrap().requests.len()
    }

    /// JSON body of the most recent request.
    pub fn last_body(&self) -> Option<serde_json::Value> {
        self.inner
            .read()
            .unwrap()
            .requests
            .last()
            .and_then(|r| r.body.clone())
    }
}

fn body_stream(chunks: Vec<Chunk>) -> BodyStream {
    Box::pin(stream::unfold(
        VecDeque::from(chunks),
        |mut chunks| async move {
            loop {
                match chunks.pop_front()? {
                    Chunk::Data(bytes) => return Some((Ok(bytes), chunks)),
                    Chunk::Fail(message) => return Some((Err(X402Error::Stream(message)), chunks)),
                    Chunk::Wait(notify) => notify.notified().await,
                }
            }
        },
    ))
}

#[async_trait]
impl PaymentFetcher for MockFetcher {
    async fn send(&self, request: RequestSpec) -> X402Result<FetchResponse> {
        let scripted = {
            let mut inner = self.inner.write().unwrap();
            inner.requests.push(request);
            if let Some(message) = &inner.send_error {
                return Err(X402Error::Network(message.clone()));
            }
            inner
                .responses
                .pop_front()
                .unwrap_or_else(|| ScriptedResponse::status(500, "no scripted response"))
        };
        Ok(FetchResponse::new(
            scripted.status,
            scripted.headers,
            body_stream(scripted.chunks),
        ))
    }
}
