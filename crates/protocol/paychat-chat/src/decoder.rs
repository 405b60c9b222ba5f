//! Line-framed event stream decoding.
//!
//! The reply body is a sequence of newline-terminated lines. Lines starting
//! with `data: ` carry a JSON event; everything else is ignored. Only
//! `text-delta` events with a non-empty `delta` produce output.
//!
//! Bytes are decoded incrementally: a multi-byte character split across
//! two chunks is held back until its remaining bytes arrive, and invalid
//! sequences become U+FFFD. A line is never interpreted until its
//! terminating newline has been seen, so the output does not depend on how
//! the transport happened to chunk the body.

use std::pin::Pin;

use bytes::Bytes;
use futures::{future, stream, Stream, StreamExt};
use paychat_types::{FRAME_MARKER, STREAM_SENTINEL};
use paychat_x402::{BodyStream, X402Result};
use serde::Deserialize;
use tracing::trace;

use crate::error::{ChatError, ChatResult};

/// Text deltas decoded from a reply body.
pub type DeltaStream = Pin<Box<dyn Stream<Item = ChatResult<String>> + Send>>;

/// A parsed stream event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// A fragment of assistant text.
    #[serde(rename = "text-delta")]
    TextDelta {
        /// Text to append.
        #[serde(default)]
        delta: String,
    },
    /// Any other event type.
    #[serde(other)]
    Other,
}

impl StreamEvent {
    /// Parse an event payload.
    pub fn parse(payload: &str) -> ChatResult<Self> {
        serde_json::from_str(payload).map_err(|e| ChatError::malformed_event(e.to_string()))
    }
}

/// Incremental decoder from body chunks to text deltas.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
    /// Decoded text not yet terminated by a newline.
    buffer: String,
}

impl StreamDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the deltas of every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decode_utf8(chunk);
        self.buffer.push_str(&text);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);

        let mut deltas = Vec::new();
        for line in complete.split('\n') {
            if line.trim().is_empty() {
                continue;
            }
            let Some(payload) = line.strip_prefix(FRAME_MARKER) else {
                continue;
            };
            let payload = payload.trim();
            // The sentinel only ends the lines of this batch.
            if payload == STREAM_SENTINEL {
                break;
            }
            match StreamEvent::parse(payload) {
                Ok(StreamEvent::TextDelta { delta }) if !delta.is_empty() => deltas.push(delta),
                Ok(_) => {}
                Err(e) => trace!(error = %e, "Skipping stream line"),
            }
        }
        deltas
    }

    /// Text held back waiting for a newline.
    pub fn unterminated(&self) -> &str {
        &self.buffer
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

/// Decode a reply body into a lazy stream of text deltas.
///
/// The stream ends when the body ends. A transport failure is yielded as a
/// [`ChatError::StreamReadFailure`] and nothing follows it. Text after the
/// final newline is dropped.
pub fn decode_stream(body: BodyStream) -> DeltaStream {
    let mut decoder = StreamDecoder::new();
    let deltas = body
        .map(move |chunk: X402Result<Bytes>| match chunk {
            Ok(bytes) => decoder.push(&bytes).into_iter().map(Ok).collect::<Vec<_>>(),
            Err(e) => vec![Err(ChatError::from(e))],
        })
        .flat_map(stream::iter)
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        });
    Box::pin(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use paychat_x402::X402Error;

    fn decode_chunks(chunks: &[&[u8]]) -> Vec<String> {
        let mut decoder = StreamDecoder::new();
        chunks.iter().flat_map(|c| decoder.push(c)).collect()
    }

    fn ok(chunk: &'static [u8]) -> X402Result<Bytes> {
        Ok(Bytes::from_static(chunk))
    }

    fn body(chunks: Vec<X402Result<Bytes>>) -> BodyStream {
        Box::pin(stream::iter(chunks))
    }

    #[test]
    fn test_event_parse() {
        assert_eq!(
            StreamEvent::parse(r#"{"type":"text-delta","delta":"Hi"}"#).unwrap(),
            StreamEvent::TextDelta { delta: "Hi".into() }
        );
        assert_eq!(
            StreamEvent::parse(r#"{"type":"finish","reason":"stop"}"#).unwrap(),
            StreamEvent::Other
        );
        assert!(matches!(
            StreamEvent::parse("{not json"),
            Err(ChatError::MalformedEvent { .. })
        ));
    }

    #[test]
    fn test_two_deltas_one_chunk() {
        let deltas = decode_chunks(&[
            b"data: {\"type\":\"text-delta\",\"delta\":\"Hel\"}\ndata: {\"type\":\"text-delta\",\"delta\":\"lo\"}\n",
        ]);
        assert_eq!(deltas, vec!["Hel", "lo"]);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let deltas = decode_chunks(&[
            b"data: {\"type\":\"text-de",
            b"lta\",\"delta\":\"Hi\"}\n",
        ]);
        assert_eq!(deltas, vec!["Hi"]);
    }

    #[test]
    fn test_chunk_boundaries_do_not_matter() {
        let full: &[u8] = "data: {\"type\":\"text-delta\",\"delta\":\"caf\u{e9} \"}\n\
            event: ping\n\
            \n\
            data: {\"type\":\"start\"}\n\
            data: {\"type\":\"text-delta\",\"delta\":\"\u{1f600}!\"}\n"
            .as_bytes();
        let expected = vec!["caf\u{e9} ".to_string(), "\u{1f600}!".to_string()];

        for split in 0..=full.len() {
            let (a, b) = full.split_at(split);
            assert_eq!(decode_chunks(&[a, b]), expected, "split at {}", split);
        }

        let bytewise: Vec<&[u8]> = full.chunks(1).collect();
        assert_eq!(decode_chunks(&bytewise), expected);
    }

    #[test]
    fn test_multibyte_char_split() {
        let euro = "data: {\"type\":\"text-delta\",\"delta\":\"\u{20ac}\"}\n".as_bytes();
        let at = euro.iter().position(|b| *b == 0xe2).unwrap() + 1;
        let deltas = decode_chunks(&[&euro[..at], &euro[at..]]);
        assert_eq!(deltas, vec!["\u{20ac}"]);
    }

    #[test]
    fn test_invalid_utf8_replaced() {
        let deltas = decode_chunks(&[b"data: {\"type\":\"text-delta\",\"delta\":\"a\xffb\"}\n"]);
        assert_eq!(deltas, vec!["a\u{fffd}b"]);
    }

    #[test]
    fn test_ignored_lines() {
        let deltas = decode_chunks(&[
            b"\n   \n: comment\nevent: delta\ndata:{\"type\":\"text-delta\",\"delta\":\"no space\"}\n",
            b"data: {oops\ndata: {\"type\":\"text-delta\",\"delta\":\"\"}\ndata: {\"type\":\"text-delta\"}\n",
            b"data: {\"type\":\"reasoning-delta\",\"delta\":\"hmm\"}\ndata: {\"type\":\"text-delta\",\"delta\":\"ok\"}\r\n",
        ]);
        assert_eq!(deltas, vec!["ok"]);
    }

    #[test]
    fn test_sentinel_ends_batch_only() {
        let mut decoder = StreamDecoder::new();
        let first = decoder.push(
            b"data: {\"type\":\"text-delta\",\"delta\":\"a\"}\ndata: [DONE]\ndata: {\"type\":\"text-delta\",\"delta\":\"b\"}\n",
        );
        assert_eq!(first, vec!["a"]);

        let second = decoder.push(b"data: {\"type\":\"text-delta\",\"delta\":\"c\"}\n");
        assert_eq!(second, vec!["c"]);
    }

    #[test]
    fn test_unterminated_line_held() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder
            .push(b"data: {\"type\":\"text-delta\",\"delta\":\"x\"}")
            .is_empty());
        assert!(decoder.unterminated().starts_with("data: "));
    }

    #[tokio::test]
    async fn test_decode_stream_drops_trailing_partial_line() {
        let deltas: Vec<String> = decode_stream(body(vec![
            ok(b"data: {\"type\":\"text-delta\",\"delta\":\"one\"}\n"),
            ok(b"data: {\"type\":\"text-delta\",\"delta\":\"two\"}"),
        ]))
        .try_collect()
        .await
        .unwrap();
        assert_eq!(deltas, vec!["one"]);
    }

    #[tokio::test]
    async fn test_decode_stream_stops_after_read_failure() {
        let items: Vec<ChatResult<String>> = decode_stream(body(vec![
            ok(b"data: {\"type\":\"text-delta\",\"delta\":\"one\"}\n"),
            Err(X402Error::Stream("connection reset".into())),
            ok(b"data: {\"type\":\"text-delta\",\"delta\":\"two\"}\n"),
        ]))
        .collect()
        .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "one");
        assert!(matches!(
            items[1],
            Err(ChatError::StreamReadFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_body() {
        let deltas: Vec<String> = decode_stream(body(vec![])).try_collect().await.unwrap();
        assert!(deltas.is_empty());
    }
}
