//! Transcript messages.
//!
//! A conversation is an insertion-ordered list of [`Message`]s. Only the
//! most recent assistant message is ever rewritten, and only while its turn
//! is still streaming.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Unique, timestamp-derived message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues message ids from the wall clock in milliseconds.
///
/// Ids are strictly increasing per generator: two ids requested within the
/// same millisecond are bumped apart instead of colliding.
#[derive(Debug, Default)]
pub struct MessageIdGenerator {
    last: AtomicU64,
}

impl MessageIdGenerator {
    /// Create a generator with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next id.
    pub fn next_id(&self) -> MessageId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return MessageId(candidate.to_string()),
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Submitted by the local user.
    User,
    /// Generated by the serving collaborator.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One renderable fragment of a message.
///
/// New part kinds are added as new variants. Parts with a `type` this
/// build does not know decode to [`MessagePart::Unknown`] and render as
/// nothing, so older clients keep loading newer transcripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// A part kind this build does not understand.
    #[serde(other, skip_serializing)]
    Unknown,
}

impl MessagePart {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Text this part contributes to a rendered transcript.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Unknown => None,
        }
    }
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier.
    pub id: MessageId,
    /// Author.
    pub role: Role,
    /// Ordered content parts.
    pub parts: Vec<MessagePart>,
    /// Transaction that paid for this reply, when a receipt was decoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_signature: Option<String>,
}

impl Message {
    /// Create a user message holding a single text part.
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            parts: vec![MessagePart::text(text)],
            tx_signature: None,
        }
    }

    /// Create an assistant message holding a single text part.
    pub fn assistant(id: MessageId, text: impl Into<String>, tx_signature: Option<String>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            parts: vec![MessagePart::text(text)],
            tx_signature,
        }
    }

    /// Replace the parts with a single text part.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.parts = vec![MessagePart::text(text)];
    }

    /// Concatenated text of every text part.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(MessagePart::as_text).collect()
    }
}
