//! The payment-gated conversation state machine.
//!
//! ```text
//!            submit (empty)
//!   Idle ─────────────────────▶ Idle
//!    │  ▲
//!    │  │ stream ended
//!    ▼  │
//! Submitting ──accepted──▶ Active ──fatal──▶ Errored
//!    │                                         │
//!    └────── precondition failed ─────────────▶│
//!                                              │ submit
//!                                              ▼
//!                                          Submitting
//! ```
//!
//! Every observable change is published as a whole new [`ChatState`]
//! through a [`tokio::sync::watch`] channel, so observers never see a
//! half-applied update.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::StreamExt;
use paychat_settle::{BalanceGate, BalanceOracle, FundsCheck};
use paychat_types::{
    AccountRef, ChatStatus, Message, MessageId, MessageIdGenerator, PaymentInfo, Role,
    TokenAmount, DEFAULT_PRICE, DEFAULT_TOKEN_SYMBOL, USDC_DECIMALS,
};
use paychat_x402::{PaymentFetcher, RequestSpec};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::decoder::{decode_stream, DeltaStream};
use crate::error::{ChatError, ChatResult};
use crate::session::Session;

/// Default path of the chat endpoint.
pub const DEFAULT_CHAT_PATH: &str = "/api/chat";

/// Settings for a conversation.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Price of one message; also the balance threshold.
    pub price: TokenAmount,
    /// Token symbol used in balance messages.
    pub token_symbol: String,
    /// Path of the chat endpoint.
    pub chat_path: String,
}

impl ChatConfig {
    /// Create a config with the given price.
    pub fn new(price: TokenAmount) -> ChatResult<Self> {
        if price.is_zero() {
            return Err(ChatError::config("price must be greater than zero"));
        }
        Ok(Self {
            price,
            token_symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
        })
    }

    /// Set the token symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.token_symbol = symbol.into();
        self
    }

    /// Set the chat endpoint path.
    pub fn with_chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = path.into();
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            price: TokenAmount::parse(DEFAULT_PRICE, USDC_DECIMALS)
                .unwrap_or_else(|_| TokenAmount::from_units(100_000, USDC_DECIMALS)),
            token_symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
        }
    }
}

/// An opaque attachment supplied with a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name.
    pub name: String,
    /// MIME type, if known.
    pub media_type: Option<String>,
    /// Raw content.
    pub data: Vec<u8>,
}

/// What the caller submits for one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    /// Prompt text.
    pub text: String,
    /// Attachments. They make a submission non-empty but are not sent.
    pub files: Vec<Attachment>,
}

impl Submission {
    /// A text-only submission.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            files: Vec::new(),
        }
    }

    /// Whether there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.files.is_empty()
    }
}

/// Everything an observer can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    /// Transcript in insertion order.
    pub messages: Vec<Message>,
    /// Caller-visible status.
    pub status: ChatStatus,
    /// Message of the last failed turn, cleared when a turn is accepted.
    pub error: Option<String>,
    /// Payment projection for the current turn.
    pub payment_info: PaymentInfo,
}

impl ChatState {
    fn new(price: &TokenAmount) -> Self {
        Self {
            messages: Vec::new(),
            status: ChatStatus::Idle,
            error: None,
            payment_info: PaymentInfo::idle(price),
        }
    }

    /// The most recent assistant message.
    pub fn last_reply(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
    }
}

/// Internal turn phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No turn in flight.
    #[default]
    Idle,
    /// Preconditions are being checked.
    Submitting,
    /// The user message is in the transcript and the reply is streaming.
    Active,
    /// The last turn failed.
    Errored,
}

impl Phase {
    /// Whether a turn is in flight.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Submitting | Self::Active)
    }
}

/// Holds the single-flight slot for one turn.
///
/// Dropping the guard while the turn is still in flight (the submit future
/// was cancelled) frees the slot and publishes the turn as failed.
struct TurnGuard<'a> {
    conversation: &'a Conversation,
}

impl TurnGuard<'_> {
    fn set(&self, phase: Phase) {
        *lock(&self.conversation.phase) = phase;
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        let cancelled = {
            let mut phase = lock(&self.conversation.phase);
            let in_flight = phase.is_in_flight();
            if in_flight {
                *phase = Phase::Errored;
            }
            in_flight
        };
        if cancelled {
            warn!("Turn cancelled before completion");
            self.conversation.publish_failure(&ChatError::TurnCancelled);
        }
    }
}

fn lock(phase: &Mutex<Phase>) -> MutexGuard<'_, Phase> {
    phase.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Message],
}

/// A payment-gated streaming conversation.
pub struct Conversation {
    config: ChatConfig,
    session: Arc<Session>,
    gate: BalanceGate,
    fetcher: Arc<dyn PaymentFetcher>,
    ids: MessageIdGenerator,
    phase: Mutex<Phase>,
    state: watch::Sender<ChatState>,
}

impl Conversation {
    /// Create a conversation.
    pub fn new(
        config: ChatConfig,
        session: Arc<Session>,
        oracle: Arc<dyn BalanceOracle>,
        fetcher: Arc<dyn PaymentFetcher>,
    ) -> Self {
        let (state, _) = watch::channel(ChatState::new(&config.price));
        Self {
            config,
            session,
            gate: BalanceGate::new(oracle),
            fetcher,
            ids: MessageIdGenerator::new(),
            phase: Mutex::new(Phase::Idle),
            state,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Get the wallet session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Current turn phase.
    pub fn phase(&self) -> Phase {
        *lock(&self.phase)
    }

    /// Snapshot of the observable state.
    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    /// Watch the observable state.
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    /// Run one turn: check funds, send the transcript, stream the reply.
    ///
    /// Returns immediately with `Ok(())` for an empty submission, and with
    /// [`ChatError::TurnInFlight`] while another turn is running; neither
    /// touches the observable state. Any other error has already been
    /// published as the state's `error` when it is returned.
    pub async fn submit(&self, submission: Submission) -> ChatResult<()> {
        if submission.is_empty() {
            debug!("Ignoring empty submission");
            return Ok(());
        }

        let turn = self.begin_turn()?;
        match self.run_turn(submission, &turn).await {
            Ok(()) => {
                turn.set(Phase::Idle);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Turn failed");
                turn.set(Phase::Errored);
                self.publish_failure(&e);
                Err(e)
            }
        }
    }

    fn begin_turn(&self) -> ChatResult<TurnGuard<'_>> {
        let mut phase = lock(&self.phase);
        if phase.is_in_flight() {
            return Err(ChatError::TurnInFlight);
        }
        *phase = Phase::Submitting;
        Ok(TurnGuard { conversation: self })
    }

    fn publish_failure(&self, error: &ChatError) {
        self.update(|state| {
            state.error = Some(error.to_string());
            state.status = ChatStatus::Error;
            state.payment_info = PaymentInfo::idle(&self.config.price);
        });
    }

    async fn run_turn(&self, submission: Submission, turn: &TurnGuard<'_>) -> ChatResult<()> {
        let account = self.session.paying_account()?;
        self.ensure_funds(&account).await?;

        if !submission.files.is_empty() {
            debug!(count = submission.files.len(), "Attachments are not transmitted");
        }
        let user = Message::user(self.ids.next_id(), submission.text);
        let history = self.update(|state| {
            state.status = ChatStatus::Loading;
            state.error = None;
            state.payment_info = PaymentInfo::processing(&self.config.price);
            state.messages.push(user);
            state.messages.clone()
        });
        turn.set(Phase::Active);

        let body = serde_json::to_value(ChatRequest { messages: &history })
            .map_err(|e| ChatError::config(format!("failed to encode request: {}", e)))?;
        let response = self
            .fetcher
            .send(RequestSpec::post_json(&self.config.chat_path, body))
            .await?;

        if !response.status.is_success() {
            let status = response.status.as_u16();
            let body = response.text().await?;
            return Err(ChatError::HttpError { status, body });
        }

        let tx_signature = match response.receipt()? {
            Some(receipt) => {
                let signature = receipt.transaction_id().map(str::to_owned);
                if receipt.success {
                    info!(tx = ?signature, "Payment settled");
                } else {
                    let declined = ChatError::PaymentDeclined {
                        reason: receipt.error_reason.clone(),
                    };
                    warn!(error = %declined, "Continuing without a settled payment");
                }
                self.update(|state| {
                    state.payment_info =
                        PaymentInfo::settled(&self.config.price, receipt.success, signature.clone());
                });
                signature
            }
            None => None,
        };

        self.stream_reply(decode_stream(response.body), tx_signature)
            .await
    }

    async fn ensure_funds(&self, account: &AccountRef) -> ChatResult<()> {
        match self.gate.check_funds(account, &self.config.price).await {
            FundsCheck::Sufficient { .. } => Ok(()),
            FundsCheck::Insufficient {
                required,
                available,
            } => Err(ChatError::InsufficientFunds {
                symbol: self.config.token_symbol.clone(),
                required,
                available,
            }),
            FundsCheck::ProbeFailed { reason } => Err(ChatError::BalanceProbeFailed {
                symbol: self.config.token_symbol.clone(),
                reason,
            }),
        }
    }

    async fn stream_reply(
        &self,
        mut deltas: DeltaStream,
        tx_signature: Option<String>,
    ) -> ChatResult<()> {
        let reply_id = self.ids.next_id();
        let mut text = String::new();
        let mut started = false;

        while let Some(delta) = deltas.next().await {
            text.push_str(&delta?);
            if started {
                self.update(|state| replace_reply(state, &reply_id, &text, &tx_signature));
            } else {
                let reply = Message::assistant(reply_id.clone(), text.clone(), tx_signature.clone());
                self.update(|state| {
                    state.messages.push(reply);
                    state.status = ChatStatus::Idle;
                });
                started = true;
            }
        }

        if started {
            debug!(chars = text.chars().count(), "Reply complete");
        } else {
            debug!("Stream ended without reply text");
            self.update(|state| state.status = ChatStatus::Idle);
        }
        Ok(())
    }

    fn update<R>(&self, f: impl FnOnce(&mut ChatState) -> R) -> R {
        let mut next = self.state.borrow().clone();
        let out = f(&mut next);
        self.state.send_replace(next);
        out
    }
}

fn replace_reply(state: &mut ChatState, id: &MessageId, text: &str, tx: &Option<String>) {
    if let Some(reply) = state.messages.iter_mut().rev().find(|m| &m.id == id) {
        reply.set_text(text);
        reply.tx_signature = tx.clone();
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}
