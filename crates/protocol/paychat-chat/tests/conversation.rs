//! Integration tests for the conversation state machine.
//!
//! Drives full turns against a mock balance oracle and a mock fetcher with
//! scripted, chunked reply bodies.

use std::sync::Arc;

use paychat_chat::{ChatConfig, ChatError, ChatState, Conversation, Phase, Session, Submission};
use paychat_test_utils::{
    delta_body, paid_reply, receipt_header, test_signer, text_delta_line, usdc, Chunk,
    MockBalanceOracle, MockFetcher, ScriptedResponse,
};
use paychat_types::{AccountRef, ChatStatus, PaymentStatus, Role};
use paychat_x402::Method;
use tokio::sync::Notify;

const WALLET: &str = "wallet1";

fn paying_session() -> Arc<Session> {
    Arc::new(Session::with_wallet(
        AccountRef::new(WALLET),
        test_signer(WALLET),
    ))
}

fn conversation_with(
    session: Arc<Session>,
    oracle: &MockBalanceOracle,
    fetcher: &MockFetcher,
) -> Arc<Conversation> {
    Arc::new(Conversation::new(
        ChatConfig::default(),
        session,
        Arc::new(oracle.clone()),
        Arc::new(fetcher.clone()),
    ))
}

fn conversation(oracle: &MockBalanceOracle, fetcher: &MockFetcher) -> Arc<Conversation> {
    conversation_with(paying_session(), oracle, fetcher)
}

fn texts(state: &ChatState) -> Vec<(Role, String)> {
    state.messages.iter().map(|m| (m.role, m.text())).collect()
}

// =============================================================================
// Successful Turns
// =============================================================================

#[tokio::test]
async fn test_successful_turn() {
    let oracle = MockBalanceOracle::new();
    let fetcher = MockFetcher::new().with_response(paid_reply(&["Hel", "lo"], "abc123"));
    let chat = conversation(&oracle, &fetcher);

    chat.submit(Submission::text("hi")).await.unwrap();

    let state = chat.snapshot();
    assert_eq!(
        texts(&state),
        vec![
            (Role::User, "hi".to_string()),
            (Role::Assistant, "Hello".to_string())
        ]
    );
    assert_eq!(state.status, ChatStatus::Idle);
    assert_eq!(state.error, None);
    assert_eq!(state.payment_info.status, Some(PaymentStatus::Completed));
    assert_eq!(state.payment_info.signature.as_deref(), Some("abc123"));
    assert_eq!(state.payment_info.amount, "$0.1");
    assert_eq!(
        state.messages[1].tx_signature.as_deref(),
        Some("abc123")
    );
    assert_eq!(chat.phase(), Phase::Idle);

    let user_id: u64 = state.messages[0].id.as_str().parse().unwrap();
    let reply_id: u64 = state.messages[1].id.as_str().parse().unwrap();
    assert!(reply_id > user_id);

    assert_eq!(oracle.queries(), vec![AccountRef::new(WALLET)]);
    let requests = fetcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[0].path, "/api/chat");

    let body = fetcher.last_body().unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["parts"][0]["type"], "text");
    assert_eq!(messages[0]["parts"][0]["text"], "hi");
}

#[tokio::test]
async fn test_reply_split_mid_line() {
    let body = delta_body(&["Hel", "lo", " world"]);
    let (a, rest) = body.split_at(10);
    let (b, c) = rest.split_at(37);
    let fetcher = MockFetcher::new().with_response(ScriptedResponse::ok(vec![
        Chunk::text(a),
        Chunk::text(b),
        Chunk::text(c),
    ]));
    let chat = conversation(&MockBalanceOracle::new(), &fetcher);

    chat.submit(Submission::text("hi")).await.unwrap();

    let state = chat.snapshot();
    assert_eq!(state.last_reply().unwrap().text(), "Hello world");
    // No receipt: the payment stays in processing and the reply is unsigned.
    assert_eq!(state.payment_info.status, Some(PaymentStatus::Processing));
    assert_eq!(state.last_reply().unwrap().tx_signature, None);
}

#[tokio::test]
async fn test_same_deltas_give_same_reply() {
    let deltas = ["Hé", "llo, ", "wörld", ""];
    let mut replies = Vec::new();
    for _ in 0..2 {
        let fetcher = MockFetcher::new().with_response(paid_reply(&deltas, "tx1"));
        let chat = conversation(&MockBalanceOracle::new(), &fetcher);
        chat.submit(Submission::text("hi")).await.unwrap();
        replies.push(chat.snapshot().last_reply().unwrap().text());
    }
    assert_eq!(replies[0], "Héllo, wörld");
    assert_eq!(replies[0].as_bytes(), replies[1].as_bytes());
}

#[tokio::test]
async fn test_transcript_is_resent_each_turn() {
    let fetcher = MockFetcher::new()
        .with_response(paid_reply(&["first"], "tx1"))
        .with_response(paid_reply(&["second"], "tx2"));
    let chat = conversation(&MockBalanceOracle::new(), &fetcher);

    chat.submit(Submission::text("one")).await.unwrap();
    chat.submit(Submission::text("two")).await.unwrap();

    let body = fetcher.last_body().unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["txSignature"], "tx1");
    assert_eq!(messages[2]["parts"][0]["text"], "two");

    let state = chat.snapshot();
    assert_eq!(state.messages.len(), 4);
    assert_eq!(state.last_reply().unwrap().text(), "second");
    assert_eq!(state.payment_info.signature.as_deref(), Some("tx2"));
}

#[tokio::test]
async fn test_status_sequence() {
    let first = Arc::new(Notify::new());
    let second = Arc::new(Notify::new());
    let fetcher = MockFetcher::new().with_response(
        ScriptedResponse::ok(vec![
            Chunk::Wait(first.clone()),
            Chunk::text(&text_delta_line("Hel")),
            Chunk::Wait(second.clone()),
            Chunk::text(&text_delta_line("lo")),
        ])
        .with_receipt_header(&receipt_header(true, Some("abc123"))),
    );
    let chat = conversation(&MockBalanceOracle::new(), &fetcher);
    let mut rx = chat.subscribe();

    let task = tokio::spawn({
        let chat = chat.clone();
        async move { chat.submit(Submission::text("hi")).await }
    });

    {
        let state = rx.wait_for(|s| s.status == ChatStatus::Loading).await.unwrap();
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.error, None);
    }
    assert_eq!(chat.phase(), Phase::Active);

    first.notify_one();
    {
        let state = rx.wait_for(|s| s.messages.len() == 2).await.unwrap();
        assert_eq!(state.status, ChatStatus::Idle);
        assert_eq!(state.messages[1].text(), "Hel");
        assert_eq!(state.messages[1].tx_signature.as_deref(), Some("abc123"));
    }

    second.notify_one();
    task.await.unwrap().unwrap();

    let state = chat.snapshot();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[1].text(), "Hello");
    assert_eq!(state.status, ChatStatus::Idle);
}

#[tokio::test]
async fn test_declined_payment_still_streams() {
    let fetcher = MockFetcher::new().with_response(
        ScriptedResponse::ok(vec![Chunk::text(&delta_body(&["free ", "answer"]))])
            .with_receipt_header(&receipt_header(false, Some("tx9"))),
    );
    let chat = conversation(&MockBalanceOracle::new(), &fetcher);

    chat.submit(Submission::text("hi")).await.unwrap();

    let state = chat.snapshot();
    assert_eq!(state.payment_info.status, Some(PaymentStatus::Error));
    assert_eq!(state.payment_info.signature.as_deref(), Some("tx9"));
    assert_eq!(state.status, ChatStatus::Idle);
    assert_eq!(state.error, None);
    let reply = state.last_reply().unwrap();
    assert_eq!(reply.text(), "free answer");
    assert_eq!(reply.tx_signature.as_deref(), Some("tx9"));
}

#[tokio::test]
async fn test_stream_without_deltas() {
    let fetcher = MockFetcher::new().with_response(ScriptedResponse::ok(vec![Chunk::text(
        "data: {\"type\":\"start\"}\ndata: [DONE]\n",
    )]));
    let chat = conversation(&MockBalanceOracle::new(), &fetcher);

    chat.submit(Submission::text("hi")).await.unwrap();

    let state = chat.snapshot();
    assert_eq!(state.status, ChatStatus::Idle);
    assert_eq!(state.messages.len(), 1);
    assert!(state.last_reply().is_none());
    assert_eq!(chat.phase(), Phase::Idle);
}

// =============================================================================
// Preconditions
// =============================================================================

#[tokio::test]
async fn test_empty_submission_is_noop() {
    let oracle = MockBalanceOracle::new();
    let fetcher = MockFetcher::new();
    let chat = conversation(&oracle, &fetcher);
    let before = chat.snapshot();

    chat.submit(Submission::text("")).await.unwrap();
    chat.submit(Submission::text("  \n")).await.unwrap();

    assert_eq!(chat.snapshot(), before);
    assert_eq!(oracle.query_count(), 0);
    assert_eq!(fetcher.request_count(), 0);
}

#[tokio::test]
async fn test_insufficient_funds() {
    let oracle = MockBalanceOracle::new().with_balance(usdc("0.05"));
    let fetcher = MockFetcher::new();
    let chat = conversation(&oracle, &fetcher);

    let err = chat.submit(Submission::text("hi")).await.unwrap_err();
    assert!(matches!(err, ChatError::InsufficientFunds { .. }));

    let state = chat.snapshot();
    assert_eq!(
        state.error.as_deref(),
        Some("Insufficient USDC balance. Required: $0.10, Available: $0.05. Please transfer USDC to your local wallet.")
    );
    assert_eq!(state.status, ChatStatus::Error);
    assert_eq!(state.payment_info.status, None);
    assert!(state.messages.is_empty());
    assert_eq!(fetcher.request_count(), 0);
    assert_eq!(chat.phase(), Phase::Errored);
}

#[tokio::test]
async fn test_exact_balance_is_enough() {
    let oracle = MockBalanceOracle::new().with_balance(usdc("0.1"));
    let fetcher = MockFetcher::new().with_response(paid_reply(&["ok"], "tx1"));
    let chat = conversation(&oracle, &fetcher);

    chat.submit(Submission::text("hi")).await.unwrap();
    assert_eq!(fetcher.request_count(), 1);
}

#[tokio::test]
async fn test_balance_probe_failure() {
    let oracle = MockBalanceOracle::new().with_failure();
    let fetcher = MockFetcher::new();
    let chat = conversation(&oracle, &fetcher);

    let err = chat.submit(Submission::text("hi")).await.unwrap_err();
    assert!(matches!(err, ChatError::BalanceProbeFailed { .. }));

    let state = chat.snapshot();
    assert_eq!(
        state.error.as_deref(),
        Some("Failed to check USDC balance. Please ensure your local wallet has sufficient funds.")
    );
    assert_eq!(oracle.query_count(), 1);
    assert_eq!(fetcher.request_count(), 0);
}

#[tokio::test]
async fn test_wallet_unavailable() {
    let oracle = MockBalanceOracle::new();
    let fetcher = MockFetcher::new();
    let chat = conversation_with(Arc::new(Session::new()), &oracle, &fetcher);

    let err = chat.submit(Submission::text("hi")).await.unwrap_err();
    assert!(matches!(err, ChatError::WalletUnavailable));

    let state = chat.snapshot();
    assert_eq!(
        state.error.as_deref(),
        Some("Wallet not connected or signer not available")
    );
    assert_eq!(state.status, ChatStatus::Error);
    assert_eq!(oracle.query_count(), 0);
    assert_eq!(fetcher.request_count(), 0);
}

#[tokio::test]
async fn test_teardown_disables_payment() {
    let fetcher = MockFetcher::new().with_response(paid_reply(&["ok"], "tx1"));
    let chat = conversation(&MockBalanceOracle::new(), &fetcher);

    chat.session().teardown();
    let err = chat.submit(Submission::text("hi")).await.unwrap_err();
    assert!(matches!(err, ChatError::WalletUnavailable));
    assert_eq!(fetcher.request_count(), 0);
}

#[tokio::test]
async fn test_second_submit_rejected_while_in_flight() {
    let release = Arc::new(Notify::new());
    let oracle = MockBalanceOracle::new();
    let fetcher = MockFetcher::new().with_response(ScriptedResponse::ok(vec![
        Chunk::Wait(release.clone()),
        Chunk::text(&text_delta_line("done")),
    ]));
    let chat = conversation(&oracle, &fetcher);
    let mut rx = chat.subscribe();

    let task = tokio::spawn({
        let chat = chat.clone();
        async move { chat.submit(Submission::text("first")).await }
    });
    rx.wait_for(|s| s.status == ChatStatus::Loading).await.unwrap();

    let before = chat.snapshot();
    let err = chat.submit(Submission::text("second")).await.unwrap_err();
    assert!(matches!(err, ChatError::TurnInFlight));
    assert_eq!(chat.snapshot(), before);
    assert_eq!(oracle.query_count(), 1);
    assert_eq!(fetcher.request_count(), 1);

    release.notify_one();
    task.await.unwrap().unwrap();

    let state = chat.snapshot();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[0].text(), "first");
    assert_eq!(state.messages[1].text(), "done");
}

#[tokio::test]
async fn test_aborted_turn_does_not_stay_loading() {
    let never = Arc::new(Notify::new());
    let fetcher = MockFetcher::new().with_response(ScriptedResponse::ok(vec![Chunk::Wait(
        never.clone(),
    )]));
    let chat = conversation(&MockBalanceOracle::new(), &fetcher);
    let mut rx = chat.subscribe();

    let task = tokio::spawn({
        let chat = chat.clone();
        async move { chat.submit(Submission::text("hi")).await }
    });
    rx.wait_for(|s| s.status == ChatStatus::Loading).await.unwrap();

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    let state = chat.snapshot();
    assert_eq!(chat.phase(), Phase::Errored);
    assert_eq!(state.status, ChatStatus::Error);
    assert_eq!(state.error.as_deref(), Some("Request was cancelled"));
    assert_eq!(state.payment_info.status, None);
    assert_eq!(state.payment_info.signature, None);
    assert_eq!(texts(&state), vec![(Role::User, "hi".to_string())]);

    fetcher.push_response(paid_reply(&["back"], "tx2"));
    chat.submit(Submission::text("again")).await.unwrap();
    let state = chat.snapshot();
    assert_eq!(state.status, ChatStatus::Idle);
    assert_eq!(state.error, None);
    assert_eq!(state.last_reply().unwrap().text(), "back");
}

// =============================================================================
// Failures After Acceptance
// =============================================================================

#[tokio::test]
async fn test_http_error() {
    let fetcher = MockFetcher::new().with_response(ScriptedResponse::status(500, "boom"));
    let chat = conversation(&MockBalanceOracle::new(), &fetcher);

    let err = chat.submit(Submission::text("hi")).await.unwrap_err();
    assert!(matches!(err, ChatError::HttpError { status: 500, .. }));

    let state = chat.snapshot();
    assert_eq!(
        state.error.as_deref(),
        Some("HTTP error! status: 500, message: boom")
    );
    assert_eq!(state.status, ChatStatus::Error);
    assert_eq!(state.payment_info.status, None);
    assert_eq!(texts(&state), vec![(Role::User, "hi".to_string())]);
}

#[tokio::test]
async fn test_http_error_body_read_failure() {
    let mut response = ScriptedResponse::status(502, "");
    response.chunks = vec![Chunk::text("bad "), Chunk::Fail("connection reset".into())];
    let fetcher = MockFetcher::new().with_response(response);
    let chat = conversation(&MockBalanceOracle::new(), &fetcher);

    let err = chat.submit(Submission::text("hi")).await.unwrap_err();
    assert!(matches!(err, ChatError::StreamReadFailure { .. }));

    let state = chat.snapshot();
    assert_eq!(state.error.as_deref(), Some("connection reset"));
    assert_eq!(state.status, ChatStatus::Error);
    assert_eq!(state.payment_info.status, None);
}

#[tokio::test]
async fn test_stream_failure_keeps_partial_reply() {
    let fetcher = MockFetcher::new().with_response(ScriptedResponse::ok(vec![
        Chunk::text(&text_delta_line("partial")),
        Chunk::Fail("connection reset".to_string()),
        Chunk::text(&text_delta_line(" never")),
    ]));
    let chat = conversation(&MockBalanceOracle::new(), &fetcher);

    let err = chat.submit(Submission::text("hi")).await.unwrap_err();
    assert!(matches!(err, ChatError::StreamReadFailure { .. }));

    let state = chat.snapshot();
    assert_eq!(state.error.as_deref(), Some("connection reset"));
    assert_eq!(state.status, ChatStatus::Error);
    assert_eq!(state.last_reply().unwrap().text(), "partial");
    assert_eq!(chat.phase(), Phase::Errored);
}

#[tokio::test]
async fn test_malformed_receipt_fails_turn() {
    let fetcher = MockFetcher::new().with_response(
        ScriptedResponse::ok(vec![Chunk::text(&delta_body(&["hidden"]))])
            .with_receipt_header("not-base64!!"),
    );
    let chat = conversation(&MockBalanceOracle::new(), &fetcher);

    let err = chat.submit(Submission::text("hi")).await.unwrap_err();
    assert!(matches!(err, ChatError::MalformedReceipt { .. }));

    let state = chat.snapshot();
    assert_eq!(state.status, ChatStatus::Error);
    assert!(state.last_reply().is_none());
}

#[tokio::test]
async fn test_transport_failure() {
    let fetcher = MockFetcher::new().with_send_error("connection refused");
    let chat = conversation(&MockBalanceOracle::new(), &fetcher);

    let err = chat.submit(Submission::text("hi")).await.unwrap_err();
    assert!(matches!(err, ChatError::Payment(_)));

    let state = chat.snapshot();
    assert_eq!(state.status, ChatStatus::Error);
    assert!(state.error.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_retry_after_error_clears_it() {
    let oracle = MockBalanceOracle::new().with_balance(usdc("0"));
    let fetcher = MockFetcher::new().with_response(paid_reply(&["recovered"], "tx2"));
    let chat = conversation(&oracle, &fetcher);

    assert!(chat.submit(Submission::text("hi")).await.is_err());
    assert_eq!(chat.phase(), Phase::Errored);

    oracle.set_balance(usdc("1"));
    chat.submit(Submission::text("hi again")).await.unwrap();

    let state = chat.snapshot();
    assert_eq!(state.error, None);
    assert_eq!(state.status, ChatStatus::Idle);
    assert_eq!(
        texts(&state),
        vec![
            (Role::User, "hi again".to_string()),
            (Role::Assistant, "recovered".to_string())
        ]
    );
}
