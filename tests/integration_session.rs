//! Loom session integration tests
//!
//! Drives full sessions against a scripted mock client and asserts the
//! event stream a consumer would observe: ordering, slot positions,
//! append-only growth, and the round-3 naming milestone.

use std::sync::Arc;
use std::time::Duration;

use selfloom::llm::{LlmError, MockClient, NO_TOKEN_MARKER};
use selfloom::loom::{
    event_channel, LoomEvent, LoomOutcome, LoomSession, SessionParams, DEFAULT_SEED_TEXT,
};

fn params(count: usize) -> SessionParams {
    SessionParams {
        candidate_count: count,
        pacing: Duration::ZERO,
        max_retries: 2,
        ..SessionParams::default()
    }
}

/// Receive events until one matches the predicate, returning it.
async fn recv_until<F>(
    rx: &mut tokio::sync::mpsc::Receiver<LoomEvent>,
    mut pred: F,
) -> LoomEvent
where
    F: FnMut(&LoomEvent) -> bool,
{
    loop {
        let event = rx.recv().await.expect("stream ended early");
        if pred(&event) {
            return event;
        }
    }
}

/// A full first round emits every event in the documented order, with
/// completion slots resolving positionally.
#[tokio::test]
async fn test_first_round_event_order() {
    let mock = Arc::new(
        MockClient::new()
            .with_completions(vec![
                Ok(" alpha".to_string()),
                Ok(" beta".to_string()),
                Ok(" gamma".to_string()),
            ])
            .with_chats(vec![Ok("2".to_string())]),
    );
    let (emitter, mut rx) = event_channel(64);
    let session = LoomSession::new(mock, params(3), emitter);
    let handle = tokio::spawn(session.run());

    assert_eq!(
        rx.recv().await.unwrap(),
        LoomEvent::Init {
            text: DEFAULT_SEED_TEXT.to_string()
        }
    );
    assert_eq!(
        rx.recv().await.unwrap(),
        LoomEvent::IterationStart { iteration: 1 }
    );
    for index in 1..=3 {
        assert_eq!(rx.recv().await.unwrap(), LoomEvent::CompletionStart { index });
    }
    assert_eq!(
        rx.recv().await.unwrap(),
        LoomEvent::CompletionDone {
            index: 1,
            text: " alpha".to_string()
        }
    );
    assert_eq!(
        rx.recv().await.unwrap(),
        LoomEvent::CompletionDone {
            index: 2,
            text: " beta".to_string()
        }
    );
    assert_eq!(
        rx.recv().await.unwrap(),
        LoomEvent::CompletionDone {
            index: 3,
            text: " gamma".to_string()
        }
    );
    assert_eq!(rx.recv().await.unwrap(), LoomEvent::GradingStart);
    assert_eq!(
        rx.recv().await.unwrap(),
        LoomEvent::GradingDone {
            chosen_index: 2,
            chosen_text: " beta".to_string()
        }
    );
    assert_eq!(
        rx.recv().await.unwrap(),
        LoomEvent::TextUpdated {
            full_text: format!("{} beta", DEFAULT_SEED_TEXT)
        }
    );

    drop(rx);
    assert_eq!(handle.await.unwrap().unwrap(), LoomOutcome::Disconnected);
}

/// Completion slots resolve to their dispatch position even when the first
/// slot finishes last.
#[tokio::test(start_paused = true)]
async fn test_slot_order_survives_uneven_latency() {
    let mock = Arc::new(
        MockClient::new()
            .with_completions(vec![
                Ok(" slow first".to_string()),
                Ok(" fast second".to_string()),
            ])
            .with_completion_delays(vec![
                Duration::from_millis(500),
                Duration::from_millis(10),
            ])
            .with_chats(vec![Ok("1".to_string())]),
    );
    let (emitter, mut rx) = event_channel(64);
    let session = LoomSession::new(mock, params(2), emitter);
    let handle = tokio::spawn(session.run());

    let done1 = recv_until(&mut rx, |e| matches!(e, LoomEvent::CompletionDone { .. })).await;
    assert_eq!(
        done1,
        LoomEvent::CompletionDone {
            index: 1,
            text: " slow first".to_string()
        }
    );
    let done2 = rx.recv().await.unwrap();
    assert_eq!(
        done2,
        LoomEvent::CompletionDone {
            index: 2,
            text: " fast second".to_string()
        }
    );

    drop(rx);
    handle.await.unwrap().unwrap();
}

/// The document only ever grows: each text_updated payload is a strict
/// prefix of the next.
#[tokio::test]
async fn test_document_is_append_only() {
    let mock = Arc::new(
        MockClient::new()
            .with_completions(vec![
                Ok(" one".to_string()),
                Ok(" two".to_string()),
                Ok(" three".to_string()),
                Ok(" four".to_string()),
            ])
            .with_chats(vec![Ok("1".to_string()), Ok("2".to_string())]),
    );
    let (emitter, mut rx) = event_channel(64);
    let session = LoomSession::new(mock, params(2), emitter);
    let handle = tokio::spawn(session.run());

    let mut texts = Vec::new();
    while texts.len() < 2 {
        if let LoomEvent::TextUpdated { full_text } = rx.recv().await.unwrap() {
            texts.push(full_text);
        }
    }

    assert_eq!(texts[0], format!("{} one", DEFAULT_SEED_TEXT));
    assert_eq!(texts[1], format!("{} one four", DEFAULT_SEED_TEXT));
    assert!(texts[1].starts_with(&texts[0]));
    assert!(texts[1].len() > texts[0].len());

    drop(rx);
    handle.await.unwrap().unwrap();
}

/// A round where every candidate fails still appends something - the
/// judge picks among failure markers and the loop reaches round 2.
#[tokio::test]
async fn test_all_failed_round_appends_marker_and_continues() {
    let mock = Arc::new(
        MockClient::new()
            .with_completions(vec![
                Err(LlmError::Auth { status: 401 }),
                Err(LlmError::Auth { status: 403 }),
            ])
            .with_chats(vec![Ok("1".to_string())]),
    );
    let (emitter, mut rx) = event_channel(64);
    let session = LoomSession::new(mock, params(2), emitter);
    let handle = tokio::spawn(session.run());

    let updated = recv_until(&mut rx, |e| matches!(e, LoomEvent::TextUpdated { .. })).await;
    if let LoomEvent::TextUpdated { full_text } = updated {
        assert!(full_text.starts_with(DEFAULT_SEED_TEXT));
        assert!(full_text.contains("[Completion failed after"));
    }

    // The loop keeps going on mock fallbacks.
    recv_until(&mut rx, |e| {
        matches!(e, LoomEvent::IterationStart { iteration: 2 })
    })
    .await;

    drop(rx);
    assert_eq!(handle.await.unwrap().unwrap(), LoomOutcome::Disconnected);
}

/// With no credential configured every slot resolves to the no-token
/// marker without a single network call, and the judge falls back to a
/// random in-range pick.
#[tokio::test]
async fn test_no_credential_round() {
    let mock = Arc::new(MockClient::new().not_ready());
    let (emitter, mut rx) = event_channel(64);
    let session = LoomSession::new(Arc::clone(&mock), params(3), emitter);
    let handle = tokio::spawn(session.run());

    for expected_index in 1..=3 {
        let done = recv_until(&mut rx, |e| matches!(e, LoomEvent::CompletionDone { .. })).await;
        assert_eq!(
            done,
            LoomEvent::CompletionDone {
                index: expected_index,
                text: NO_TOKEN_MARKER.to_string()
            }
        );
    }

    let graded = recv_until(&mut rx, |e| matches!(e, LoomEvent::GradingDone { .. })).await;
    if let LoomEvent::GradingDone { chosen_index, chosen_text } = graded {
        assert!((1..=3).contains(&chosen_index));
        assert_eq!(chosen_text, NO_TOKEN_MARKER);
    }

    drop(rx);
    handle.await.unwrap().unwrap();
    assert_eq!(mock.completion_calls(), 0);
    assert_eq!(mock.chat_calls(), 0);
}

/// The naming milestone fires exactly once, after round 3's append and
/// before round 4 begins.
#[tokio::test]
async fn test_document_named_at_round_three_only() {
    let mock = Arc::new(
        MockClient::new()
            .with_completions(vec![
                // rounds 1-3 generation (2 slots each)
                Ok(" a".to_string()),
                Ok(" b".to_string()),
                Ok(" c".to_string()),
                Ok(" d".to_string()),
                Ok(" e".to_string()),
                Ok(" f".to_string()),
                // round-3 naming call
                Ok("\"The Vanishing Hour\"".to_string()),
            ])
            .with_chats(vec![
                Ok("1".to_string()),
                Ok("1".to_string()),
                Ok("1".to_string()),
                Ok("1".to_string()),
            ]),
    );
    let (emitter, mut rx) = event_channel(64);
    let session = LoomSession::new(mock, params(2), emitter);
    let handle = tokio::spawn(session.run());

    let mut named = Vec::new();
    loop {
        match rx.recv().await.unwrap() {
            LoomEvent::DocumentNamed { name } => named.push(name),
            LoomEvent::IterationStart { iteration: 4 } => break,
            LoomEvent::IterationStart { iteration } if iteration < 3 => {
                assert!(named.is_empty(), "named before round 3");
            }
            _ => {}
        }
    }

    assert_eq!(named, vec!["The Vanishing Hour".to_string()]);

    drop(rx);
    handle.await.unwrap().unwrap();
}

/// A naming failure is swallowed: no document_named event, no session end.
#[tokio::test]
async fn test_naming_failure_is_best_effort() {
    let mock = Arc::new(
        MockClient::new().with_completions(vec![
            Ok(" a".to_string()),
            Ok(" b".to_string()),
            Ok(" c".to_string()),
            Ok(" d".to_string()),
            Ok(" e".to_string()),
            Ok(" f".to_string()),
            // round-3 naming call fails; no retry for this milestone
            Err(LlmError::Api {
                status: 500,
                message: "boom".to_string(),
            }),
        ]),
    );
    let (emitter, mut rx) = event_channel(64);
    let session = LoomSession::new(mock, params(2), emitter);
    let handle = tokio::spawn(session.run());

    loop {
        match rx.recv().await.unwrap() {
            LoomEvent::DocumentNamed { .. } => panic!("naming should have failed"),
            LoomEvent::IterationStart { iteration: 4 } => break,
            _ => {}
        }
    }

    drop(rx);
    assert_eq!(handle.await.unwrap().unwrap(), LoomOutcome::Disconnected);
}

/// Dropping the receiver mid-stream ends the session as a disconnect, not
/// an error.
#[tokio::test]
async fn test_disconnect_mid_round() {
    let mock = Arc::new(MockClient::new());
    let (emitter, mut rx) = event_channel(64);
    let session = LoomSession::new(mock, params(2), emitter);
    let handle = tokio::spawn(session.run());

    recv_until(&mut rx, |e| matches!(e, LoomEvent::GradingStart)).await;
    drop(rx);

    assert_eq!(handle.await.unwrap().unwrap(), LoomOutcome::Disconnected);
}

/// SSE frames coming off the channel are well-formed and keyed by type.
#[tokio::test]
async fn test_event_stream_sse_frames() {
    let mock = Arc::new(MockClient::new().with_chats(vec![Ok("1".to_string())]));
    let (emitter, mut rx) = event_channel(64);
    let session = LoomSession::new(mock, params(2), emitter);
    let handle = tokio::spawn(session.run());

    let init = rx.recv().await.unwrap();
    let frame = init.to_sse().unwrap();
    assert!(frame.starts_with("data: {"));
    assert!(frame.ends_with("\n\n"));
    let json: serde_json::Value =
        serde_json::from_str(frame.trim_start_matches("data: ").trim()).unwrap();
    assert_eq!(json["type"], "init");

    drop(rx);
    handle.await.unwrap().unwrap();
}
