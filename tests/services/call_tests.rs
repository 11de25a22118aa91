//! Call Lifecycle Tests

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use test_case::test_case;

use chat_coordinator::application::dto::SignalPayload;
use chat_coordinator::domain::{CallStatus, CallType};
use chat_coordinator::shared::error::AppError;

use crate::common::TestContext;

#[tokio::test]
async fn test_start_notifies_caller_and_recipient() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let alice_conn = ctx.connect(&alice.id).await;
    let bob_conn = ctx.connect(&bob.id).await;
    ctx.transport.clear();

    let call = ctx
        .services
        .calls
        .start(&alice.id, &bob.id, CallType::Video)
        .await
        .unwrap();

    assert_eq!(call.status, CallStatus::Pending);
    assert_eq!(call.caller_id(), alice.id);
    assert_eq!(call.recipient_id(), bob.id);
    assert_eq!(ctx.transport.names_for(&alice_conn), vec!["call-outgoing".to_string()]);
    assert_eq!(ctx.transport.names_for(&bob_conn), vec!["call-incoming".to_string()]);
}

#[tokio::test]
async fn test_calling_yourself_or_a_stranger_fails() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;

    let err = ctx
        .services
        .calls
        .start(&alice.id, &alice.id, CallType::Voice)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = ctx
        .services
        .calls
        .start(&alice.id, "ghost", CallType::Voice)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_busy_recipient_records_a_declined_call() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let carol = ctx.user().await;
    ctx.services
        .calls
        .start(&alice.id, &bob.id, CallType::Voice)
        .await
        .unwrap();
    let bob_conn = ctx.connect(&bob.id).await;
    ctx.transport.clear();

    let err = ctx
        .services
        .calls
        .start(&carol.id, &bob.id, CallType::Voice)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(ref m) if m == "Line busy"));
    let log = ctx.services.calls.call_log(&carol.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, CallStatus::Declined);
    assert!(ctx.transport.events_for(&bob_conn).is_empty());
}

#[tokio::test]
async fn test_busy_caller_cannot_start_a_second_call() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let carol = ctx.user().await;
    ctx.services
        .calls
        .start(&alice.id, &bob.id, CallType::Voice)
        .await
        .unwrap();

    let err = ctx
        .services
        .calls
        .start(&alice.id, &carol.id, CallType::Voice)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_accept_then_end_records_duration() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let call = ctx
        .services
        .calls
        .start(&alice.id, &bob.id, CallType::Voice)
        .await
        .unwrap();
    let alice_conn = ctx.connect(&alice.id).await;
    ctx.transport.clear();

    let accepted = ctx.services.calls.accept(&bob.id, &call.id).await.unwrap();
    assert_eq!(accepted.status, CallStatus::Ongoing);

    let err = ctx.services.calls.accept(&bob.id, &call.id).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let started_at = Utc::now() - Duration::seconds(42);
    let ended = ctx
        .services
        .calls
        .end(&alice.id, &call.id, CallStatus::Accepted, Some(started_at))
        .await
        .unwrap();

    assert_eq!(ended.status, CallStatus::Accepted);
    let duration = ended.duration_secs.unwrap();
    assert!((42..=44).contains(&duration));
    assert_eq!(
        ctx.transport.names_for(&alice_conn),
        vec!["call-accepted".to_string(), "call-ended".to_string()]
    );

    // The line is free again
    ctx.services
        .calls
        .start(&bob.id, &alice.id, CallType::Video)
        .await
        .unwrap();
}

#[test_case(CallStatus::Declined ; "declined")]
#[test_case(CallStatus::Canceled ; "canceled")]
#[test_case(CallStatus::Missed ; "missed")]
#[tokio::test]
async fn test_pending_call_ends_without_answer(status: CallStatus) {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let call = ctx
        .services
        .calls
        .start(&alice.id, &bob.id, CallType::Voice)
        .await
        .unwrap();

    let ended = ctx.services.calls.end(&bob.id, &call.id, status, None).await.unwrap();

    assert_eq!(ended.status, status);
    assert!(ended.duration_secs.is_none());

    let err = ctx
        .services
        .calls
        .end(&bob.id, &call.id, CallStatus::Missed, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_pending_call_cannot_end_as_accepted() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let call = ctx
        .services
        .calls
        .start(&alice.id, &bob.id, CallType::Voice)
        .await
        .unwrap();

    let err = ctx
        .services
        .calls
        .end(&alice.id, &call.id, CallStatus::Accepted, None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_outsider_cannot_touch_a_call() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let mallory = ctx.user().await;
    let call = ctx
        .services
        .calls
        .start(&alice.id, &bob.id, CallType::Voice)
        .await
        .unwrap();

    let err = ctx.services.calls.accept(&mallory.id, &call.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = ctx.services.calls.accept(&mallory.id, "missing").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_hides_call_from_one_log_only() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let call = ctx
        .services
        .calls
        .start(&alice.id, &bob.id, CallType::Voice)
        .await
        .unwrap();
    ctx.services
        .calls
        .end(&alice.id, &call.id, CallStatus::Canceled, None)
        .await
        .unwrap();
    let alice_conn = ctx.connect(&alice.id).await;
    ctx.transport.clear();

    ctx.services.calls.delete(&alice.id, &call.id).await.unwrap();

    assert!(ctx.services.calls.call_log(&alice.id).await.unwrap().is_empty());
    assert_eq!(ctx.services.calls.call_log(&bob.id).await.unwrap().len(), 1);
    assert_eq!(ctx.transport.names_for(&alice_conn), vec!["call-deleted".to_string()]);

    let err = ctx.services.calls.delete(&alice.id, &call.id).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_signal_is_relayed_to_the_other_participant() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let call = ctx
        .services
        .calls
        .start(&alice.id, &bob.id, CallType::Video)
        .await
        .unwrap();
    let alice_conn = ctx.connect(&alice.id).await;
    let bob_phone = ctx.connect(&bob.id).await;
    let bob_laptop = ctx.connect(&bob.id).await;
    ctx.transport.clear();

    let outcome = ctx
        .services
        .calls
        .relay_signal(
            &alice.id,
            &call.id,
            SignalPayload::Offer {
                sdp: "v=0".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.delivered, 2);
    for conn in [&bob_phone, &bob_laptop] {
        let events = ctx.transport.events_for(conn);
        assert_eq!(events[0].event, "signal-relayed");
        assert_eq!(events[0].payload["from_user_id"], alice.id.as_str());
        assert_eq!(events[0].payload["signal"]["type"], "offer");
    }
    assert!(ctx.transport.events_for(&alice_conn).is_empty());
}

#[tokio::test]
async fn test_call_log_is_in_creation_order() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        let call = ctx
            .services
            .calls
            .start(&alice.id, &bob.id, CallType::Voice)
            .await
            .unwrap();
        ctx.services
            .calls
            .end(&bob.id, &call.id, CallStatus::Declined, None)
            .await
            .unwrap();
        ids.push(call.id);
    }

    let log: Vec<String> = ctx
        .services
        .calls
        .call_log(&bob.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(log, ids);
}
