//! Message Ledger Tests

use pretty_assertions::assert_eq;

use chat_coordinator::application::services::NewGroup;
use chat_coordinator::domain::{ContentKind, DeleteScope, GroupRole, User};
use chat_coordinator::shared::error::AppError;

use crate::common::TestContext;

async fn open_chat(ctx: &TestContext, a: &User, b: &User) -> String {
    ctx.services
        .chats
        .get_or_create_individual(&a.id, &b.id)
        .await
        .unwrap()
        .chat
        .id
}

#[tokio::test]
async fn test_message_reaches_every_device_of_the_recipient_only() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let alice_phone = ctx.connect(&alice.id).await;
    let alice_laptop = ctx.connect(&alice.id).await;
    let bob_conn = ctx.connect(&bob.id).await;
    let chat_id = open_chat(&ctx, &bob, &alice).await;
    ctx.transport.clear();

    let outcome = ctx
        .services
        .messages
        .send(&bob.id, &chat_id, "hi", ContentKind::Text)
        .await
        .unwrap();

    assert_eq!(outcome.recipients.len(), 2);
    assert_eq!(outcome.message.sender_id(), Some(bob.id.as_str()));
    for conn in [&alice_phone, &alice_laptop] {
        let events = ctx.transport.events_for(conn);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "message-created");
        assert_eq!(events[0].payload["message"]["content"], "hi");
    }
    assert!(ctx.transport.events_for(&bob_conn).is_empty());
}

#[tokio::test]
async fn test_blank_message_is_rejected() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let chat_id = open_chat(&ctx, &alice, &bob).await;

    let err = ctx
        .services
        .messages
        .send(&alice.id, &chat_id, "   ", ContentKind::Text)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_outsider_cannot_post_or_read() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let mallory = ctx.user().await;
    let chat_id = open_chat(&ctx, &alice, &bob).await;

    let err = ctx
        .services
        .messages
        .send(&mallory.id, &chat_id, "hello", ContentKind::Text)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = ctx
        .services
        .messages
        .list_messages(&mallory.id, &chat_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_status_is_recorded_once_per_user() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let chat_id = open_chat(&ctx, &alice, &bob).await;
    let sent = ctx
        .services
        .messages
        .send(&alice.id, &chat_id, "ping", ContentKind::Text)
        .await
        .unwrap();
    let alice_conn = ctx.connect(&alice.id).await;
    ctx.transport.clear();

    let outcome = ctx
        .services
        .messages
        .mark_delivered(&bob.id, &chat_id, &sent.message.id)
        .await
        .unwrap();
    assert!(outcome.message.status.delivered.contains_key(&bob.id));
    assert_eq!(ctx.transport.names_for(&alice_conn), vec!["message-status-changed".to_string()]);

    let err = ctx
        .services
        .messages
        .mark_delivered(&bob.id, &chat_id, &sent.message.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Read does not depend on Delivered
    let outcome = ctx
        .services
        .messages
        .mark_read(&alice.id, &chat_id, &sent.message.id)
        .await
        .unwrap();
    assert!(outcome.message.status.read.contains_key(&alice.id));
    assert!(!outcome.message.status.delivered.contains_key(&alice.id));
}

#[tokio::test]
async fn test_mark_unknown_message_is_not_found() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let chat_id = open_chat(&ctx, &alice, &bob).await;

    let err = ctx
        .services
        .messages
        .mark_read(&bob.id, &chat_id, "missing")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_for_self_hides_message_only_for_caller() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let chat_id = open_chat(&ctx, &alice, &bob).await;
    let sent = ctx
        .services
        .messages
        .send(&alice.id, &chat_id, "oops", ContentKind::Text)
        .await
        .unwrap();
    let bob_conn = ctx.connect(&bob.id).await;
    let alice_conn = ctx.connect(&alice.id).await;
    ctx.transport.clear();

    let outcome = ctx
        .services
        .messages
        .delete(&alice.id, &chat_id, &sent.message.id, DeleteScope::Me)
        .await
        .unwrap();

    assert_eq!(outcome.recipients, vec![alice.id.clone()]);
    assert_eq!(ctx.transport.names_for(&alice_conn), vec!["message-deleted".to_string()]);
    assert!(ctx.transport.events_for(&bob_conn).is_empty());

    let for_alice = ctx.services.messages.list_messages(&alice.id, &chat_id).await.unwrap();
    let for_bob = ctx.services.messages.list_messages(&bob.id, &chat_id).await.unwrap();
    assert!(for_alice.is_empty());
    assert_eq!(for_bob.len(), 1);

    let err = ctx
        .services
        .messages
        .delete(&alice.id, &chat_id, &sent.message.id, DeleteScope::Me)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_repeated_delete_for_everyone_changes_nothing() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let chat_id = open_chat(&ctx, &alice, &bob).await;
    let sent = ctx
        .services
        .messages
        .send(&bob.id, &chat_id, "secret", ContentKind::Text)
        .await
        .unwrap();

    let first = ctx
        .services
        .messages
        .delete(&bob.id, &chat_id, &sent.message.id, DeleteScope::Everyone)
        .await
        .unwrap();
    assert!(first.message.is_deleted_for(&alice.id));
    assert!(first.message.is_deleted_for(&bob.id));
    let alice_conn = ctx.connect(&alice.id).await;
    ctx.transport.clear();

    let again = ctx
        .services
        .messages
        .delete(&alice.id, &chat_id, &sent.message.id, DeleteScope::Everyone)
        .await
        .unwrap();

    assert_eq!(again.message.deleted, first.message.deleted);
    assert!(ctx.transport.events_for(&alice_conn).is_empty());
}

#[tokio::test]
async fn test_delete_for_everyone_leaves_former_participants_alone() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let carol = ctx.user().await;
    let participants = [&bob, &carol]
        .iter()
        .map(|u| (u.id.clone(), GroupRole::Member))
        .collect();
    let group = ctx
        .services
        .groups
        .create(
            &alice.id,
            NewGroup {
                name: "Book club".into(),
                description: None,
                photo: None,
                participants,
            },
        )
        .await
        .unwrap();
    let chat_id = group.chat_id.clone().unwrap();
    let sent = ctx
        .services
        .messages
        .send(&alice.id, &chat_id, "chapter 3 by friday", ContentKind::Text)
        .await
        .unwrap();
    ctx.services.groups.leave(&carol.id, &group.id).await.unwrap();

    let outcome = ctx
        .services
        .messages
        .delete(&alice.id, &chat_id, &sent.message.id, DeleteScope::Everyone)
        .await
        .unwrap();

    assert!(outcome.message.is_deleted_for(&alice.id));
    assert!(outcome.message.is_deleted_for(&bob.id));
    assert!(!outcome.message.is_deleted_for(&carol.id));
    assert!(!outcome.recipients.contains(&carol.id));
    assert_eq!(
        ctx.services.messages.list_messages(&carol.id, &chat_id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_messages_are_listed_in_send_order() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let chat_id = open_chat(&ctx, &alice, &bob).await;

    for content in ["one", "two", "three"] {
        ctx.services
            .messages
            .send(&alice.id, &chat_id, content, ContentKind::Text)
            .await
            .unwrap();
    }

    let contents: Vec<String> = ctx
        .services
        .messages
        .list_messages(&bob.id, &chat_id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["one", "two", "three"]);
}
