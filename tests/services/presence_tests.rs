//! Presence Tests

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;

use chat_coordinator::domain::{ConnectionEntry, ConnectionRepository, Removal};
use chat_coordinator::infrastructure::memory::InMemoryStore;
use chat_coordinator::shared::error::AppError;

use crate::common::TestContext;

/// Registry where another device connects right after every removal.
struct ConnectsAfterRemoval {
    inner: Arc<InMemoryStore>,
    late_connection: &'static str,
}

#[async_trait]
impl ConnectionRepository for ConnectsAfterRemoval {
    async fn find(&self, user_id: &str) -> Result<Option<ConnectionEntry>, AppError> {
        ConnectionRepository::find(self.inner.as_ref(), user_id).await
    }

    async fn add_connection(&self, user_id: &str, connection_id: &str) -> Result<bool, AppError> {
        self.inner.add_connection(user_id, connection_id).await
    }

    async fn remove_connection(&self, user_id: &str, connection_id: &str) -> Result<Removal, AppError> {
        let removal = self.inner.remove_connection(user_id, connection_id).await?;
        self.inner.add_connection(user_id, self.late_connection).await?;
        Ok(removal)
    }

    async fn set_last_disconnect(
        &self,
        user_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        self.inner.set_last_disconnect(user_id, at).await
    }

    async fn connection_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        self.inner.connection_ids(user_id).await
    }

    async fn online_user_ids(&self) -> Result<Vec<String>, AppError> {
        self.inner.online_user_ids().await
    }
}

#[tokio::test]
async fn test_first_connection_broadcasts_online_to_other_users() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let bob_conn = ctx.connect(&bob.id).await;

    let alice_conn = ctx.connect(&alice.id).await;

    let events = ctx.transport.events_for(&bob_conn);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "presence-changed");
    assert_eq!(events[0].payload["user_id"], alice.id.as_str());
    assert_eq!(events[0].payload["online"], true);

    // The subject never hears about itself
    assert!(ctx.transport.events_for(&alice_conn).is_empty());
}

#[tokio::test]
async fn test_second_device_does_not_rebroadcast() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let bob_conn = ctx.connect(&bob.id).await;
    ctx.connect(&alice.id).await;
    ctx.transport.clear();

    ctx.connect(&alice.id).await;

    assert!(ctx.transport.events_for(&bob_conn).is_empty());
}

#[tokio::test]
async fn test_user_stays_online_until_last_connection_closes() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let bob_conn = ctx.connect(&bob.id).await;
    let phone = ctx.connect(&alice.id).await;
    let laptop = ctx.connect(&alice.id).await;
    ctx.transport.clear();

    let presence = ctx.services.presence.on_disconnect(&alice.id, &phone).await.unwrap();
    assert!(presence.online);
    assert!(presence.last_connection.is_none());
    assert!(ctx.transport.events_for(&bob_conn).is_empty());

    let presence = ctx.services.presence.on_disconnect(&alice.id, &laptop).await.unwrap();
    assert!(!presence.online);
    assert!(presence.last_connection.is_some());

    let names = ctx.transport.names_for(&bob_conn);
    assert_eq!(names, vec!["presence-changed".to_string()]);
    let payload = &ctx.transport.events_for(&bob_conn)[0].payload;
    assert_eq!(payload["online"], false);
    assert!(payload["last_connection"].is_string());

    let stored = ctx.services.presence.presence_of(&alice.id).await.unwrap();
    assert_eq!(stored, presence);
}

#[tokio::test]
async fn test_disconnect_of_unknown_connection_is_a_no_op() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    ctx.connect(&alice.id).await;

    let presence = ctx
        .services
        .presence
        .on_disconnect(&alice.id, "never-registered")
        .await
        .unwrap();

    assert!(presence.online);
    assert!(ctx.repos.connections.find(&alice.id).await.unwrap().unwrap().is_connected());
}

#[tokio::test]
async fn test_unknown_user_is_offline_without_timestamp() {
    let ctx = TestContext::new();

    let presence = ctx.services.presence.presence_of("nobody").await.unwrap();

    assert!(!presence.online);
    assert!(presence.last_connection.is_none());
}

#[tokio::test]
async fn test_reset_presence_clears_disconnect_marker() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let conn = ctx.connect(&alice.id).await;
    ctx.disconnect(&alice.id, &conn).await;
    assert!(!ctx.services.presence.presence_of(&alice.id).await.unwrap().online);

    let presence = ctx.services.presence.reset_presence(&alice.id).await.unwrap();

    assert!(presence.online);
    let stored = ctx.services.presence.presence_of(&alice.id).await.unwrap();
    assert!(stored.online);
    assert!(stored.last_connection.is_none());
}

#[tokio::test]
async fn test_reconnect_after_going_offline_broadcasts_again() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let bob = ctx.user().await;
    let bob_conn = ctx.connect(&bob.id).await;
    let conn = ctx.connect(&alice.id).await;
    ctx.disconnect(&alice.id, &conn).await;
    ctx.transport.clear();

    ctx.connect(&alice.id).await;

    let events = ctx.transport.events_for(&bob_conn);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["online"], true);
}

#[tokio::test]
async fn test_connect_racing_last_disconnect_keeps_user_online() {
    let ctx = TestContext::with_repositories(|store, repos| {
        repos.connections = Arc::new(ConnectsAfterRemoval {
            inner: store.clone(),
            late_connection: "phone",
        });
    });
    ctx.services.presence.on_connect("u", "laptop").await.unwrap();

    ctx.services.presence.on_disconnect("u", "laptop").await.unwrap();

    let entry = ConnectionRepository::find(ctx.store.as_ref(), "u")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.connection_ids, BTreeSet::from(["phone".to_string()]));
    assert!(entry.last_disconnect.is_none());
    assert!(ctx.services.presence.presence_of("u").await.unwrap().online);
}

#[tokio::test]
async fn test_reported_last_connection_matches_the_stored_marker() {
    let ctx = TestContext::new();
    let alice = ctx.user().await;
    let conn = ctx.connect(&alice.id).await;

    let presence = ctx.services.presence.on_disconnect(&alice.id, &conn).await.unwrap();

    let entry = ctx.repos.connections.find(&alice.id).await.unwrap().unwrap();
    assert_eq!(presence.last_connection, entry.last_disconnect);
}
