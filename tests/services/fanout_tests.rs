//! Notification Fan-out Tests

use std::sync::Arc;

use pretty_assertions::assert_eq;

use chat_coordinator::application::dto::{CallDeleted, ClientEvent};
use chat_coordinator::application::services::NotificationFanout;
use chat_coordinator::domain::FanoutTransport;
use chat_coordinator::infrastructure::memory::InMemoryStore;

use crate::common::RecordingTransport;

/// Transport whose sockets have all gone away.
struct ClosedTransport;

impl FanoutTransport for ClosedTransport {
    fn send_to_connection(&self, _: &str, _: &str, _: &serde_json::Value) -> bool {
        false
    }
}

fn deleted_event() -> ClientEvent {
    ClientEvent::CallDeleted(CallDeleted {
        call_id: "call-1".into(),
    })
}

#[tokio::test]
async fn test_duplicate_targets_are_delivered_once() {
    let store = Arc::new(InMemoryStore::new());
    let repos = store.repositories();
    repos.connections.add_connection("alice", "a-1").await.unwrap();
    repos.connections.add_connection("alice", "a-2").await.unwrap();
    let transport = Arc::new(RecordingTransport::default());
    let fanout = NotificationFanout::new(repos.connections.clone(), transport.clone());

    let report = fanout
        .notify(&["alice".to_string(), "alice".to_string()], &deleted_event())
        .await
        .unwrap();

    assert_eq!(report.targets, 1);
    assert_eq!(report.delivered, 2);
    assert_eq!(transport.deliveries_of("call-deleted").len(), 2);
    assert_eq!(transport.events_for("a-1")[0].payload["call_id"], "call-1");
}

#[tokio::test]
async fn test_offline_users_are_skipped_silently() {
    let store = Arc::new(InMemoryStore::new());
    let repos = store.repositories();
    let transport = Arc::new(RecordingTransport::default());
    let fanout = NotificationFanout::new(repos.connections.clone(), transport.clone());

    let report = fanout.publish(&["offline".to_string()], &deleted_event()).await;

    assert_eq!(report.targets, 1);
    assert_eq!(report.delivered, 0);
    assert_eq!(report.skipped, 0);
}

#[tokio::test]
async fn test_stale_connections_are_counted_as_skipped() {
    let store = Arc::new(InMemoryStore::new());
    let repos = store.repositories();
    repos.connections.add_connection("bob", "b-1").await.unwrap();
    let fanout = NotificationFanout::new(repos.connections.clone(), Arc::new(ClosedTransport));

    let report = fanout.send_to_user("bob", &deleted_event()).await.unwrap();

    assert_eq!(report.delivered, 0);
    assert_eq!(report.skipped, 1);
}
