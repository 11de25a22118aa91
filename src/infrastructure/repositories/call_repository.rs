//! Call Repository Implementation
//!
//! PostgreSQL implementation of the CallRepository trait over the `calls`
//! document collection.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::{Call, CallRepository, CallStatus};
use crate::infrastructure::database::{collections::CALLS, DocumentStore};
use crate::shared::error::AppError;

/// PostgreSQL call repository implementation.
#[derive(Clone)]
pub struct PgCallRepository {
    store: DocumentStore,
}

impl PgCallRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CallRepository for PgCallRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Call>, AppError> {
        self.store.get(CALLS, id).await
    }

    async fn find_by_participant(&self, user_id: &str) -> Result<Vec<Call>, AppError> {
        self.store
            .find(CALLS, json!({ "participants": [user_id] }))
            .await
    }

    async fn find_active_by_participant(&self, user_id: &str) -> Result<Vec<Call>, AppError> {
        let mut active = Vec::new();
        for status in [CallStatus::Pending, CallStatus::Ongoing] {
            let calls: Vec<Call> = self
                .store
                .find(
                    CALLS,
                    json!({ "participants": [user_id], "status": status.as_str() }),
                )
                .await?;
            active.extend(calls);
        }
        Ok(active)
    }

    async fn create(&self, call: &Call) -> Result<Call, AppError> {
        self.store.insert(CALLS, &call.id, call).await?;
        Ok(call.clone())
    }

    async fn update_status(
        &self,
        id: &str,
        status: CallStatus,
        duration_secs: Option<i64>,
    ) -> Result<Call, AppError> {
        self.store
            .merge_fields(
                CALLS,
                id,
                json!({ "status": status.as_str(), "duration_secs": duration_secs }),
            )
            .await
    }

    async fn mark_deleted(&self, id: &str, user_id: &str, at: DateTime<Utc>) -> Result<Call, AppError> {
        let entries: BTreeMap<&str, DateTime<Utc>> = BTreeMap::from([(user_id, at)]);
        self.store
            .merge_missing(CALLS, id, &["deleted"], serde_json::to_value(entries)?)
            .await
    }
}
