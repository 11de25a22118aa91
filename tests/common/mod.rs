//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use jsonwebtoken::{encode, EncodingKey, Header};
use mockall::mock;
use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;

use chat_coordinator::application::services::Services;
use chat_coordinator::config::Settings;
use chat_coordinator::domain::{BlobStore, FanoutTransport, IdentityProvider, Repositories, User};
use chat_coordinator::infrastructure::blob::LocalBlobStore;
use chat_coordinator::infrastructure::identity::{IdTokenClaims, JwtIdentityProvider};
use chat_coordinator::infrastructure::memory::InMemoryStore;
use chat_coordinator::shared::error::AppError;
use chat_coordinator::shared::ids;
use chat_coordinator::startup::{build_router, AppState};

mock! {
    pub Blobs {}

    #[async_trait]
    impl BlobStore for Blobs {
        async fn upload(
            &self,
            owner_key: &str,
            folder: &str,
            tag: &str,
            bytes: Vec<u8>,
        ) -> Result<String, AppError>;
    }
}

/// Blob store mock that answers every upload with a deterministic URL.
pub fn echo_blobs() -> MockBlobs {
    let mut blobs = MockBlobs::new();
    blobs
        .expect_upload()
        .returning(|owner, folder, tag, _| Ok(format!("https://blobs.test/{}/{}/{}", folder, owner, tag)));
    blobs
}

/// One event handed to the transport.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub connection_id: String,
    pub event: String,
    pub payload: Value,
}

/// Transport that accepts every send and remembers it.
#[derive(Default)]
pub struct RecordingTransport {
    delivered: Mutex<Vec<Delivered>>,
}

impl RecordingTransport {
    /// Everything delivered to one connection, oldest first.
    pub fn events_for(&self, connection_id: &str) -> Vec<Delivered> {
        self.delivered
            .lock()
            .iter()
            .filter(|d| d.connection_id == connection_id)
            .cloned()
            .collect()
    }

    /// Event names delivered to one connection, oldest first.
    pub fn names_for(&self, connection_id: &str) -> Vec<String> {
        self.events_for(connection_id)
            .into_iter()
            .map(|d| d.event)
            .collect()
    }

    /// Deliveries of one event name, across all connections.
    pub fn deliveries_of(&self, event: &str) -> Vec<Delivered> {
        self.delivered
            .lock()
            .iter()
            .filter(|d| d.event == event)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.delivered.lock().clear();
    }
}

impl FanoutTransport for RecordingTransport {
    fn send_to_connection(&self, connection_id: &str, event_name: &str, payload: &Value) -> bool {
        self.delivered.lock().push(Delivered {
            connection_id: connection_id.to_string(),
            event: event_name.to_string(),
            payload: payload.clone(),
        });
        true
    }
}

/// Coordinators wired over an in-memory store and a recording transport.
pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub repos: Repositories,
    pub transport: Arc<RecordingTransport>,
    pub services: Services,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_blobs(echo_blobs())
    }

    pub fn with_blobs(blobs: MockBlobs) -> Self {
        Self::build(blobs, |_, _| {})
    }

    /// Context whose repositories are adjusted before the services are
    /// wired, e.g. to wrap one of them.
    pub fn with_repositories(adjust: impl FnOnce(&Arc<InMemoryStore>, &mut Repositories)) -> Self {
        Self::build(echo_blobs(), adjust)
    }

    fn build(blobs: MockBlobs, adjust: impl FnOnce(&Arc<InMemoryStore>, &mut Repositories)) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let mut repos = store.repositories();
        adjust(&store, &mut repos);
        let transport = Arc::new(RecordingTransport::default());

        let settings = Settings::in_memory("unused");
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(JwtIdentityProvider::new(settings.jwt, settings.identity));

        let services = Services::new(&repos, identity, Arc::new(blobs), transport.clone());

        Self {
            store,
            repos,
            transport,
            services,
        }
    }

    /// Insert a user with a generated name and email.
    pub async fn user(&self) -> User {
        let name: String = Name().fake();
        let email: String = SafeEmail().fake();
        self.repos
            .users
            .create(&User::new(ids::new_id(), name, email))
            .await
            .unwrap()
    }

    /// Open a live connection for `user_id` and return its id.
    pub async fn connect(&self, user_id: &str) -> String {
        let connection_id = ids::new_connection_id();
        self.services
            .presence
            .on_connect(user_id, &connection_id)
            .await
            .unwrap();
        connection_id
    }

    pub async fn disconnect(&self, user_id: &str, connection_id: &str) {
        self.services
            .presence
            .on_disconnect(user_id, connection_id)
            .await
            .unwrap();
    }
}

/// Sign an ID token the way the external identity provider would.
pub fn id_token(settings: &Settings, subject: &str, email: &str, name: Option<&str>) -> String {
    let claims = IdTokenClaims {
        sub: subject.to_string(),
        email: email.to_string(),
        name: name.map(str::to_string),
        iss: settings.identity.issuer.clone(),
        exp: (Utc::now() + Duration::minutes(5)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.identity.secret.as_bytes()),
    )
    .unwrap()
}

/// HTTP test application over in-memory backends.
pub struct TestApp {
    pub server: TestServer,
    pub settings: Settings,
    pub state: AppState,
    _blob_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let blob_dir = TempDir::new().unwrap();
        let settings = Settings::in_memory(blob_dir.path().to_string_lossy().to_string());

        let store = Arc::new(InMemoryStore::new());
        let identity: Arc<dyn IdentityProvider> = Arc::new(JwtIdentityProvider::new(
            settings.jwt.clone(),
            settings.identity.clone(),
        ));
        let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(&settings.blob).await.unwrap());

        let state = AppState::new(settings.clone(), &store.repositories(), identity, blobs);
        let server = TestServer::new(build_router(state.clone())).unwrap();

        Self {
            server,
            settings,
            state,
            _blob_dir: blob_dir,
        }
    }

    /// Sign in a fresh user and return (user id, session token).
    pub async fn sign_in(&self, name: &str) -> (String, String) {
        let subject = ids::new_id();
        let email: String = SafeEmail().fake();
        let token = id_token(&self.settings, &subject, &email, Some(name));

        let response = self
            .server
            .post("/api/v1/auth/sign-in")
            .json(&serde_json::json!({ "id_token": token }))
            .await;
        let body: Value = response.json();

        (subject, body["token"]["token"].as_str().unwrap().to_string())
    }
}
