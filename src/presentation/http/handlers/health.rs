//! Health Endpoints
//!
//! - `GET /health`: process answers, with its version
//! - `GET /health/live`: liveness
//! - `GET /health/ready`: 503 until the document store and the connection
//!   registry both answer

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::shared::error::AppError;
use crate::startup::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'static str>,
}

/// Whether a backend answered its ping.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Healthy,
    Unhealthy,
}

impl BackendStatus {
    fn of(ping: Result<(), AppError>) -> Self {
        match ping {
            Ok(()) => Self::Healthy,
            Err(e) => {
                e.log();
                Self::Unhealthy
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BackendCheck {
    pub status: BackendStatus,
}

#[derive(Debug, Serialize)]
pub struct GatewayCheck {
    pub active_connections: usize,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub database: BackendCheck,
    pub connection_registry: BackendCheck,
    pub websocket: GatewayCheck,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: BackendStatus,
    pub checks: ReadinessChecks,
}

impl ReadinessResponse {
    fn new(checks: ReadinessChecks) -> Self {
        let all_healthy = [&checks.database, &checks.connection_registry]
            .iter()
            .all(|check| check.status == BackendStatus::Healthy);
        Self {
            status: if all_healthy {
                BackendStatus::Healthy
            } else {
                BackendStatus::Unhealthy
            },
            checks,
        }
    }
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: Some(env!("CARGO_PKG_VERSION")),
    })
}

pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive",
        version: None,
    })
}

pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // In-process backends are always reachable
    let database = match &state.database {
        Some(store) => BackendStatus::of(store.ping().await),
        None => BackendStatus::Healthy,
    };
    let connection_registry = match &state.presence_store {
        Some(registry) => BackendStatus::of(registry.ping().await),
        None => BackendStatus::Healthy,
    };

    let response = ReadinessResponse::new(ReadinessChecks {
        database: BackendCheck { status: database },
        connection_registry: BackendCheck {
            status: connection_registry,
        },
        websocket: GatewayCheck {
            active_connections: state.gateway.session_count(),
        },
    });

    let code = match response.status {
        BackendStatus::Healthy => StatusCode::OK,
        BackendStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(response))
}
