//! Liveness and readiness probes

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::Instant;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub database: DatabaseCheck,
}

#[derive(Serialize)]
pub struct DatabaseCheck {
    pub up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe: healthy whenever the process serves requests
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: yamdb_common::VERSION,
    })
}

/// Readiness probe: 503 until the database answers
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let start = Instant::now();

    let database = match state.db.ping().await {
        Ok(()) => DatabaseCheck {
            up: true,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            DatabaseCheck {
                up: false,
                latency_ms: None,
                error: Some(e.to_string()),
            }
        }
    };

    let (status, label) = if database.up {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (status, Json(ReadyResponse { status: label, database }))
}
