use std::io;
use std::path::PathBuf;

use axum::{
    extract::State,
    http::{header, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    snapshot_path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub snapshot: HealthCheck,
    pub checked_at: String,
}

pub fn router(snapshot_path: PathBuf) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/snapshot", get(snapshot))
        .with_state(HealthState { snapshot_path })
}

pub async fn spawn(bind_address: &str, port: u16, snapshot_path: PathBuf) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(snapshot_path)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn healthz(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let snapshot = snapshot_check(&state.snapshot_path);
    let ready = snapshot.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "rollcall-server runtime initialized".to_string(),
        },
        snapshot,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

/// Serves the durable snapshot verbatim for external monitoring. Reading
/// alongside the store's writer is safe because snapshot writes are
/// staged and renamed into place.
pub async fn snapshot(
    State(state): State<HealthState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    match std::fs::read_to_string(&state.snapshot_path) {
        Ok(raw) => (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], raw),
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], "{}".to_string())
        }
        Err(source) => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "application/json")],
            format!("{{\"error\":\"snapshot unreadable: {source}\"}}"),
        ),
    }
}

fn snapshot_check(path: &std::path::Path) -> HealthCheck {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => {
                let event_count = value.as_object().map(|map| map.len()).unwrap_or(0);
                HealthCheck { status: "ready", detail: format!("snapshot holds {event_count} events") }
            }
            Err(error) => HealthCheck {
                status: "degraded",
                detail: format!("snapshot parse failed: {error}"),
            },
        },
        Err(source) if source.kind() == io::ErrorKind::NotFound => HealthCheck {
            status: "ready",
            detail: "snapshot not yet written; store is empty".to_string(),
        },
        Err(source) => {
            HealthCheck { status: "degraded", detail: format!("snapshot read failed: {source}") }
        }
    }
}
