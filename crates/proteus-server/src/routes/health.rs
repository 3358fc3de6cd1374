use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub services: BTreeMap<String, bool>,
}

/// "healthy" when every dependency is up, "degraded" when some are, "unhealthy" otherwise
pub fn overall_status(services: &BTreeMap<String, bool>) -> &'static str {
    let up = services.values().filter(|up| **up).count();
    if up == services.len() {
        "healthy"
    } else if up > 0 {
        "degraded"
    } else {
        "unhealthy"
    }
}

async fn dependency_health(state: &AppState) -> HealthResponse {
    let (ollama, qdrant, searxng) =
        tokio::join!(state.llm.health(), state.store.health(), state.search.health());

    let services = BTreeMap::from([
        ("ollama".to_string(), ollama),
        ("qdrant".to_string(), qdrant),
        ("searxng".to_string(), searxng),
    ]);
    HealthResponse {
        status: overall_status(&services).to_string(),
        services,
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(dependency_health(&state).await)
}

async fn live() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        services: BTreeMap::new(),
    })
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let health = dependency_health(&state).await;
    let status = if health.status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
        .with_state(state)
}
