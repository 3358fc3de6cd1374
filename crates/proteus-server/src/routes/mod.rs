// Export route modules
pub mod chat;
pub mod collections;
pub mod health;
pub mod openai;
pub mod sse;

use axum::{http::StatusCode, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error<S: Into<String>>(status: StatusCode, detail: S) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
}

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(chat::routes(state.clone()))
        .merge(openai::routes(state.clone()))
        .merge(collections::routes(state.clone()))
        .merge(health::routes(state))
}
