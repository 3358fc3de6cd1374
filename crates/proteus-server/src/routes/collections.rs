use crate::routes::{api_error, ApiError};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionsResponse {
    pub collections: Vec<CollectionInfo>,
}

async fn list_collections(
    State(state): State<AppState>,
) -> Result<Json<CollectionsResponse>, ApiError> {
    let names = state.store.list_collections().await.map_err(|e| {
        tracing::error!("Failed to list collections: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let mut collections = Vec::with_capacity(names.len());
    for name in names {
        let count = match state.store.count(&name).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(collection = name.as_str(), error = %e, "failed to count collection");
                0
            }
        };
        collections.push(CollectionInfo { name, count });
    }

    Ok(Json(CollectionsResponse { collections }))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/collections", get(list_collections))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{body_json, get_request, ScriptedModel, TestApp, TestStore};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_lists_collections_with_counts() {
        let store = TestStore::new()
            .with_collection("docs_rs", 42)
            .with_uncountable("broken");
        let app = TestApp::new(ScriptedModel::new(&[])).with_store(store);

        let response = app.router().oneshot(get_request("/collections")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"collections": [
                {"name": "docs_rs", "count": 42},
                {"name": "broken", "count": 0}
            ]})
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_500() {
        let app = TestApp::new(ScriptedModel::new(&[])).with_store(TestStore::unavailable());

        let response = app.router().oneshot(get_request("/collections")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
