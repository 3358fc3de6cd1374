use crate::routes::sse::{format_event, SseResponse};
use crate::routes::{api_error, ApiError};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use futures::stream::StreamExt;
use proteus::agent::{AgentState, Node};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    conversation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub intent: String,
    pub actions_taken: Vec<String>,
    pub confidence: f32,
    pub conversation_id: String,
    pub sources: Vec<String>,
}

impl ChatResponse {
    fn from_state(state: AgentState) -> Self {
        Self {
            response: state.final_response.unwrap_or_default(),
            intent: state
                .intent_type
                .map(|intent| intent.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            actions_taken: state.actions_taken,
            confidence: state.confidence,
            conversation_id: state.conversation_id,
            sources: state.sources,
        }
    }
}

/// The caller's conversation id, or a fresh one
pub fn conversation_id(requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// First `max` characters of a response on a single line, for logs
pub fn preview(text: &str, max: usize) -> String {
    text.chars().take(max).collect::<String>().replace('\n', " ")
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let conversation_id = conversation_id(request.conversation_id.as_deref());
    tracing::info!(%conversation_id, "POST /chat");

    let result = state
        .orchestrator
        .run(request.message, conversation_id)
        .await
        .map_err(|e| {
            tracing::error!("Orchestration failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    if state.log_agent_output {
        tracing::info!(
            conversation_id = %result.conversation_id,
            actions = ?result.actions_taken,
            final_preview = %preview(result.final_response.as_deref().unwrap_or_default(), 200),
            "agent result"
        );
    }

    Ok(Json(ChatResponse::from_state(result)))
}

async fn stream_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> SseResponse {
    let conversation_id = conversation_id(request.conversation_id.as_deref());
    tracing::info!(%conversation_id, "POST /chat/stream");

    let (tx, rx) = mpsc::channel(100);
    let stream = ReceiverStream::new(rx);

    tokio::spawn(async move {
        let mut events = state
            .orchestrator
            .stream(request.message, conversation_id.clone());

        loop {
            match timeout(Duration::from_millis(500), events.next()).await {
                Ok(Some(Ok(event))) => {
                    let final_response = event.state.final_response.as_deref();
                    if state.log_agent_output {
                        tracing::info!(
                            node = %event.node,
                            %conversation_id,
                            final_preview = %preview(final_response.unwrap_or_default(), 160),
                            "agent node finished"
                        );
                    }

                    if tx.send(format_event("node", event.node.as_ref())).await.is_err() {
                        return;
                    }
                    if event.node == Node::Answer {
                        let response = final_response.unwrap_or_default();
                        if tx.send(format_event("response", response)).await.is_err() {
                            return;
                        }
                    }
                }
                Ok(Some(Err(e))) => {
                    tracing::error!("Orchestration failed: {}", e);
                    let _ = tx.send(format_event("error", &e.to_string())).await;
                    return;
                }
                Ok(None) => break,
                Err(_) => {
                    // heartbeat: stop working for clients that went away
                    if tx.is_closed() {
                        return;
                    }
                }
            }
        }

        let _ = tx.send(format_event("done", "complete")).await;
    });

    SseResponse::new(stream)
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat/stream", post(stream_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{body_string, post_json, ScriptedModel, TestApp};
    use axum::body::to_bytes;
    use serde_json::json;
    use tower::ServiceExt;

    const QUESTION: &str = r#"{"intent": "question", "confidence": 0.9, "entities": []}"#;

    #[test]
    fn test_conversation_id() {
        assert_eq!(conversation_id(Some(" abc ")), "abc");
        assert!(Uuid::parse_str(&conversation_id(Some("  "))).is_ok());
        assert!(Uuid::parse_str(&conversation_id(None)).is_ok());
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("one\ntwo three", 7), "one two");
    }

    #[tokio::test]
    async fn test_chat_returns_final_state() {
        let app = TestApp::new(ScriptedModel::new(&[
            QUESTION,
            "Rust is a systems language.",
            r#"{"is_approved": true}"#,
        ]));

        let response = app
            .router()
            .oneshot(post_json(
                "/chat",
                json!({"message": "what is rust", "conversation_id": "conv-1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ChatResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.response, "Rust is a systems language.");
        assert_eq!(body.intent, "question");
        assert_eq!(body.actions_taken, vec!["research", "synthesize"]);
        assert_eq!(body.confidence, 0.9);
        assert_eq!(body.conversation_id, "conv-1");
    }

    #[tokio::test]
    async fn test_chat_failure_is_500() {
        let app = TestApp::new(ScriptedModel::new(&[]));

        let response = app
            .router()
            .oneshot(post_json("/chat", json!({"message": "what is rust"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(response).await;
        assert!(body.contains("detail"));
    }

    #[tokio::test]
    async fn test_stream_emits_nodes_then_response_then_done() {
        let app = TestApp::new(ScriptedModel::new(&[
            QUESTION,
            "Line one.\nLine two.",
            r#"{"is_approved": true}"#,
        ]));

        let response = app
            .router()
            .oneshot(post_json("/chat/stream", json!({"message": "what is rust"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/event-stream"
        );

        let body = body_string(response).await;
        let expected = [
            "interpret",
            "decide",
            "research",
            "synthesize",
            "critique",
            "answer",
        ]
        .iter()
        .map(|node| format_event("node", node))
        .collect::<String>()
            + "event: response\ndata: Line one.\ndata: Line two.\n\n"
            + "event: done\ndata: complete\n\n";
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn test_stream_ends_with_single_error() {
        let app = TestApp::new(ScriptedModel::new(&[QUESTION]));

        let response = app
            .router()
            .oneshot(post_json("/chat/stream", json!({"message": "what is rust"})))
            .await
            .unwrap();
        let body = body_string(response).await;

        assert!(body.starts_with("event: node\ndata: interpret\n\n"));
        assert!(body.ends_with("\n\n"));
        assert_eq!(body.matches("event: error").count(), 1);
        assert!(!body.contains("event: done"));
        assert!(!body.contains("event: response"));
    }
}
