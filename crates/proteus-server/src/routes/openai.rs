use crate::routes::chat::{conversation_id, preview};
use crate::routes::sse::{format_data, SseResponse};
use crate::routes::{api_error, ApiError};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use proteus::adapters::{select_adapter, Adapter};
use proteus::content_filter::select_filter;
use proteus::models::message::Message;
use proteus::providers::utils::{
    last_user_message, message_to_openai_spec, openai_messages_to_ollama, tool_names,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct ChatCompletionRequest {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    messages: Vec<Value>,
    #[serde(default)]
    stream: bool,
    #[serde(default)]
    tools: Option<Vec<Value>>,
    /// Not part of the OpenAI schema; lets clients keep an orchestration conversation going
    #[serde(default)]
    conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct EmbeddingRequest {
    #[serde(default)]
    model: Option<String>,
    input: EmbeddingInput,
}

pub fn completion_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("chatcmpl-{}", &id[..12])
}

fn created() -> i64 {
    chrono::Utc::now().timestamp()
}

fn completion_body(id: &str, model: &str, message: Value, finish_reason: &str) -> Value {
    json!({
        "id": id,
        "object": "chat.completion",
        "created": created(),
        "model": model,
        "choices": [{
            "index": 0,
            "message": message,
            "finish_reason": finish_reason,
        }],
        "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0},
    })
}

fn chunk(id: &str, model: &str, delta: Value, finish_reason: Option<&str>) -> String {
    let chunk = json!({
        "id": id,
        "object": "chat.completion.chunk",
        "created": created(),
        "model": model,
        "choices": [{
            "index": 0,
            "delta": delta,
            "finish_reason": finish_reason,
        }],
    });
    format_data(&chunk.to_string())
}

/// The frames of a streamed reply: its content delta, the stop chunk and the terminator
fn reply_frames(id: &str, model: &str, delta: Value, finish_reason: &str) -> Vec<String> {
    vec![
        chunk(id, model, delta, None),
        chunk(id, model, json!({}), Some(finish_reason)),
        format_data("[DONE]"),
    ]
}

fn error_frames(message: &str) -> Vec<String> {
    vec![
        format_data(&json!({ "error": message }).to_string()),
        format_data("[DONE]"),
    ]
}

/// Stream frames produced once the given future resolves
fn stream_frames<F>(frames: F) -> SseResponse
where
    F: std::future::Future<Output = Vec<String>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(100);
    tokio::spawn(async move {
        for frame in frames.await {
            if tx.send(frame).await.is_err() {
                return;
            }
        }
    });
    SseResponse::new(ReceiverStream::new(rx))
}

fn finish_reason(message: &Message) -> &'static str {
    if message.has_tool_calls() {
        "tool_calls"
    } else {
        "stop"
    }
}

async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response, ApiError> {
    if request.messages.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "No messages provided"));
    }

    let model = request
        .model
        .clone()
        .unwrap_or_else(|| state.agent_alias.clone());
    let filter = select_filter(headers.get(USER_AGENT).and_then(|v| v.to_str().ok()));
    let id = completion_id();
    tracing::info!(%model, stream = request.stream, "POST /v1/chat/completions");

    if model == state.agent_alias {
        let message = last_user_message(&request.messages).unwrap_or_default();
        let conversation_id = conversation_id(request.conversation_id.as_deref());

        if request.stream {
            return Ok(stream_frames(async move {
                match state.orchestrator.run(message, conversation_id).await {
                    Ok(result) => {
                        let content = filter.apply(&result.final_response.unwrap_or_default());
                        reply_frames(&id, &model, json!({"role": "assistant", "content": content}), "stop")
                    }
                    Err(e) => {
                        tracing::error!("Orchestration failed: {}", e);
                        error_frames(&e.to_string())
                    }
                }
            })
            .into_response());
        }

        let result = state
            .orchestrator
            .run(message, conversation_id)
            .await
            .map_err(|e| {
                tracing::error!("Orchestration failed: {}", e);
                api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            })?;
        let content = result.final_response.unwrap_or_default();
        if state.log_agent_output {
            tracing::info!(final_preview = %preview(&content, 200), "agent completion");
        }
        let message = json!({"role": "assistant", "content": content});
        return Ok(Json(completion_body(&id, &model, message, "stop")).into_response());
    }

    let tools = request.tools.unwrap_or_default();
    let adapter = select_adapter(&model);
    let messages = adapter.inject_tool_guidance(openai_messages_to_ollama(&request.messages), &tools);
    let declared = tool_names(&tools);
    tracing::debug!(adapter = adapter.name(), tools = tools.len(), "proxying chat completion");

    if request.stream {
        return Ok(stream_frames(async move {
            match state.llm.chat(&model, &messages, &tools).await {
                Ok(raw) => {
                    let message = adapter.normalize_tool_calls(raw, &declared);
                    let mut delta = json!({
                        "role": "assistant",
                        "content": filter.apply(&message.content),
                    });
                    if message.has_tool_calls() {
                        delta["tool_calls"] = message
                            .tool_calls
                            .iter()
                            .enumerate()
                            .map(|(index, call)| {
                                let mut spec = call.to_openai_spec();
                                spec["index"] = json!(index);
                                spec
                            })
                            .collect();
                    }
                    reply_frames(&id, &model, delta, finish_reason(&message))
                }
                Err(e) => {
                    tracing::error!("Chat completion failed: {}", e);
                    error_frames(&e.to_string())
                }
            }
        })
        .into_response());
    }

    let raw = state.llm.chat(&model, &messages, &tools).await.map_err(|e| {
        tracing::error!("Chat completion failed: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    let message = adapter.normalize_tool_calls(raw, &declared);
    let body = completion_body(
        &id,
        &model,
        message_to_openai_spec(&message),
        finish_reason(&message),
    );
    Ok(Json(body).into_response())
}

async fn list_models(State(state): State<AppState>) -> Json<Value> {
    let model = |id: &str| json!({"id": id, "object": "model", "created": 0, "owned_by": "local"});
    Json(json!({
        "object": "list",
        "data": [
            model(&state.agent_alias),
            model(&state.agent_config().orchestrator_model),
        ],
    }))
}

async fn embeddings(
    State(state): State<AppState>,
    Json(request): Json<EmbeddingRequest>,
) -> Result<Json<Value>, ApiError> {
    let model = request
        .model
        .unwrap_or_else(|| state.agent_config().embedding_model.clone());
    let input = match request.input {
        EmbeddingInput::Single(text) => vec![text],
        EmbeddingInput::Batch(texts) => texts,
    };

    let vectors = state.llm.embed(&model, &input).await.map_err(|e| {
        tracing::error!("Embedding failed: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let data: Vec<Value> = vectors
        .into_iter()
        .enumerate()
        .map(|(index, embedding)| json!({"object": "embedding", "index": index, "embedding": embedding}))
        .collect();
    Ok(Json(json!({
        "object": "list",
        "data": data,
        "model": model,
        "usage": {"prompt_tokens": 0, "total_tokens": 0},
    })))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(list_models))
        .route("/v1/embeddings", post(embeddings))
        .with_state(state)
}
