use std::collections::HashSet;

use reqwest::Response;
use serde_json::{json, Value};

use crate::errors::{ClientError, ClientResult};
use crate::models::message::{Message, Role};
use crate::models::tool::{generate_call_id, ToolCall};

/// Turn a response into JSON, mapping non-2xx statuses and undecodable bodies to errors
pub async fn handle_response(service: &'static str, response: Response) -> ClientResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Http {
            service,
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ClientError::InvalidResponse {
            service,
            reason: e.to_string(),
        })
}

/// Flatten OpenAI message content, which may be a string, a list of parts, or null
pub fn content_to_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(text) => Some(text.as_str()),
                other => other.get("text").and_then(Value::as_str),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Convert OpenAI chat messages into the runtime's native chat format.
///
/// Content parts are flattened to text and tool-call arguments, which OpenAI sends as
/// JSON-encoded strings, are decoded back into objects.
pub fn openai_messages_to_ollama(messages: &[Value]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let mut converted = json!({
                "role": message.get("role").and_then(Value::as_str).unwrap_or("user"),
                "content": content_to_text(message.get("content").unwrap_or(&Value::Null)),
            });

            if let Some(calls) = message.get("tool_calls").and_then(Value::as_array) {
                let calls: Vec<Value> = calls
                    .iter()
                    .map(|call| {
                        let function = call.get("function").unwrap_or(call);
                        let arguments = match function.get("arguments") {
                            Some(Value::String(encoded)) => {
                                serde_json::from_str(encoded).unwrap_or_else(|_| json!({}))
                            }
                            Some(other) => other.clone(),
                            None => json!({}),
                        };
                        json!({
                            "function": {
                                "name": function.get("name").cloned().unwrap_or(Value::Null),
                                "arguments": arguments,
                            }
                        })
                    })
                    .collect();
                converted["tool_calls"] = json!(calls);
            }

            if let Some(name) = message.get("name").and_then(Value::as_str) {
                converted["tool_name"] = json!(name);
            }
            converted
        })
        .collect()
}

/// Names of the functions declared in an OpenAI `tools` list
pub fn tool_names(tools: &[Value]) -> HashSet<String> {
    tools
        .iter()
        .filter_map(|tool| {
            tool.get("function")
                .unwrap_or(tool)
                .get("name")
                .and_then(Value::as_str)
                .map(String::from)
        })
        .collect()
}

/// Parse the runtime's native chat message into a raw [`Message`]
pub fn ollama_message_to_message(message: &Value) -> Message {
    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let function = call.get("function")?;
                    let name = function.get("name")?.as_str()?;
                    let id = call
                        .get("id")
                        .and_then(Value::as_str)
                        .map(String::from)
                        .unwrap_or_else(generate_call_id);
                    let arguments = function.get("arguments").unwrap_or(&Value::Null);
                    Some(ToolCall::from_json(name, arguments).with_id(id))
                })
                .collect()
        })
        .unwrap_or_default();

    Message::assistant()
        .with_text(content)
        .with_tool_calls(tool_calls)
}

/// Text of the last user message in an OpenAI message list
pub fn last_user_message(messages: &[Value]) -> Option<String> {
    messages
        .iter()
        .rev()
        .find(|message| message.get("role").and_then(Value::as_str) == Some("user"))
        .map(|message| content_to_text(message.get("content").unwrap_or(&Value::Null)))
}

/// OpenAI assistant message for a normalized message
pub fn message_to_openai_spec(message: &Message) -> Value {
    let mut spec = json!({
        "role": Role::Assistant,
        "content": message.content,
    });
    if message.has_tool_calls() {
        spec["tool_calls"] = message
            .tool_calls
            .iter()
            .map(ToolCall::to_openai_spec)
            .collect();
    }
    spec
}
