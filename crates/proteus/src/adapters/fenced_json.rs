use std::collections::HashSet;
use std::ops::Range;

use indoc::formatdoc;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use super::{filter_hallucinated, number_recovered, Adapter};
use crate::models::message::Message;
use crate::models::tool::ToolCall;

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"```(?:json)?[ \t]*\n?((?:[^`]|`[^`]|``[^`])*?)```").unwrap();
}

/// Adapter for the qwen2.5-coder family.
///
/// These models ignore the structured tool-call channel entirely and write the call as a JSON
/// object, either in a code fence or inline in prose. Any object carrying both `name` and
/// `arguments` is treated as a call; other JSON is left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FencedJsonAdapter;

/// A tool-call shaped JSON object found in text
#[derive(Debug, Clone, PartialEq)]
pub struct ToolObject {
    /// Byte range to remove from the text, fences included
    pub span: Range<usize>,
    pub name: String,
    pub arguments: Value,
}

fn as_tool_object(value: Value, span: Range<usize>) -> Option<ToolObject> {
    let Value::Object(mut object) = value else {
        return None;
    };
    let name = object.get("name")?.as_str()?.to_string();
    let arguments = object.remove("arguments")?;
    Some(ToolObject {
        span,
        name,
        arguments,
    })
}

/// End (exclusive) of the brace-balanced object starting at `start`, ignoring braces in strings
fn find_object_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find every tool-call object in `text`, fenced ones first, then bare ones outside any fence.
/// The result is ordered by position.
pub fn extract_tool_objects(text: &str) -> Vec<ToolObject> {
    let mut found = Vec::new();
    let mut fences: Vec<Range<usize>> = Vec::new();

    for captures in FENCED_BLOCK.captures_iter(text) {
        let (Some(block), Some(body)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        // a block that is not one JSON value is left to the bare scan
        if let Ok(value) = serde_json::from_str::<Value>(body.as_str().trim()) {
            fences.push(block.range());
            found.extend(as_tool_object(value, block.range()));
        }
    }

    let bytes = text.as_bytes();
    let mut pos = 0;
    while let Some(relative) = text[pos..].find('{') {
        let start = pos + relative;
        if let Some(fence) = fences.iter().find(|fence| fence.contains(&start)) {
            pos = fence.end;
            continue;
        }

        let Some(end) = find_object_end(bytes, start) else {
            pos = start + 1;
            continue;
        };
        match serde_json::from_str::<Value>(&text[start..end]) {
            Ok(value) => {
                found.extend(as_tool_object(value, start..end));
                // Valid JSON is consumed whole so nested objects are not matched on their own
                pos = end;
            }
            Err(_) => pos = start + 1,
        }
    }

    found.sort_by_key(|object| object.span.start);
    found
}

fn remove_spans(text: &str, objects: &[ToolObject]) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut last = 0;
    for object in objects {
        cleaned.push_str(&text[last..object.span.start]);
        last = object.span.end;
    }
    cleaned.push_str(&text[last..]);
    cleaned.trim().to_string()
}

fn to_calls(objects: &[ToolObject]) -> Vec<ToolCall> {
    objects
        .iter()
        .map(|object| ToolCall::from_json(object.name.as_str(), &object.arguments))
        .collect()
}

fn describe_tool(tool: &Value) -> Option<String> {
    let function = tool.get("function").unwrap_or(tool);
    let name = function.get("name")?.as_str()?;
    match function.get("description").and_then(Value::as_str) {
        Some(description) if !description.is_empty() => {
            Some(format!("- {}: {}", name, description))
        }
        _ => Some(format!("- {}", name)),
    }
}

impl Adapter for FencedJsonAdapter {
    fn normalize_tool_calls(&self, mut message: Message, valid_names: &HashSet<String>) -> Message {
        if message.has_tool_calls() {
            message.tool_calls = filter_hallucinated(message.tool_calls, valid_names);
            return message;
        }

        if message.content.is_empty() || valid_names.is_empty() {
            return message;
        }

        let objects = extract_tool_objects(&message.content);
        let recovered = filter_hallucinated(to_calls(&objects), valid_names);
        if recovered.is_empty() {
            return message;
        }

        tracing::info!(count = recovered.len(), "recovered JSON tool calls from content");
        message.content = remove_spans(&message.content, &objects);
        message.tool_calls = recovered;
        message
    }

    fn normalize_agent_message(&self, mut message: Message) -> Message {
        if message.has_tool_calls() || message.content.is_empty() {
            return message;
        }

        let objects = extract_tool_objects(&message.content);
        if objects.is_empty() {
            return message;
        }

        tracing::info!(count = objects.len(), "recovered JSON tool calls from agent output");
        message.tool_calls = number_recovered(to_calls(&objects));
        message.content = remove_spans(&message.content, &objects);
        message
    }

    fn inject_tool_guidance(&self, mut messages: Vec<Value>, tools: &[Value]) -> Vec<Value> {
        let descriptions: Vec<String> = tools.iter().filter_map(describe_tool).collect();
        if descriptions.is_empty() {
            return messages;
        }

        let guidance = formatdoc! {r#"
            You can call the following tools:
            {tools}

            To call a tool, reply with only a JSON object of the form
            {{"name": "<tool name>", "arguments": {{"<argument>": "<value>"}}}}
            Only call tools from this list. If no tool is needed, answer in plain text."#,
            tools = descriptions.join("\n"),
        };

        messages.insert(0, json!({"role": "system", "content": guidance}));
        messages
    }
}
