use std::collections::{BTreeMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;

use super::{filter_hallucinated, number_recovered, Adapter};
use crate::models::message::Message;
use crate::models::tool::ToolCall;

lazy_static! {
    static ref THINK_BLOCK: Regex = Regex::new(r"(?s)<think>.*?</think>").unwrap();
    static ref FUNCTION_BLOCK: Regex =
        Regex::new(r"(?s)<function=([^>]+)>(.*?)</function>").unwrap();
    static ref PARAMETER: Regex = Regex::new(r"(?s)<parameter=([^>]+)>(.*?)</parameter>").unwrap();
}

/// Adapter for the qwen3 family.
///
/// With many tool schemas in context these models stop using structured calls and write Hermes
/// style markup into the content instead:
///
/// ```text
/// <function=NAME><parameter=KEY>VALUE</parameter></function>
/// ```
///
/// They also prefix answers with `<think>` reasoning blocks, which are always removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HermesXmlAdapter;

/// Remove `<think>` blocks. Content without one is returned untouched.
pub fn strip_think_tags(text: &str) -> String {
    if THINK_BLOCK.is_match(text) {
        THINK_BLOCK.replace_all(text, "").trim().to_string()
    } else {
        text.to_string()
    }
}

/// Recover every function block in source order, returning the calls and the content without them
pub fn parse_xml_tool_calls(text: &str) -> (Vec<ToolCall>, String) {
    let calls: Vec<ToolCall> = FUNCTION_BLOCK
        .captures_iter(text)
        .map(|block| {
            let body = &block[2];
            let arguments: BTreeMap<String, String> = PARAMETER
                .captures_iter(body)
                .map(|param| (param[1].trim().to_string(), param[2].to_string()))
                .collect();
            ToolCall::new(block[1].trim(), arguments)
        })
        .collect();

    if calls.is_empty() {
        return (calls, text.to_string());
    }

    let cleaned = FUNCTION_BLOCK.replace_all(text, "").trim().to_string();
    (calls, cleaned)
}

impl Adapter for HermesXmlAdapter {
    fn normalize_tool_calls(&self, mut message: Message, valid_names: &HashSet<String>) -> Message {
        message.content = strip_think_tags(&message.content);

        if message.has_tool_calls() {
            message.tool_calls = filter_hallucinated(message.tool_calls, valid_names);
            return message;
        }

        if message.content.is_empty() || valid_names.is_empty() {
            return message;
        }

        let (parsed, cleaned) = parse_xml_tool_calls(&message.content);
        let recovered = filter_hallucinated(parsed, valid_names);
        if recovered.is_empty() {
            return message;
        }

        tracing::info!(count = recovered.len(), "recovered XML tool calls from content");
        message.content = cleaned;
        message.tool_calls = recovered;
        message
    }

    fn normalize_agent_message(&self, mut message: Message) -> Message {
        message.content = strip_think_tags(&message.content);
        if message.has_tool_calls() || message.content.is_empty() {
            return message;
        }

        let (parsed, cleaned) = parse_xml_tool_calls(&message.content);
        if parsed.is_empty() {
            return message;
        }

        tracing::info!(count = parsed.len(), "recovered XML tool calls from agent output");
        message.content = cleaned;
        message.tool_calls = number_recovered(parsed);
        message
    }
}
