//! Per-model strategies for repairing tool-calling output.
//!
//! Local models do not reliably use the runtime's structured tool-call channel. Depending on the
//! family they fall back to Hermes style XML, or to JSON objects written into the text. An
//! [`Adapter`] recovers those calls into [`ToolCall`]s and drops calls naming tools the caller
//! never declared.
pub mod base;
pub mod fenced_json;
pub mod hermes;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use lazy_static::lazy_static;
use serde_json::Value;

use crate::models::message::Message;
use crate::models::tool::ToolCall;

pub use base::BaseAdapter;
pub use fenced_json::FencedJsonAdapter;
pub use hermes::HermesXmlAdapter;

pub trait Adapter: Send + Sync {
    /// Normalize a raw runtime message against the caller's declared tool names.
    ///
    /// Structured calls already on the message are only filtered. Content is scanned for
    /// embedded calls only when the message has none and the caller declared a tool surface.
    fn normalize_tool_calls(&self, message: Message, valid_names: &HashSet<String>) -> Message;

    /// Normalize a message produced for the agent itself, where no tool surface is declared.
    fn normalize_agent_message(&self, message: Message) -> Message;

    /// Give the model extra instructions about the declared tools before the chat call
    fn inject_tool_guidance(&self, messages: Vec<Value>, _tools: &[Value]) -> Vec<Value> {
        messages
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelAdapter {
    Base(BaseAdapter),
    HermesXml(HermesXmlAdapter),
    FencedJson(FencedJsonAdapter),
}

impl ModelAdapter {
    pub fn name(&self) -> &'static str {
        match self {
            ModelAdapter::Base(_) => "base",
            ModelAdapter::HermesXml(_) => "hermes_xml",
            ModelAdapter::FencedJson(_) => "fenced_json",
        }
    }

    fn inner(&self) -> &dyn Adapter {
        match self {
            ModelAdapter::Base(adapter) => adapter,
            ModelAdapter::HermesXml(adapter) => adapter,
            ModelAdapter::FencedJson(adapter) => adapter,
        }
    }
}

impl Adapter for ModelAdapter {
    fn normalize_tool_calls(&self, message: Message, valid_names: &HashSet<String>) -> Message {
        self.inner().normalize_tool_calls(message, valid_names)
    }

    fn normalize_agent_message(&self, message: Message) -> Message {
        self.inner().normalize_agent_message(message)
    }

    fn inject_tool_guidance(&self, messages: Vec<Value>, tools: &[Value]) -> Vec<Value> {
        self.inner().inject_tool_guidance(messages, tools)
    }
}

/// Prefix rules, checked in order. Coder variants come before their generic family.
const ADAPTER_RULES: &[(&str, ModelAdapter)] = &[
    ("qwen3-coder", ModelAdapter::HermesXml(HermesXmlAdapter)),
    ("qwen2.5-coder", ModelAdapter::FencedJson(FencedJsonAdapter)),
    ("qwen3", ModelAdapter::HermesXml(HermesXmlAdapter)),
];

lazy_static! {
    static ref ADAPTER_CACHE: Mutex<HashMap<String, Arc<ModelAdapter>>> =
        Mutex::new(HashMap::new());
}

fn match_adapter(model: &str) -> ModelAdapter {
    let lowered = model.to_lowercase();
    // Registry namespaces ("library/qwen3:14b") do not take part in matching
    let base_name = lowered.rsplit('/').next().unwrap_or(lowered.as_str());

    ADAPTER_RULES
        .iter()
        .find(|(prefix, _)| base_name.starts_with(prefix))
        .map(|(_, adapter)| *adapter)
        .unwrap_or(ModelAdapter::Base(BaseAdapter))
}

/// Pick the adapter for a model identifier. Results are cached for the life of the process.
pub fn select_adapter(model: &str) -> Arc<ModelAdapter> {
    let mut cache = ADAPTER_CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    cache
        .entry(model.to_string())
        .or_insert_with(|| {
            let adapter = match_adapter(model);
            tracing::debug!(model, adapter = adapter.name(), "selected model adapter");
            Arc::new(adapter)
        })
        .clone()
}

/// Keep only calls naming a declared tool. No declared tools means nothing is filtered.
pub fn filter_hallucinated(calls: Vec<ToolCall>, valid_names: &HashSet<String>) -> Vec<ToolCall> {
    if valid_names.is_empty() {
        return calls;
    }

    calls
        .into_iter()
        .filter(|call| {
            let known = valid_names.contains(&call.name);
            if !known {
                tracing::debug!(name = %call.name, "dropping call to undeclared tool");
            }
            known
        })
        .collect()
}

/// Give recovered agent-path calls stable, response-local ids
pub(crate) fn number_recovered(calls: Vec<ToolCall>) -> Vec<ToolCall> {
    calls
        .into_iter()
        .enumerate()
        .map(|(i, call)| call.with_id(format!("recovered_{}", i)))
        .collect()
}
