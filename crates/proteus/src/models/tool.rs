use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A request to invoke a tool, as produced by a model.
///
/// Argument values are kept as raw strings: typing them is up to whoever executes the tool.
/// The id is only meaningful within the response that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
}

impl ToolCall {
    pub fn new<S: Into<String>>(name: S, arguments: BTreeMap<String, String>) -> Self {
        Self {
            id: generate_call_id(),
            name: name.into(),
            arguments,
        }
    }

    /// Build a call from a JSON arguments value, which may be an object or a JSON-encoded string
    pub fn from_json<S: Into<String>>(name: S, arguments: &Value) -> Self {
        Self::new(name, arguments_from_value(arguments))
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = id.into();
        self
    }

    /// The arguments as a JSON object
    pub fn arguments_value(&self) -> Value {
        let map: Map<String, Value> = self
            .arguments
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }

    /// OpenAI tool-call object, with the arguments serialized into a string
    pub fn to_openai_spec(&self) -> Value {
        json!({
            "id": self.id,
            "type": "function",
            "function": {
                "name": self.name,
                "arguments": self.arguments_value().to_string(),
            }
        })
    }
}

pub fn generate_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

/// Flatten a JSON arguments value into raw strings.
///
/// Strings are taken as-is, every other value keeps its JSON text. A string holding a JSON object
/// (the OpenAI wire convention) is decoded first. Anything that is not an object yields no arguments.
pub fn arguments_from_value(value: &Value) -> BTreeMap<String, String> {
    let object = match value {
        Value::Object(map) => map.clone(),
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(map)) => map,
            _ => return BTreeMap::new(),
        },
        _ => return BTreeMap::new(),
    };

    object
        .into_iter()
        .map(|(key, value)| {
            let raw = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, raw)
        })
        .collect()
}
