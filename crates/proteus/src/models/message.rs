use super::tool::ToolCall;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A chat message: text content plus any tool calls attached to it.
///
/// Raw runtime output and adapter output share this shape. After an adapter has normalized a
/// message, every entry in `tool_calls` names a tool the caller declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    pub fn new(role: Role) -> Self {
        Message {
            role,
            content: String::new(),
            tool_calls: Vec::new(),
        }
    }

    pub fn system() -> Self {
        Message::new(Role::System)
    }

    pub fn user() -> Self {
        Message::new(Role::User)
    }

    pub fn assistant() -> Self {
        Message::new(Role::Assistant)
    }

    /// Append text to the message content
    pub fn with_text<S: AsRef<str>>(mut self, text: S) -> Self {
        self.content.push_str(text.as_ref());
        self
    }

    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
