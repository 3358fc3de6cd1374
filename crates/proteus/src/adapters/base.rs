use std::collections::HashSet;

use super::{filter_hallucinated, Adapter};
use crate::models::message::Message;

/// Adapter for models whose structured tool calls can be trusted apart from invented names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaseAdapter;

impl Adapter for BaseAdapter {
    fn normalize_tool_calls(&self, mut message: Message, valid_names: &HashSet<String>) -> Message {
        if message.has_tool_calls() {
            message.tool_calls = filter_hallucinated(message.tool_calls, valid_names);
        }
        message
    }

    fn normalize_agent_message(&self, message: Message) -> Message {
        message
    }
}
