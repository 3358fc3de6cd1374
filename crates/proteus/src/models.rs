//! These models represent the messages passed between callers, the gateway and the LLM runtime
//!
//! Callers speak the OpenAI chat format, the runtime speaks its own native chat format, and
//! model families each have their own way of (mis)representing tool calls. Everything is
//! converted into [`message::Message`] as early as possible, and converted back out only at the
//! transport boundary.
pub mod message;
pub mod tool;
