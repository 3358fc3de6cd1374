//! The orchestration state machine that turns one user message into a reviewed answer.
//!
//! A run starts at `interpret`, moves through the nodes in [`graph`] one at a time, and ends at
//! `answer`. Every node reads the shared [`state::AgentState`] and returns a
//! [`state::StatePatch`] holding only the fields it produced.
pub mod config;
pub mod crawler;
pub mod graph;
pub mod nodes;
pub mod state;

pub use config::AgentConfig;
pub use graph::{ContextResolver, Node, NodeEvent, Orchestrator};
pub use state::{AgentState, Intent, NextAction, StatePatch};
