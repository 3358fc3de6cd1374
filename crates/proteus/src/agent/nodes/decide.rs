use std::str::FromStr;

use serde_json::json;

use super::NodeContext;
use crate::agent::crawler::lookup_docs_site;
use crate::agent::state::{AgentState, Intent, NextAction, StatePatch};
use crate::errors::AgentResult;
use crate::prompt_template::load_embedded_prompt;

/// Routing that needs no model call, if the classification is clear enough
pub fn fast_path(state: &AgentState) -> Option<NextAction> {
    match state.intent_type.unwrap_or_default() {
        Intent::Learning if has_crawl_target(state) => Some(NextAction::Crawl),
        Intent::Followup => Some(NextAction::ResolveContext),
        Intent::Question => Some(NextAction::Research),
        _ => None,
    }
}

fn has_crawl_target(state: &AgentState) -> bool {
    state.inferred_url.is_some() || lookup_docs_site(&state.entities, &state.message).is_some()
}

/// Read the model's choice of action. Anything unrecognised means research.
pub fn parse_action(reply: &str) -> NextAction {
    let action = reply.trim().trim_matches(|c: char| c == '`' || c == '"' || c == '.');
    NextAction::from_str(&action.to_lowercase()).unwrap_or_default()
}

pub async fn decide(ctx: &NodeContext<'_>, state: &AgentState) -> AgentResult<StatePatch> {
    let action = match fast_path(state) {
        Some(action) => action,
        None => {
            let prompt = load_embedded_prompt(
                "decide.md",
                &json!({
                    "message": state.message,
                    "intent": state.intent_type.unwrap_or_default(),
                    "entities": state.entities,
                    "inferred_url": state.inferred_url.as_deref().unwrap_or("none"),
                }),
            )?;
            let reply = ctx.generate(&ctx.config.orchestrator_model, &prompt).await?;
            parse_action(&reply)
        }
    };
    tracing::info!(%action, "decided next action");

    Ok(StatePatch {
        next_action: Some(action),
        ..Default::default()
    })
}
