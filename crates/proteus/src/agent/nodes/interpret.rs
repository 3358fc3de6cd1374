use std::str::FromStr;

use serde_json::{json, Value};

use super::{parse_json_reply, NodeContext};
use crate::agent::state::{AgentState, Intent, StatePatch};
use crate::errors::AgentResult;
use crate::prompt_template::load_embedded_prompt;

/// Classify the message. A reply that cannot be read as a classification falls back to a
/// plain question rather than failing the run.
pub async fn interpret(ctx: &NodeContext<'_>, state: &AgentState) -> AgentResult<StatePatch> {
    let prompt = load_embedded_prompt("interpret.md", &json!({ "message": state.message }))?;
    let reply = ctx.generate(&ctx.config.interpreter_model, &prompt).await?;
    let patch = parse_classification(&reply);
    tracing::info!(
        intent = ?patch.intent_type,
        inferred_url = ?patch.inferred_url,
        "interpreted message"
    );
    Ok(patch)
}

pub fn parse_classification(reply: &str) -> StatePatch {
    let Some(data) = parse_json_reply(reply) else {
        tracing::warn!("could not parse intent classification, treating as a question");
        return StatePatch {
            intent_type: Some(Intent::Question),
            confidence: Some(0.5),
            entities: Some(Vec::new()),
            ..Default::default()
        };
    };

    let intent = data
        .get("intent")
        .and_then(Value::as_str)
        .and_then(|intent| Intent::from_str(intent.trim()).ok())
        .unwrap_or_default();
    let confidence = match data.get("confidence") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .unwrap_or(0.5) as f32;
    let entities = data
        .get("entities")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let inferred_url = data
        .get("inferred_url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty() && !url.eq_ignore_ascii_case("null"))
        .map(str::to_string);

    StatePatch {
        intent_type: Some(intent),
        confidence: Some(confidence),
        entities: Some(entities),
        inferred_url,
        ..Default::default()
    }
}
