use serde_json::{json, Value};

use super::{parse_json_reply, NodeContext};
use crate::agent::graph::MAX_CRITIQUES;
use crate::agent::state::{AgentState, StatePatch};
use crate::errors::AgentResult;
use crate::prompt_template::load_embedded_prompt;

pub const AUTO_APPROVED_FEEDBACK: &str = "Auto-approved after maximum critique attempts.";

/// Review the draft. Once the attempt bound is reached the draft is approved without asking
/// the model again.
pub async fn critique(ctx: &NodeContext<'_>, state: &AgentState) -> AgentResult<StatePatch> {
    let critique_count = state.critique_count + 1;
    if critique_count >= MAX_CRITIQUES {
        tracing::info!(critique_count, "approving draft after maximum critiques");
        return Ok(StatePatch {
            is_approved: Some(true),
            critique_count: Some(critique_count),
            critique_feedback: Some(AUTO_APPROVED_FEEDBACK.to_string()),
            ..Default::default()
        });
    }

    let research_summary = if state.research_summary.is_empty() {
        "No research available."
    } else {
        state.research_summary.as_str()
    };
    let prompt = load_embedded_prompt(
        "critique.md",
        &json!({
            "message": state.message,
            "draft_response": state.draft_response,
            "research_summary": research_summary,
        }),
    )?;
    let reply = ctx.generate(&ctx.config.critic_model, &prompt).await?;

    let verdict = parse_verdict(&reply);
    tracing::info!(
        critique_count,
        approved = verdict.approved,
        score = verdict.score,
        "critiqued draft"
    );

    Ok(StatePatch {
        is_approved: Some(verdict.approved),
        critique_count: Some(critique_count),
        critique_score: Some(verdict.score),
        critique_feedback: Some(verdict.feedback),
        ..Default::default()
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub approved: bool,
    pub score: f32,
    pub feedback: String,
}

/// Read the critic's JSON. Output that cannot be read approves the draft.
pub fn parse_verdict(reply: &str) -> Verdict {
    let Some(data) = parse_json_reply(reply) else {
        return Verdict {
            approved: true,
            score: 0.7,
            feedback: String::new(),
        };
    };

    let approved = data
        .get("is_approved")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let score = data.get("score").and_then(Value::as_f64).unwrap_or(0.8) as f32;

    let mut lines = Vec::new();
    if !approved {
        let issues = string_list(data.get("issues"));
        if !issues.is_empty() {
            lines.push(format!("Issues: {}", issues.join("; ")));
        }
        let suggestions = string_list(data.get("suggestions"));
        if !suggestions.is_empty() {
            lines.push(format!("Suggestions: {}", suggestions.join("; ")));
        }
    }

    Verdict {
        approved,
        score,
        feedback: lines.join("\n"),
    }
}

fn string_list(value: Option<&Value>) -> Vec<&str> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
