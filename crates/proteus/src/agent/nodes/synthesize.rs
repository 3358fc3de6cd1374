use serde_json::json;

use super::{excerpt, NodeContext};
use crate::agent::state::{AgentState, ResearchResult, StatePatch};
use crate::errors::AgentResult;
use crate::prompt_template::load_embedded_prompt;

const CONTEXT_EXCERPT_CHARS: usize = 500;
const MAX_SOURCES: usize = 5;

/// Draft an answer from the research summary and any stored excerpts
pub async fn synthesize(ctx: &NodeContext<'_>, state: &AgentState) -> AgentResult<StatePatch> {
    let results = state.research_results.as_deref().unwrap_or_default();
    let research_summary = if state.research_summary.is_empty() {
        "No research results available."
    } else {
        state.research_summary.as_str()
    };

    let prompt = load_embedded_prompt(
        "synthesize.md",
        &json!({
            "message": state.message,
            "research_summary": research_summary,
            "rag_context": stored_context(results),
        }),
    )?;
    let draft = ctx.generate(&ctx.config.synthesis_model, &prompt).await?;

    Ok(StatePatch {
        draft_response: Some(draft),
        sources: Some(unique_sources(results)),
        ..Default::default()
    })
}

pub fn stored_context(results: &[ResearchResult]) -> String {
    let parts: Vec<&str> = results
        .iter()
        .filter(|r| r.is_stored() && !r.content.is_empty())
        .map(|r| excerpt(&r.content, CONTEXT_EXCERPT_CHARS))
        .collect();
    if parts.is_empty() {
        "No stored context available.".to_string()
    } else {
        parts.join("\n")
    }
}

/// Distinct non-empty urls in first-seen order
pub fn unique_sources(results: &[ResearchResult]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for result in results {
        if sources.len() == MAX_SOURCES {
            break;
        }
        if !result.url.is_empty() && !sources.contains(&result.url) {
            sources.push(result.url.clone());
        }
    }
    sources
}
