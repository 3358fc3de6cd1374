use crate::agent::state::{AgentState, IngestionStatus, StatePatch};

/// Carry a followup forward without conversation history: research runs again on the message
pub fn resolve_context(state: &AgentState) -> StatePatch {
    StatePatch {
        research_summary: Some(format!("Followup context: {}", state.message)),
        ..Default::default()
    }
}

/// Fold the critic's feedback into the research summary for the next draft
pub fn revise(state: &AgentState) -> StatePatch {
    StatePatch {
        research_summary: Some(format!(
            "{}\n\nPrevious draft issues: {}",
            state.research_summary, state.critique_feedback
        )),
        ..Default::default()
    }
}

/// Publish the draft and record which optional stages ran
pub fn answer(state: &AgentState) -> StatePatch {
    let mut actions = Vec::new();
    if state.ingestion_status == Some(IngestionStatus::Success) {
        actions.push("crawl".to_string());
    }
    if state.research_results.is_some() {
        actions.push("research".to_string());
    }
    if state.critique_count > 1 {
        actions.push("revise".to_string());
    }
    actions.push("synthesize".to_string());

    StatePatch {
        final_response: Some(state.draft_response.clone()),
        actions_taken: Some(actions),
        ..Default::default()
    }
}
