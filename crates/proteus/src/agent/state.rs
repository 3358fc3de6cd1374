use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Intent {
    Learning,
    #[default]
    Question,
    Followup,
    Command,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NextAction {
    Crawl,
    ResolveContext,
    #[default]
    Research,
    Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IngestionStatus {
    Success,
    Failed,
}

/// One piece of gathered evidence. `source` is `rag:<collection>` or `web`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub source: String,
    pub content: String,
    pub score: Option<f32>,
    pub url: String,
    pub title: Option<String>,
}

impl ResearchResult {
    pub fn is_stored(&self) -> bool {
        self.source.starts_with("rag:")
    }
}

/// Working record for a single orchestration run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentState {
    pub message: String,
    pub conversation_id: String,

    pub intent_type: Option<Intent>,
    pub confidence: f32,
    pub entities: Vec<String>,
    pub inferred_url: Option<String>,

    pub next_action: Option<NextAction>,

    /// `None` until the research node has run
    pub research_results: Option<Vec<ResearchResult>>,
    pub research_summary: String,

    pub ingestion_status: Option<IngestionStatus>,
    pub ingestion_message: String,
    pub pages_indexed: usize,
    pub collection_name: Option<String>,

    pub draft_response: String,
    pub sources: Vec<String>,

    pub is_approved: bool,
    pub critique_count: u32,
    pub critique_score: Option<f32>,
    pub critique_feedback: String,

    pub final_response: Option<String>,
    pub actions_taken: Vec<String>,
}

/// The fields a node produced. Anything left as `None` keeps its current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub intent_type: Option<Intent>,
    pub confidence: Option<f32>,
    pub entities: Option<Vec<String>>,
    pub inferred_url: Option<String>,
    pub next_action: Option<NextAction>,
    pub research_results: Option<Vec<ResearchResult>>,
    pub research_summary: Option<String>,
    pub ingestion_status: Option<IngestionStatus>,
    pub ingestion_message: Option<String>,
    pub pages_indexed: Option<usize>,
    pub collection_name: Option<String>,
    pub draft_response: Option<String>,
    pub sources: Option<Vec<String>>,
    pub is_approved: Option<bool>,
    pub critique_count: Option<u32>,
    pub critique_score: Option<f32>,
    pub critique_feedback: Option<String>,
    pub final_response: Option<String>,
    pub actions_taken: Option<Vec<String>>,
}

macro_rules! apply {
    ($state:ident, $patch:ident; $($field:ident),* $(,)?) => {
        $(if let Some(value) = $patch.$field {
            $state.$field = value;
        })*
    };
}

macro_rules! apply_some {
    ($state:ident, $patch:ident; $($field:ident),* $(,)?) => {
        $(if let Some(value) = $patch.$field {
            $state.$field = Some(value);
        })*
    };
}

impl AgentState {
    pub fn new<M: Into<String>, C: Into<String>>(message: M, conversation_id: C) -> Self {
        Self {
            message: message.into(),
            conversation_id: conversation_id.into(),
            ..Default::default()
        }
    }

    pub fn merge(self, patch: StatePatch) -> Self {
        let mut state = self;
        apply!(state, patch;
            confidence,
            entities,
            research_summary,
            ingestion_message,
            pages_indexed,
            draft_response,
            sources,
            is_approved,
            critique_count,
            critique_feedback,
            actions_taken,
        );
        apply_some!(state, patch;
            intent_type,
            inferred_url,
            next_action,
            research_results,
            ingestion_status,
            collection_name,
            critique_score,
            final_response,
        );
        state
    }
}
