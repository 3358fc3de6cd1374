use url::Url;

use super::NodeContext;
use crate::agent::crawler::{collection_name, resolve_url, Crawler};
use crate::agent::state::{AgentState, IngestionStatus, StatePatch};
use crate::errors::AgentResult;

/// Crawl and index the documentation the user asked for.
///
/// Never fails the run: every problem becomes a failed ingestion status with a message.
pub async fn crawl(ctx: &NodeContext<'_>, state: &AgentState) -> AgentResult<StatePatch> {
    let Some(target) = resolve_url(
        state.inferred_url.as_deref(),
        &state.entities,
        &state.message,
    ) else {
        return Ok(failed("Could not determine documentation URL to index.".to_string()));
    };

    let url = match Url::parse(&target) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        Ok(_) => return Ok(failed(format!("Failed to index {}: unsupported scheme", target))),
        Err(e) => return Ok(failed(format!("Failed to index {}: {}", target, e))),
    };
    let collection = collection_name(&url);

    let crawler = Crawler {
        llm: ctx.llm,
        store: ctx.store,
        fetcher: ctx.fetcher,
        embedding_model: &ctx.config.embedding_model,
        vector_size: ctx.config.vector_size,
        max_pages: ctx.config.max_crawl_pages,
    };

    match crawler.crawl_and_index(&url, &collection).await {
        Ok(0) => Ok(failed(format!("No indexable pages found at {}", target))),
        Ok(pages) => Ok(StatePatch {
            ingestion_status: Some(IngestionStatus::Success),
            ingestion_message: Some(format!("Indexed {} pages from {}", pages, target)),
            pages_indexed: Some(pages),
            collection_name: Some(collection),
            ..Default::default()
        }),
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "crawl failed");
            Ok(failed(format!("Failed to index {}: {}", target, e)))
        }
    }
}

fn failed(message: String) -> StatePatch {
    StatePatch {
        ingestion_status: Some(IngestionStatus::Failed),
        ingestion_message: Some(message),
        pages_indexed: Some(0),
        ..Default::default()
    }
}

/// Narrate the ingestion outcome. Ingestion narratives skip review.
pub fn ingest_response(state: &AgentState) -> StatePatch {
    let draft = match state.ingestion_status {
        Some(IngestionStatus::Success) => format!(
            "I've indexed the documentation you requested. Processed {} pages and stored them in \
             the '{}' collection. You can now ask questions about this documentation.",
            state.pages_indexed,
            state.collection_name.as_deref().unwrap_or_default()
        ),
        _ => format!(
            "I encountered an issue while indexing: {}",
            state.ingestion_message
        ),
    };

    StatePatch {
        draft_response: Some(draft),
        is_approved: Some(true),
        ..Default::default()
    }
}
