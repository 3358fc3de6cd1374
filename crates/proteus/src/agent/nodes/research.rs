use serde_json::json;

use super::{excerpt, NodeContext};
use crate::agent::state::{AgentState, ResearchResult, StatePatch};
use crate::errors::AgentResult;
use crate::prompt_template::load_embedded_prompt;

const MAX_COLLECTIONS: usize = 3;
const HITS_PER_COLLECTION: usize = 3;
const SCORE_THRESHOLD: f64 = 0.7;
const QUERY_ENTITIES: usize = 3;
const MAX_WEB_RESULTS: usize = 5;
const SUMMARY_RESULTS: usize = 10;
const SUMMARY_EXCERPT_CHARS: usize = 500;

/// Gather evidence from stored collections and the web, then summarize it.
///
/// Each source fails on its own: an unreachable store or search engine just contributes nothing.
pub async fn research(ctx: &NodeContext<'_>, state: &AgentState) -> AgentResult<StatePatch> {
    let mut results = search_collections(ctx, &state.message).await;
    results.extend(search_web(ctx, state).await);
    tracing::info!(results = results.len(), "research gathered results");

    let summary = summarize(ctx, &state.message, &results).await?;

    Ok(StatePatch {
        research_results: Some(results),
        research_summary: Some(summary),
        ..Default::default()
    })
}

async fn search_collections(ctx: &NodeContext<'_>, message: &str) -> Vec<ResearchResult> {
    let collections = match ctx.store.list_collections().await {
        Ok(collections) if !collections.is_empty() => collections,
        Ok(_) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "vector store unavailable, skipping stored context");
            return Vec::new();
        }
    };

    let embedding = match ctx
        .llm
        .embed(&ctx.config.embedding_model, &[message.to_string()])
        .await
    {
        Ok(mut vectors) if !vectors.is_empty() => vectors.swap_remove(0),
        Ok(_) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to embed query, skipping stored context");
            return Vec::new();
        }
    };

    let mut results = Vec::new();
    for collection in collections.iter().take(MAX_COLLECTIONS) {
        let hits = match ctx
            .store
            .search(collection, &embedding, HITS_PER_COLLECTION, Some(SCORE_THRESHOLD))
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(collection = collection.as_str(), error = %e, "collection search failed");
                continue;
            }
        };
        results.extend(hits.iter().map(|hit| ResearchResult {
            source: format!("rag:{}", collection),
            content: hit.payload_str("text").to_string(),
            score: Some(hit.score),
            url: hit.payload_str("url").to_string(),
            title: None,
        }));
    }
    results
}

pub fn web_query(state: &AgentState) -> String {
    if state.entities.is_empty() {
        return state.message.clone();
    }
    let entities: Vec<&str> = state
        .entities
        .iter()
        .take(QUERY_ENTITIES)
        .map(String::as_str)
        .collect();
    format!("{} {}", state.message, entities.join(" "))
}

async fn search_web(ctx: &NodeContext<'_>, state: &AgentState) -> Vec<ResearchResult> {
    match ctx.search.search(&web_query(state)).await {
        Ok(results) => results
            .into_iter()
            .take(MAX_WEB_RESULTS)
            .map(|r| ResearchResult {
                source: "web".to_string(),
                content: r.content,
                score: None,
                url: r.url,
                title: Some(r.title),
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "web search failed");
            Vec::new()
        }
    }
}

/// The context block handed to the summarizer, or `None` when no result has content
pub fn summary_context(results: &[ResearchResult]) -> Option<String> {
    let parts: Vec<String> = results
        .iter()
        .take(SUMMARY_RESULTS)
        .filter(|r| !r.content.is_empty())
        .map(|r| format!("[{}] {}", r.source, excerpt(&r.content, SUMMARY_EXCERPT_CHARS)))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

async fn summarize(
    ctx: &NodeContext<'_>,
    query: &str,
    results: &[ResearchResult],
) -> AgentResult<String> {
    let Some(context) = summary_context(results) else {
        return Ok(String::new());
    };
    let prompt = load_embedded_prompt("summarize.md", &json!({ "query": query, "context": context }))?;
    match ctx.generate(&ctx.config.research_model, &prompt).await {
        Ok(summary) => Ok(summary),
        Err(e) => {
            tracing::warn!(error = %e, "summarization failed, continuing without a summary");
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::config::AgentConfig;
    use crate::clients::base::WebResult;
    use crate::clients::mock::{MockPageFetcher, MockVectorStore, MockWebSearch};
    use crate::providers::mock::MockCompletionClient;

    fn web_result(n: usize) -> WebResult {
        WebResult {
            title: format!("Result {}", n),
            content: format!("web content {}", n),
            url: format!("https://example.com/{}", n),
        }
    }

    #[test]
    fn test_web_query_uses_first_entities() {
        let mut state = AgentState::new("how do I stream", "c1");
        assert_eq!(web_query(&state), "how do I stream");
        state.entities = vec!["axum", "sse", "tokio", "hyper"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(web_query(&state), "how do I stream axum sse tokio");
    }

    #[tokio::test]
    async fn test_research_merges_sources_in_order() {
        let llm = MockCompletionClient::new(vec!["a concise summary"]);
        let store = MockVectorStore::new()
            .with_hits("fastapi_tiangolo_com", &[("Path params", "https://fastapi.tiangolo.com/a")])
            .with_failing("broken")
            .with_hits("docs_python_org", &[("The tutorial", "https://docs.python.org/3/t")])
            .with_hits("never_searched", &[("unused", "https://example.com")]);
        let search = MockWebSearch::new((0..7).map(web_result).collect());
        let fetcher = MockPageFetcher::new();
        let config = AgentConfig::new("qwen3:14b", "nomic-embed-text");
        let ctx = NodeContext {
            llm: &llm,
            store: &store,
            search: &search,
            fetcher: &fetcher,
            config: &config,
        };

        let mut state = AgentState::new("path parameters", "c1");
        state.entities = vec!["fastapi".to_string()];
        let patch = research(&ctx, &state).await.unwrap();

        let results = patch.research_results.unwrap();
        let sources: Vec<&str> = results.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(
            sources,
            vec![
                "rag:fastapi_tiangolo_com",
                "rag:docs_python_org",
                "web",
                "web",
                "web",
                "web",
                "web"
            ]
        );
        assert_eq!(results[0].content, "Path params");
        assert_eq!(results[2].title.as_deref(), Some("Result 0"));
        assert_eq!(patch.research_summary.as_deref(), Some("a concise summary"));
        assert_eq!(search.queries(), vec!["path parameters fastapi"]);

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("[rag:fastapi_tiangolo_com] Path params"));
        assert!(prompt.contains("[web] web content 4"));
    }

    #[tokio::test]
    async fn test_research_without_results_skips_summary() {
        let llm = MockCompletionClient::new(Vec::<String>::new());
        let store = MockVectorStore::new();
        let search = MockWebSearch::failing();
        let fetcher = MockPageFetcher::new();
        let config = AgentConfig::new("qwen3:14b", "nomic-embed-text");
        let ctx = NodeContext {
            llm: &llm,
            store: &store,
            search: &search,
            fetcher: &fetcher,
            config: &config,
        };

        let patch = research(&ctx, &AgentState::new("anything", "c1")).await.unwrap();
        assert_eq!(patch.research_results, Some(vec![]));
        assert_eq!(patch.research_summary.as_deref(), Some(""));
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_failed_summary_leaves_it_empty() {
        let llm = MockCompletionClient::new(Vec::<String>::new());
        let store = MockVectorStore::new();
        let search = MockWebSearch::new(vec![web_result(0)]);
        let fetcher = MockPageFetcher::new();
        let config = AgentConfig::new("qwen3:14b", "nomic-embed-text");
        let ctx = NodeContext {
            llm: &llm,
            store: &store,
            search: &search,
            fetcher: &fetcher,
            config: &config,
        };

        let patch = research(&ctx, &AgentState::new("anything", "c1")).await.unwrap();
        assert_eq!(patch.research_results.map(|r| r.len()), Some(1));
        assert_eq!(patch.research_summary.as_deref(), Some(""));
        assert_eq!(llm.prompts().len(), 1);
    }

    #[test]
    fn test_summary_context_truncates_and_skips_empty() {
        let results = vec![
            ResearchResult {
                source: "web".to_string(),
                content: "x".repeat(600),
                score: None,
                url: String::new(),
                title: None,
            },
            ResearchResult {
                source: "web".to_string(),
                content: String::new(),
                score: None,
                url: String::new(),
                title: None,
            },
        ];
        let context = summary_context(&results).unwrap();
        assert_eq!(context, format!("[web] {}", "x".repeat(500)));
        assert_eq!(summary_context(&results[1..]), None);
    }
}
