//! Clients for the collaborators the agent researches with: a vector store, a web search engine,
//! and plain HTTP page fetching for crawls.
pub mod base;
pub mod fetcher;
pub mod qdrant;
pub mod searxng;

#[cfg(test)]
pub mod mock;
