use std::collections::{HashSet, VecDeque};

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::json;
use sha2::{Digest, Sha256};
use url::Url;
use uuid::Uuid;

use crate::clients::base::{PageFetcher, Point, VectorStore};
use crate::errors::AgentResult;
use crate::providers::base::CompletionClient;

/// Documentation sites we know how to find from a keyword alone
pub const DOCS_SITES: &[(&str, &str)] = &[
    ("fastapi", "https://fastapi.tiangolo.com/"),
    ("requests", "https://requests.readthedocs.io/"),
    ("django", "https://docs.djangoproject.com/"),
    ("flask", "https://flask.palletsprojects.com/"),
    ("numpy", "https://numpy.org/doc/stable/"),
    ("pandas", "https://pandas.pydata.org/docs/"),
    ("python", "https://docs.python.org/3/"),
    ("langchain", "https://python.langchain.com/docs/"),
    ("langgraph", "https://langchain-ai.github.io/langgraph/"),
];

const MIN_PAGE_CHARS: usize = 100;
const CHUNK_CHARS: usize = 1000;
const SKIPPED_EXTENSIONS: &[&str] = &[".png", ".jpg", ".pdf", ".zip"];
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "header", "footer"];

lazy_static! {
    static ref LINK_SELECTOR: Selector = Selector::parse("a[href]").unwrap();
}

/// Find a documentation url for a message, preferring one the interpreter already inferred
pub fn resolve_url(inferred_url: Option<&str>, entities: &[String], message: &str) -> Option<String> {
    if let Some(url) = inferred_url.filter(|url| !url.trim().is_empty()) {
        return Some(url.trim().to_string());
    }
    lookup_docs_site(entities, message).map(str::to_string)
}

pub fn lookup_docs_site(entities: &[String], message: &str) -> Option<&'static str> {
    let mut haystack = entities.join(" ");
    haystack.push(' ');
    haystack.push_str(message);
    let haystack = haystack.to_lowercase();

    DOCS_SITES
        .iter()
        .find(|(keyword, _)| haystack.contains(keyword))
        .map(|(_, url)| *url)
}

/// Collection name for a crawl root: the host with separators replaced, plus a path digest when
/// the crawl starts below the site root.
pub fn collection_name(url: &Url) -> String {
    let mut netloc = url.host_str().unwrap_or_default().to_string();
    if let Some(port) = url.port() {
        netloc.push_str(&format!(":{}", port));
    }
    let name = netloc.replace(['.', '-'], "_");

    let path = url.path();
    if path.is_empty() || path == "/" {
        return name;
    }
    let digest = format!("{:x}", Sha256::digest(path.as_bytes()));
    format!("{}_{}", name, &digest[..8])
}

/// Stable id for a chunk, so crawling the same page again overwrites instead of duplicating
pub fn point_id(url: &str, chunk_index: usize) -> String {
    let digest = Sha256::digest(format!("{}:{}", url, chunk_index).as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}

/// Readable text and followable links of an html page.
///
/// Text excludes script, style and page chrome, one trimmed non-empty line per text run.
/// Links are absolute http(s) urls without fragments, excluding binary assets.
pub fn extract_page(html: &str, page_url: &Url) -> (String, Vec<Url>) {
    let document = Html::parse_document(html);

    let mut runs = Vec::new();
    collect_text(document.root_element(), &mut runs);
    let text = runs
        .iter()
        .flat_map(|run| run.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let links = document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| page_url.join(href).ok())
        .filter(|link| matches!(link.scheme(), "http" | "https"))
        .filter(|link| {
            let path = link.path().to_lowercase();
            !SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        })
        .map(|mut link| {
            link.set_fragment(None);
            link
        })
        .collect();

    (text, links)
}

fn collect_text(element: ElementRef, runs: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => runs.push(String::from(&**text)),
            Node::Element(el) if SKIPPED_ELEMENTS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, runs);
                }
            }
            _ => {}
        }
    }
}

/// Split text after sentence punctuation, then pack sentences into chunks below `max_chars`.
/// A single sentence longer than the limit becomes its own chunk.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in split_sentences(text) {
        let len = sentence.chars().count();
        if current_len + len < max_chars {
            if !current.is_empty() {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(sentence);
            current_len += len;
        } else {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(sentence);
            current_len = len;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            sentences.push(&text[start..i]);
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if !next.is_whitespace() {
                    break;
                }
                end = j + next.len_utf8();
                chars.next();
            }
            start = end;
            prev = None;
            continue;
        }
        prev = Some(c);
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Breadth-first crawl of one documentation site into a vector store collection
pub struct Crawler<'a> {
    pub llm: &'a dyn CompletionClient,
    pub store: &'a dyn VectorStore,
    pub fetcher: &'a dyn PageFetcher,
    pub embedding_model: &'a str,
    pub vector_size: usize,
    pub max_pages: usize,
}

impl Crawler<'_> {
    /// Crawl from `start`, returning how many pages were indexed.
    ///
    /// Only failing to prepare the collection is an error; pages that cannot be fetched,
    /// embedded or stored are skipped.
    pub async fn crawl_and_index(&self, start: &Url, collection: &str) -> AgentResult<usize> {
        if self.store.create_collection(collection, self.vector_size).await? {
            tracing::info!(collection, "created collection");
        }

        let mut queue = VecDeque::from([start.clone()]);
        let mut seen: HashSet<String> = HashSet::from([start.to_string()]);
        let mut indexed = 0;
        let mut fetched = 0;

        while let Some(url) = queue.pop_front() {
            if indexed >= self.max_pages || fetched >= self.max_pages * 5 {
                break;
            }
            fetched += 1;

            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::debug!(%url, error = %e, "skipping page");
                    continue;
                }
            };
            let (text, links) = extract_page(&html, &url);

            for link in links {
                if same_site(&link, start) && seen.insert(link.to_string()) {
                    queue.push_back(link);
                }
            }

            if text.chars().count() < MIN_PAGE_CHARS {
                tracing::debug!(%url, "skipping page without enough text");
                continue;
            }

            match self.index_page(&url, &text, collection).await {
                Ok(0) => {}
                Ok(_) => indexed += 1,
                Err(e) => tracing::debug!(%url, error = %e, "failed to index page"),
            }
        }

        tracing::info!(collection, indexed, fetched, "crawl finished");
        Ok(indexed)
    }

    async fn index_page(&self, url: &Url, text: &str, collection: &str) -> AgentResult<usize> {
        let chunks: Vec<(usize, String)> = chunk_text(text, CHUNK_CHARS)
            .into_iter()
            .enumerate()
            .filter(|(_, chunk)| !chunk.trim().is_empty())
            .collect();
        if chunks.is_empty() {
            return Ok(0);
        }

        let inputs: Vec<String> = chunks.iter().map(|(_, chunk)| chunk.clone()).collect();
        let vectors = self.llm.embed(self.embedding_model, &inputs).await?;

        let points = chunks
            .into_iter()
            .zip(vectors)
            .map(|((index, chunk), vector)| Point {
                id: point_id(url.as_str(), index),
                vector,
                payload: json!({"url": url.as_str(), "text": chunk, "chunk_index": index}),
            })
            .collect();

        Ok(self.store.upsert(collection, points).await?)
    }
}

fn same_site(link: &Url, start: &Url) -> bool {
    link.host_str() == start.host_str() && link.port_or_known_default() == start.port_or_known_default()
}
