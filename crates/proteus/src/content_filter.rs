//! Per-response rewriting of assistant text for clients that cannot render markdown.
//!
//! Some terminal clients highlight markdown instead of rendering it, so emphasis markers and
//! horizontal rules only add noise. A filter is created for each streaming response, fed the
//! content as it arrives, and flushed once at the end. Lines are only rewritten once they are
//! complete, so how the text is chunked never changes the output.
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HORIZONTAL_RULE: Regex = Regex::new(r"^\s*(?:-{3,}|\*{3,}|_{3,})\s*$").unwrap();
    static ref BOLD: Regex = Regex::new(r"\*\*(.+?)\*\*").unwrap();
    static ref BOLD_UNDERSCORE: Regex = Regex::new(r"__(.+?)__").unwrap();
}

const FENCE: &str = "```";

pub trait Filter {
    /// Accept more text and return whatever is ready to emit
    fn feed(&mut self, text: &str) -> String;

    /// Return anything still buffered. The filter is reset afterwards.
    fn flush(&mut self) -> String;
}

#[derive(Debug, Default)]
pub struct PassthroughFilter;

impl Filter for PassthroughFilter {
    fn feed(&mut self, text: &str) -> String {
        text.to_string()
    }

    fn flush(&mut self) -> String {
        String::new()
    }
}

/// Strips emphasis markers and horizontal rules outside code fences
#[derive(Debug, Default)]
pub struct MarkupStripFilter {
    buffer: String,
    in_fence: bool,
}

impl MarkupStripFilter {
    pub fn new() -> Self {
        Self::default()
    }

    fn transform(&mut self, text: &str) -> String {
        text.split('\n')
            .map(|line| self.transform_line(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn transform_line(&mut self, line: &str) -> String {
        if line.trim().starts_with(FENCE) {
            self.in_fence = !self.in_fence;
            return line.to_string();
        }

        if self.in_fence {
            return line.to_string();
        }

        if HORIZONTAL_RULE.is_match(line) {
            return String::new();
        }

        let line = BOLD.replace_all(line, "$1");
        let line = BOLD_UNDERSCORE.replace_all(&line, "$1");
        let line = strip_italic(&line, '*');
        strip_italic(&line, '_')
    }
}

impl Filter for MarkupStripFilter {
    fn feed(&mut self, text: &str) -> String {
        self.buffer.push_str(text);
        let Some(last_newline) = self.buffer.rfind('\n') else {
            return String::new();
        };

        let rest = self.buffer.split_off(last_newline + 1);
        let ready = std::mem::replace(&mut self.buffer, rest);
        self.transform(&ready)
    }

    fn flush(&mut self) -> String {
        let remaining = std::mem::take(&mut self.buffer);
        let output = if remaining.is_empty() {
            String::new()
        } else {
            self.transform(&remaining)
        };
        self.in_fence = false;
        output
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace `<m>text<m>` with `text`, where the opening marker is not preceded by a word character
/// or followed by whitespace, and the closing marker is not preceded by whitespace or followed by
/// a word character. Matches are taken left to right, shortest first, without overlapping.
fn strip_italic(line: &str, marker: char) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while i < chars.len() {
        let opens = chars[i] == marker
            && (i == 0 || !is_word_char(chars[i - 1]))
            && chars.get(i + 1).is_some_and(|c| !c.is_whitespace());

        let close = if opens {
            (i + 2..chars.len()).find(|&j| {
                chars[j] == marker
                    && !chars[j - 1].is_whitespace()
                    && chars.get(j + 1).map_or(true, |c| !is_word_char(*c))
            })
        } else {
            None
        };

        match close {
            Some(j) => {
                out.extend(&chars[i + 1..j]);
                i = j + 1;
            }
            None => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }
    out
}

/// The filter variants a response can be streamed through
#[derive(Debug)]
pub enum ContentFilter {
    Passthrough(PassthroughFilter),
    LineMarkupStrip(MarkupStripFilter),
}

impl ContentFilter {
    pub fn passthrough() -> Self {
        ContentFilter::Passthrough(PassthroughFilter)
    }

    pub fn markup_strip() -> Self {
        ContentFilter::LineMarkupStrip(MarkupStripFilter::new())
    }

    /// Run a complete text through the filter in one go
    pub fn apply(mut self, text: &str) -> String {
        let mut output = self.feed(text);
        output.push_str(&self.flush());
        output
    }
}

impl Filter for ContentFilter {
    fn feed(&mut self, text: &str) -> String {
        match self {
            ContentFilter::Passthrough(filter) => filter.feed(text),
            ContentFilter::LineMarkupStrip(filter) => filter.feed(text),
        }
    }

    fn flush(&mut self) -> String {
        match self {
            ContentFilter::Passthrough(filter) => filter.flush(),
            ContentFilter::LineMarkupStrip(filter) => filter.flush(),
        }
    }
}

/// Pick a filter from the client's User-Agent. Goose renders markdown through a highlighter.
pub fn select_filter(user_agent: Option<&str>) -> ContentFilter {
    match user_agent {
        Some(agent) if agent.contains("Goose") => ContentFilter::markup_strip(),
        _ => ContentFilter::passthrough(),
    }
}
