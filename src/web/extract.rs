//! HTML to plain text extraction.
//!
//! Picks the block-level element carrying the most text and keeps its
//! paragraphs; pages where that yields too little fall back to every
//! paragraph, then to all visible text.

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

/// Subtrees that never contribute text.
const SKIP_TAGS: [&str; 6] = ["script", "style", "head", "header", "footer", "nav"];

/// Below this many words the main-content heuristic is considered a miss.
const MIN_MAIN_WORDS: usize = 100;

/// Extracts readable text from HTML pages.
pub struct PageExtractor {
    containers: Selector,
    paragraphs: Selector,
    whitespace: Regex,
    control: Regex,
}

impl PageExtractor {
    pub fn new() -> Self {
        Self {
            containers: Selector::parse("article, main, div, section").expect("Invalid selector"),
            paragraphs: Selector::parse("p").expect("Invalid selector"),
            whitespace: Regex::new(r"\s+").expect("Invalid regex"),
            control: Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F-\u{9F}]").expect("Invalid regex"),
        }
    }

    /// Extract and clean the readable text of an HTML document.
    pub fn extract(&self, html: &str) -> String {
        let document = Html::parse_document(html);

        let main = self.main_content(&document);
        let text = if main.split_whitespace().count() < MIN_MAIN_WORDS {
            self.all_paragraphs(&document)
        } else {
            main
        };

        self.clean(&text)
    }

    /// Collapse whitespace runs to single spaces and drop control characters.
    pub fn clean(&self, text: &str) -> String {
        let collapsed = self.whitespace.replace_all(text, " ");
        self.control.replace_all(&collapsed, "").trim().to_string()
    }

    fn main_content(&self, document: &Html) -> String {
        let mut best: Option<ElementRef> = None;
        let mut best_len = 0;

        for candidate in document.select(&self.containers) {
            if is_skipped(candidate) {
                continue;
            }
            let len: usize = text_nodes(candidate)
                .iter()
                .map(|t| t.trim().chars().count())
                .sum();
            if len > best_len {
                best_len = len;
                best = Some(candidate);
            }
        }

        if let Some(element) = best {
            if let Some(text) = self.paragraph_text(element) {
                return text;
            }
        }

        page_text(document)
    }

    fn all_paragraphs(&self, document: &Html) -> String {
        self.paragraph_text(document.root_element())
            .unwrap_or_else(|| page_text(document))
    }

    /// Non-empty paragraphs under `root`, blank-line separated. `None` if there are no `<p>`.
    fn paragraph_text(&self, root: ElementRef) -> Option<String> {
        let paragraphs: Vec<ElementRef> = root
            .select(&self.paragraphs)
            .filter(|p| !is_skipped(*p))
            .collect();

        if paragraphs.is_empty() {
            return None;
        }

        Some(
            paragraphs
                .into_iter()
                .map(|p| text_nodes(p).concat().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n"),
        )
    }
}

impl Default for PageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the element or one of its ancestors is a skipped tag.
fn is_skipped(element: ElementRef) -> bool {
    SKIP_TAGS.contains(&element.value().name())
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| SKIP_TAGS.contains(&a.value().name()))
}

/// All visible text of the document, one node per paragraph.
fn page_text(document: &Html) -> String {
    text_nodes(document.root_element())
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Raw text nodes below `element`, skipping excluded subtrees.
fn text_nodes(element: ElementRef) -> Vec<String> {
    let mut parts = Vec::new();
    collect_text(element, &mut parts);
    parts
}

fn collect_text(element: ElementRef, parts: &mut Vec<String>) {
    if SKIP_TAGS.contains(&element.value().name()) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => parts.push(String::from(&**text)),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, parts);
                }
            }
            _ => {}
        }
    }
}
