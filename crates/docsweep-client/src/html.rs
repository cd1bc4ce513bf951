//! HTML helpers shared by the page loaders and the extraction strategies.

use std::collections::BTreeMap;

use docsweep_core::models::Page;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Number of heading levels tracked in a content block (`h1`..`h6`).
pub const HEADING_LEVELS: usize = 6;

/// Build a [`Page`] from raw HTML served at `final_url`.
///
/// Links are resolved against the document base (`<base href>` when
/// present) and returned as absolute URLs. `javascript:`, `mailto:` and
/// other non-HTTP links are dropped.
pub fn parse_page(final_url: &str, html: String) -> Page {
    let document = Html::parse_document(&html);
    let title = document_title(&document);
    let links = match Url::parse(final_url) {
        Ok(base) => extract_links(&document, &base),
        Err(_) => Vec::new(),
    };

    Page {
        url: final_url.to_string(),
        html,
        title,
        links,
    }
}

/// Absolute `http(s)` targets of every `<a href>` in the document.
pub fn extract_links(document: &Html, page_url: &Url) -> Vec<String> {
    let base = base_href(document)
        .and_then(|href| page_url.join(&href).ok())
        .unwrap_or_else(|| page_url.clone());

    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(String::from)
        .collect()
}

fn base_href(document: &Html) -> Option<String> {
    let selector = Selector::parse("base[href]").ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|base| base.value().attr("href"))
        .map(str::to_string)
}

/// Trimmed text of `<title>`, if any.
pub fn document_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Collapse the text content of an element to single-spaced words.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `<meta name=... content=...>` pairs, plus OpenGraph `property` tags.
pub fn meta_tags(document: &Html) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    let Ok(selector) = Selector::parse("meta[content]") else {
        return tags;
    };
    for meta in document.select(&selector) {
        let element = meta.value();
        let Some(name) = element.attr("name").or_else(|| element.attr("property")) else {
            continue;
        };
        if let Some(content) = element.attr("content") {
            tags.insert(name.to_string(), content.trim().to_string());
        }
    }
    tags
}

/// A run of paragraphs under one heading path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentBlock {
    /// `headings[0]` is the current `h1`, `headings[5]` the current `h6`.
    pub headings: [Option<String>; HEADING_LEVELS],
    /// `id` of the heading that opened the block.
    pub anchor: Option<String>,
    pub paragraphs: Vec<String>,
}

impl ContentBlock {
    fn is_empty(&self) -> bool {
        self.paragraphs.is_empty() && self.headings.iter().all(Option::is_none)
    }

    /// Depth of the deepest heading set on this block.
    pub fn deepest_level(&self) -> Option<usize> {
        self.headings.iter().rposition(Option::is_some)
    }
}

/// Split the document into heading-delimited blocks, in document order.
///
/// Each heading starts a new block that inherits the enclosing headings
/// and forgets deeper ones.
pub fn content_blocks(document: &Html) -> Vec<ContentBlock> {
    let Ok(selector) = Selector::parse("h1, h2, h3, h4, h5, h6, p") else {
        return Vec::new();
    };

    let mut blocks = Vec::new();
    let mut current = ContentBlock::default();
    for element in document.select(&selector) {
        let text = element_text(element);
        if text.is_empty() {
            continue;
        }
        match heading_level(element.value().name()) {
            Some(level) => {
                let mut next = ContentBlock {
                    headings: current.headings.clone(),
                    anchor: element.value().id().map(str::to_string),
                    paragraphs: Vec::new(),
                };
                next.headings[level] = Some(text);
                for deeper in next.headings.iter_mut().skip(level + 1) {
                    *deeper = None;
                }
                let finished = std::mem::replace(&mut current, next);
                if !finished.is_empty() {
                    blocks.push(finished);
                }
            }
            None => current.paragraphs.push(text),
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn heading_level(tag: &str) -> Option<usize> {
    match tag {
        "h1" => Some(0),
        "h2" => Some(1),
        "h3" => Some(2),
        "h4" => Some(3),
        "h5" => Some(4),
        "h6" => Some(5),
        _ => None,
    }
}

/// Non-empty path segments of a URL, used as coarse category tags.
pub fn url_tags(url: &str) -> Vec<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .map(|segments| segments.filter(|s| !s.is_empty()).map(str::to_string).collect())
        })
        .unwrap_or_default()
}
