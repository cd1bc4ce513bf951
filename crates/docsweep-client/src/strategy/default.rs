use docsweep_core::error::AppError;
use docsweep_core::models::{Document, Page, compute_hash};
use scraper::Html;
use serde_json::{Value, json};

use crate::html::{self, HEADING_LEVELS};

const HEADING_FIELDS: [&str; HEADING_LEVELS] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// General-purpose strategy: one document per heading block.
///
/// Every document carries the page title, its meta tags, the heading path
/// (`h1`..`h6`), the block's paragraphs (`p`) and the URL path segments
/// (`urls_tags`).
#[derive(Debug, Clone, Default)]
pub struct DefaultStrategy;

impl DefaultStrategy {
    pub fn extract_documents(&self, url: &str, page: &Page) -> Result<Vec<Document>, AppError> {
        let document = Html::parse_document(&page.html);
        let title = page
            .title
            .clone()
            .or_else(|| html::document_title(&document))
            .unwrap_or_default();
        let meta = html::meta_tags(&document);
        let image_url = meta.get("og:image").cloned();
        let urls_tags = html::url_tags(url);

        let documents = html::content_blocks(&document)
            .into_iter()
            .enumerate()
            .map(|(page_block, block)| {
                let mut doc = Document::new();
                doc.insert("uid".into(), compute_hash(&format!("{url}#{page_block}")).into());
                doc.insert("url".into(), url.into());
                doc.insert("anchor".into(), block.anchor.unwrap_or_default().into());
                doc.insert("title".into(), title.clone().into());
                doc.insert("meta".into(), json!(meta));
                if let Some(image_url) = &image_url {
                    doc.insert("image_url".into(), image_url.clone().into());
                }
                doc.insert("page_block".into(), page_block.into());
                doc.insert("urls_tags".into(), json!(urls_tags));
                for (field, heading) in HEADING_FIELDS.iter().zip(block.headings) {
                    doc.insert((*field).into(), heading.map_or(Value::Null, Value::String));
                }
                doc.insert("p".into(), json!(block.paragraphs));
                doc
            })
            .collect();
        Ok(documents)
    }

    pub fn index_settings(&self) -> Value {
        json!({
            "distinctAttribute": "url",
            "searchableAttributes": ["h1", "h2", "h3", "h4", "h5", "h6", "p", "title", "meta.description"],
            "filterableAttributes": ["urls_tags"],
        })
    }
}
