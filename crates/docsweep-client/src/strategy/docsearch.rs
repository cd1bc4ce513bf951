use docsweep_core::error::AppError;
use docsweep_core::models::{Document, Page, compute_hash};
use scraper::Html;
use serde_json::{Value, json};

use crate::html::{self, HEADING_LEVELS};

/// DocSearch-compatible records, so existing DocSearch front-ends keep working.
///
/// `hierarchy_lvlN` holds the heading path; `hierarchy_radio_lvlN` repeats
/// only the deepest level, which lets the engine rank a record by the
/// heading it belongs to.
#[derive(Debug, Clone, Default)]
pub struct DocsearchStrategy;

impl DocsearchStrategy {
    pub fn extract_documents(&self, url: &str, page: &Page) -> Result<Vec<Document>, AppError> {
        let document = Html::parse_document(&page.html);
        let records = html::content_blocks(&document)
            .into_iter()
            .enumerate()
            .map(|(position, block)| {
                let deepest = block.deepest_level();
                let mut doc = Document::new();
                doc.insert("uid".into(), compute_hash(&format!("{url}#{position}")).into());
                doc.insert("url".into(), url.into());
                doc.insert("anchor".into(), block.anchor.unwrap_or_default().into());
                for (level, heading) in block.headings.into_iter().enumerate() {
                    let radio = if Some(level) == deepest {
                        heading.clone().map_or(Value::Null, Value::String)
                    } else {
                        Value::Null
                    };
                    doc.insert(
                        format!("hierarchy_lvl{level}"),
                        heading.map_or(Value::Null, Value::String),
                    );
                    doc.insert(format!("hierarchy_radio_lvl{level}"), radio);
                }
                doc.insert("content".into(), json!(block.paragraphs));
                doc
            })
            .collect();
        Ok(records)
    }

    pub fn index_settings(&self) -> Value {
        let radio = (0..HEADING_LEVELS).map(|l| format!("hierarchy_radio_lvl{l}"));
        let levels = (0..HEADING_LEVELS).map(|l| format!("hierarchy_lvl{l}"));
        let searchable: Vec<String> = radio.chain(levels).chain(["content".to_string()]).collect();
        json!({
            "distinctAttribute": "url",
            "searchableAttributes": searchable,
            "rankingRules": ["words", "typo", "attribute", "proximity", "exactness", "sort"],
        })
    }
}
