use chrono::{DateTime, NaiveDate};
use docsweep_core::error::AppError;
use docsweep_core::models::{Document, Page, SchemaSettings, compute_hash};
use scraper::{Html, Selector};
use serde_json::Value;

/// Indexes the page's JSON-LD (`schema.org`) objects as documents.
#[derive(Debug, Clone, Default)]
pub struct SchemaStrategy {
    settings: SchemaSettings,
}

impl SchemaStrategy {
    pub fn new(settings: SchemaSettings) -> Self {
        Self { settings }
    }

    pub fn extract_documents(&self, url: &str, page: &Page) -> Result<Vec<Document>, AppError> {
        let document = Html::parse_document(&page.html);
        let selector = Selector::parse(r#"script[type="application/ld+json"]"#)
            .map_err(|e| AppError::Generic(format!("invalid selector: {e}")))?;

        let mut objects = Vec::new();
        for script in document.select(&selector) {
            let raw: String = script.text().collect();
            let value: Value =
                serde_json::from_str(&raw).map_err(|e| AppError::ExtractionError {
                    url: url.to_string(),
                    message: format!("invalid JSON-LD: {e}"),
                })?;
            collect_objects(value, &mut objects);
        }

        Ok(objects
            .into_iter()
            .filter(|object| self.wanted(object))
            .enumerate()
            .map(|(position, mut object)| {
                if self.settings.convert_dates {
                    convert_dates(&mut object);
                }
                object.insert("uid".into(), compute_hash(&format!("{url}#{position}")).into());
                object.entry("url").or_insert_with(|| url.into());
                object
            })
            .collect())
    }

    fn wanted(&self, object: &Document) -> bool {
        let Some(only) = &self.settings.only_type else {
            return true;
        };
        match object.get("@type") {
            Some(Value::String(kind)) => kind == only,
            Some(Value::Array(kinds)) => kinds.iter().any(|k| k.as_str() == Some(only.as_str())),
            _ => false,
        }
    }
}

/// Flatten top-level arrays and `@graph` containers into plain objects.
fn collect_objects(value: Value, out: &mut Vec<Document>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|item| collect_objects(item, out)),
        Value::Object(mut object) => match object.remove("@graph") {
            Some(graph) => collect_objects(graph, out),
            None => out.push(object),
        },
        _ => {}
    }
}

/// Replace date-like string fields (`datePublished`, `uploadDate`, ...) with unix timestamps.
fn convert_dates(object: &mut Document) {
    for (key, value) in object.iter_mut() {
        if !key.to_ascii_lowercase().contains("date") {
            continue;
        }
        if let Some(timestamp) = value.as_str().and_then(parse_timestamp) {
            *value = timestamp.into();
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_page;

    const HTML: &str = r#"<html><head>
        <script type="application/ld+json">
          {"@context": "https://schema.org", "@type": "Article",
           "headline": "Release notes", "datePublished": "2024-01-02"}
        </script>
        <script type="application/ld+json">
          {"@graph": [
            {"@type": "BreadcrumbList", "name": "crumbs"},
            {"@type": ["Product", "Thing"], "name": "Widget",
             "releaseDate": "2024-01-02T00:00:00Z"}
          ]}
        </script>
      </head><body></body></html>"#;

    fn extract(settings: SchemaSettings) -> Vec<Document> {
        let url = "https://ex.com/blog/notes";
        let page = parse_page(url, HTML.to_string());
        SchemaStrategy::new(settings).extract_documents(url, &page).unwrap()
    }

    #[test]
    fn every_json_ld_object_becomes_a_document() {
        let docs = extract(SchemaSettings::default());

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0]["headline"], "Release notes");
        assert_eq!(docs[0]["datePublished"], "2024-01-02");
        assert_eq!(docs[2]["url"], "https://ex.com/blog/notes");
        assert!(docs.iter().all(|d| d["uid"].as_str().is_some_and(|u| u.len() == 64)));
    }

    #[test]
    fn only_type_filters_objects() {
        let docs = extract(SchemaSettings {
            only_type: Some("Product".into()),
            ..SchemaSettings::default()
        });

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["name"], "Widget");
    }

    #[test]
    fn dates_convert_to_unix_timestamps() {
        let docs = extract(SchemaSettings {
            convert_dates: true,
            only_type: None,
        });

        assert_eq!(docs[0]["datePublished"], 1_704_153_600_i64);
        assert_eq!(docs[2]["releaseDate"], 1_704_153_600_i64);
        assert_eq!(docs[0]["headline"], "Release notes");
    }

    #[test]
    fn malformed_json_ld_is_an_extraction_error() {
        let url = "https://ex.com/broken";
        let html = r#"<script type="application/ld+json">{not json</script>"#;
        let page = parse_page(url, html.to_string());

        let err = SchemaStrategy::default().extract_documents(url, &page).unwrap_err();

        assert!(err.is_page_local());
    }
}
