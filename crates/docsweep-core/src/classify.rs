//! URL classification: which pages are crawled, which are indexed.
//!
//! Every crawl root `R` is expanded into a recursive glob (`R/**`) and
//! matched with filesystem-style semantics: `*` stays within one path
//! segment, `**` crosses segments. A URL equal to the root itself also
//! matches, while a sibling that only shares a prefix (`/docs-old` for
//! root `/docs`) does not.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use url::Url;

use crate::error::AppError;
use crate::models::CrawlSpec;

/// Expand a crawl root into a pattern matching it and everything nested under it.
pub fn root_glob(root: &str) -> String {
    if root.ends_with('/') {
        format!("{root}**")
    } else {
        format!("{root}/**")
    }
}

/// A compiled list of root globs.
#[derive(Debug, Clone)]
pub struct GlobList {
    patterns: Vec<String>,
    set: GlobSet,
}

impl GlobList {
    /// Compile root URLs into recursive globs.
    pub fn from_roots<S: AsRef<str>>(roots: &[S]) -> Result<Self, AppError> {
        let patterns: Vec<String> = roots.iter().map(|r| root_glob(r.as_ref())).collect();
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| AppError::ConfigError(format!("Invalid glob '{pattern}': {e}")))?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| AppError::ConfigError(format!("Invalid glob set: {e}")))?;

        Ok(Self { patterns, set })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if `url` matches at least one glob.
    pub fn matches(&self, url: &str) -> bool {
        if self.set.is_match(url) {
            return true;
        }
        // `R/**` must also accept `R` itself.
        !url.ends_with('/') && self.set.is_match(format!("{url}/"))
    }
}

/// Allow/deny glob pair applied to discovered links.
#[derive(Debug, Clone, Copy)]
pub struct LinkFilter<'a> {
    pub include: &'a GlobList,
    pub exclude: &'a GlobList,
}

impl LinkFilter<'_> {
    pub fn allows(&self, url: &str) -> bool {
        self.include.matches(url) && !self.exclude.matches(url)
    }
}

/// True if the URL path contains a purely numeric segment followed by `/`,
/// e.g. `/blog/2/` or `/docs/42/intro`.
pub fn is_paginated(url: &str) -> Result<bool, AppError> {
    let parsed = Url::parse(url).map_err(|e| AppError::malformed_url(url, e))?;
    let segments: Vec<&str> = parsed.path().split('/').collect();
    // First element is the empty string before the leading slash; the last
    // one is not followed by a slash.
    let interior = segments
        .get(1..segments.len().saturating_sub(1))
        .unwrap_or_default();
    Ok(interior
        .iter()
        .any(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())))
}

/// Crawl and index predicates compiled from a [`CrawlSpec`].
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    crawled: GlobList,
    crawl_excluded: GlobList,
    indexed: GlobList,
    index_excluded: GlobList,
}

impl UrlClassifier {
    pub fn from_spec(spec: &CrawlSpec) -> Result<Self, AppError> {
        Ok(Self {
            crawled: GlobList::from_roots(&spec.start_urls)?,
            crawl_excluded: GlobList::from_roots(&spec.urls_to_exclude)?,
            indexed: GlobList::from_roots(spec.urls_to_index())?,
            index_excluded: GlobList::from_roots(&spec.urls_to_not_index)?,
        })
    }

    /// Links on any well-formed page are followed, paginated ones included.
    pub fn should_follow_links(&self, url: &str) -> Result<bool, AppError> {
        Url::parse(url).map_err(|e| AppError::malformed_url(url, e))?;
        Ok(true)
    }

    pub fn is_indexable(&self, url: &str) -> Result<bool, AppError> {
        if is_paginated(url)? {
            return Ok(false);
        }
        Ok(self.indexed.matches(url) && !self.index_excluded.matches(url))
    }

    pub fn is_crawlable_target(&self, url: &str) -> Result<bool, AppError> {
        Url::parse(url).map_err(|e| AppError::malformed_url(url, e))?;
        Ok(self.link_filter().allows(url))
    }

    /// The crawl include/exclude globs as a link filter for the engine.
    pub fn link_filter(&self) -> LinkFilter<'_> {
        LinkFilter {
            include: &self.crawled,
            exclude: &self.crawl_excluded,
        }
    }

    pub fn crawled_globs(&self) -> &GlobList {
        &self.crawled
    }

    pub fn indexed_globs(&self) -> &GlobList {
        &self.indexed
    }
}
