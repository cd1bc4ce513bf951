use url::Url;

/// Extensions of resources no extraction strategy can read.
#[rustfmt::skip]
pub const NON_DOCUMENT_EXTENSIONS: &[&str] = &[
    // Archives
    ".zip", ".rar", ".tar", ".gz", ".tgz", ".7z", ".bz2",
    // Office documents
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".rtf",
    // Images
    ".jpg", ".jpeg", ".png", ".gif", ".svg",
    // Stylesheets, scripts and data files
    ".css", ".js", ".xml", ".txt", ".csv",
    // Media
    ".mp3", ".wav", ".mp4", ".avi", ".mkv", ".mov", ".flv", ".wmv", ".m4v", ".ogg", ".mpg",
    ".mpeg", ".swf",
];

/// True if the URL path ends with a non-document extension.
pub fn is_file_url(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    NON_DOCUMENT_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(ext))
}

/// Canonicalize a discovered link before it reaches the frontier.
///
/// Returns `None` for unparsable links and links to non-document files.
/// Query string and fragment are dropped so that `page?tab=2#usage` and
/// `page` are crawled once.
pub fn normalize_link(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    if is_file_url(&url) {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_query_and_fragment() {
        assert_eq!(
            normalize_link("https://ex.com/docs/page?x=1#top").as_deref(),
            Some("https://ex.com/docs/page")
        );
        assert_eq!(
            normalize_link("https://ex.com/docs/page#install").as_deref(),
            Some("https://ex.com/docs/page")
        );
        assert_eq!(
            normalize_link("https://ex.com/docs/?").as_deref(),
            Some("https://ex.com/docs/")
        );
    }

    #[test]
    fn variants_collapse_to_one_link() {
        let a = normalize_link("https://ex.com/guide?lang=en").unwrap();
        let b = normalize_link("https://ex.com/guide#setup").unwrap();
        let c = normalize_link("https://ex.com/guide?lang=fr&x=2#faq").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in [
            "https://ex.com/docs/page?x=1#top",
            "https://ex.com/",
            "http://ex.com/a/b/",
        ] {
            let once = normalize_link(raw).unwrap();
            assert_eq!(normalize_link(&once).unwrap(), once);
        }
    }

    #[test]
    fn rejects_non_document_files() {
        assert_eq!(normalize_link("https://ex.com/file.pdf"), None);
        assert_eq!(normalize_link("https://ex.com/assets/app.js"), None);
        assert_eq!(normalize_link("https://ex.com/img/Logo.PNG"), None);
        assert_eq!(normalize_link("https://ex.com/dl/release.tar.gz?v=3"), None);
        assert_eq!(normalize_link("https://ex.com/sitemap.xml#x"), None);
    }

    #[test]
    fn keeps_document_like_paths() {
        assert!(normalize_link("https://ex.com/docs/page.html").is_some());
        assert!(normalize_link("https://ex.com/js/intro").is_some());
        assert!(normalize_link("https://ex.com/pdf-guide").is_some());
    }

    #[test]
    fn rejects_unparsable_links() {
        assert_eq!(normalize_link("javascript"), None);
        assert_eq!(normalize_link("/relative"), None);
    }
}
