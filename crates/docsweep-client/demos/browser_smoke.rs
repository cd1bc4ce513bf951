/// Smoke-test for `BrowserLoader`.
///
/// Launches a headless Chromium, renders <https://example.com> and checks the
/// page came back with a title and its outbound link.
///
/// Run with:
///   cargo run -p docsweep-client --example browser_smoke --features browser
use docsweep_client::BrowserLoader;
use docsweep_core::traits::PageLoader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Launching headless browser…");
    let loader = BrowserLoader::launch(true).await?;

    let url = "https://example.com";
    println!("Rendering {url} …");
    let page = loader.load(url).await?;

    assert_eq!(page.title.as_deref(), Some("Example Domain"));
    assert!(
        page.html.contains("<h1>Example Domain</h1>"),
        "Expected <h1> not found in rendered HTML"
    );
    assert!(!page.links.is_empty(), "Expected at least one link");

    println!("OK: {} bytes of HTML, final URL {}", page.html.len(), page.url);
    for link in &page.links {
        println!("  link: {link}");
    }
    Ok(())
}
