mod guard;
pub mod html;
pub mod loader;
pub mod meilisearch;
pub mod strategy;
pub mod webhook;

#[cfg(feature = "browser")]
pub mod browser_loader;

#[cfg(feature = "browser")]
pub use browser_loader::BrowserLoader;
pub use loader::HttpLoader;
pub use meilisearch::{MeilisearchClient, SearchConfig};
pub use strategy::{Strategy, StrategyCatalog};
pub use webhook::{WebhookConfig, WebhookReporter};
