//! HTTP job intake: accepts crawl specs and runs them against Meilisearch.

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
