use std::collections::HashSet;
use std::future::Future;

use crate::error::AppError;
use crate::models::{CandidateLink, ScoredLink};

/// Outcome of fetching a URL.
///
/// Non-HTML content is a normal skip, not an error, so it never trips the
/// retry policy.
#[derive(Debug, Clone)]
pub enum FetchedPage {
    Html(String),
    NotHtml { content_type: String },
}

/// Fetches a resource from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage, AppError>> + Send;
}

/// Parses fetched HTML into candidate links with surrounding context.
///
/// Must yield links in document order, resolve relative hrefs against
/// `base_url`, and produce a best-effort context for every anchor — a
/// single malformed anchor never fails the whole extraction.
pub trait LinkSource: Send + Sync + Clone {
    fn extract_links(&self, html: &str, base_url: &str) -> Vec<CandidateLink>;
}

/// Scores a batch of candidate links against keyword priorities.
///
/// The returned vector is positionally aligned with the input batch. Any
/// failure means "no results for this batch"; the caller decides whether
/// other batches proceed.
pub trait LinkClassifier: Send + Sync + Clone {
    fn classify(
        &self,
        batch: &[CandidateLink],
        high_priority_keywords: &[String],
        medium_priority_keywords: &[String],
    ) -> impl Future<Output = Result<Vec<ScoredLink>, AppError>> + Send;
}

/// Durable storage of pages and scored links.
pub trait LinkStore: Send + Sync + Clone {
    /// Register a canonical URL as a page and return its id. Idempotent:
    /// an already-registered URL returns the existing id.
    fn register_page(&self, url: &str) -> impl Future<Output = Result<i64, AppError>> + Send;

    /// Which of the given target URLs already have a stored link.
    fn existing_link_urls(
        &self,
        urls: &[String],
    ) -> impl Future<Output = Result<HashSet<String>, AppError>> + Send;

    /// Persist scored links attributed to a page. Atomic: either all rows
    /// are committed or the call fails with nothing written.
    fn store_links(
        &self,
        links: &[ScoredLink],
        page_id: i64,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}
