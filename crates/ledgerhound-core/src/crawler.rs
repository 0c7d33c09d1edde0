//! Crawl orchestration: the budget-bounded, recursive traversal that
//! composes fetching, link extraction, classification, and persistence.
//!
//! One `CrawlService` instance owns one crawl run: the in-memory frontier
//! of visited canonical URLs lives here and is not persisted across runs.
//! Persisted link dedup (the second dedup layer) is the store's job.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use crate::config::CrawlConfig;
use crate::error::AppError;
use crate::models::{CandidateLink, CrawlPageResult, CrawlSummary, ScoredLink};
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;
use crate::traits::{FetchedPage, Fetcher, LinkClassifier, LinkSource, LinkStore};
use crate::url_norm::normalize_url;

/// Recursive crawl pipeline, generic over all external collaborators for
/// dependency injection and testability without real HTTP or LLM calls.
pub struct CrawlService<F, X, C, S>
where
    F: Fetcher,
    X: LinkSource,
    C: LinkClassifier,
    S: LinkStore,
{
    fetcher: F,
    links: X,
    classifier: C,
    store: S,
    limiter: RateLimiter,
    retry: RetryPolicy,
    config: CrawlConfig,
    /// Canonical URLs already visited in this run.
    visited: HashSet<String>,
    links_stored: usize,
}

impl<F, X, C, S> CrawlService<F, X, C, S>
where
    F: Fetcher,
    X: LinkSource,
    C: LinkClassifier,
    S: LinkStore,
{
    pub fn new(fetcher: F, links: X, classifier: C, store: S, config: CrawlConfig) -> Self {
        let limiter = RateLimiter::new(config.calls_per_minute, config.burst);
        Self {
            fetcher,
            links,
            classifier,
            store,
            limiter,
            retry: RetryPolicy::default(),
            config,
            visited: HashSet::new(),
            links_stored: 0,
        }
    }

    /// Replace the default fetch retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Crawl every seed URL in order. A failed seed is logged and the run
    /// continues with the next one.
    pub async fn run(
        &mut self,
        seeds: &[String],
        high_priority_keywords: &[String],
        medium_priority_keywords: &[String],
    ) -> CrawlSummary {
        for seed in seeds {
            tracing::info!(url = %seed, "Starting crawl of seed");
            match self
                .crawl_page(seed, high_priority_keywords, medium_priority_keywords, 0)
                .await
            {
                Some(result) => {
                    tracing::info!(
                        url = %result.url,
                        new_links = result.link_count,
                        "Seed crawl finished"
                    );
                }
                None => tracing::warn!(url = %seed, "No result for seed"),
            }
        }

        CrawlSummary {
            pages_visited: self.visited.len(),
            links_stored: self.links_stored,
        }
    }

    /// Crawl a single page and recurse into its classified links.
    ///
    /// Returns `None` when any gate skips the page or processing fails;
    /// operational failures never escape as errors. The result covers
    /// only links newly discovered at this page, not the recursion below
    /// it.
    pub fn crawl_page<'a>(
        &'a mut self,
        url: &'a str,
        high_priority_keywords: &'a [String],
        medium_priority_keywords: &'a [String],
        depth: u32,
    ) -> Pin<Box<dyn Future<Output = Option<CrawlPageResult>> + Send + 'a>> {
        Box::pin(async move {
            // Gate 1: depth budget.
            if depth > self.config.max_depth {
                tracing::debug!(url, depth, "Skipping: past max depth");
                return None;
            }

            // Gate 2: page budget.
            if self.visited.len() >= self.config.max_pages {
                tracing::info!(
                    url,
                    max_pages = self.config.max_pages,
                    "Skipping: page budget exhausted"
                );
                return None;
            }

            // Gate 3: canonicalization.
            let url = match normalize_url(url) {
                Ok(normalized) => normalized,
                Err(err) => {
                    tracing::debug!(%err, "Skipping: not a crawlable URL");
                    return None;
                }
            };

            // Gate 4: frontier.
            if self.visited.contains(&url) {
                tracing::debug!(url, "Skipping: already visited this run");
                return None;
            }

            // Fetch with bounded retries; exhausted retries skip the URL,
            // never the run.
            let fetcher = self.fetcher.clone();
            let html = match self.retry.run(|| fetcher.fetch(&url)).await {
                Ok(FetchedPage::Html(html)) => html,
                Ok(FetchedPage::NotHtml { content_type }) => {
                    tracing::warn!(url, content_type, "Skipping non-HTML content");
                    return None;
                }
                Err(err) => {
                    tracing::error!(url, %err, "Failed to fetch page after retries");
                    return None;
                }
            };

            let page_id = match self.store.register_page(&url).await {
                Ok(id) => id,
                Err(err) => {
                    tracing::error!(url, %err, "Could not register page");
                    return None;
                }
            };

            // Mark visited only after the page is registered, so a storage
            // failure does not block a later re-attempt of the same URL.
            self.visited.insert(url.clone());
            tracing::info!(url, page_id, depth, "Fetched and registered page");

            let mut candidates = self.links.extract_links(&html, &url);
            tracing::debug!(url, extracted = candidates.len(), "Extracted links");

            if let Some(max_links) = self.config.max_links_per_page {
                if candidates.len() > max_links {
                    tracing::info!(
                        url,
                        from = candidates.len(),
                        to = max_links,
                        "Truncating extracted links"
                    );
                    candidates.truncate(max_links);
                }
            }

            let new_links = match self.filter_new_links(candidates).await {
                Ok(links) => links,
                Err(err) => {
                    tracing::error!(url, %err, "Link dedup query failed");
                    return None;
                }
            };
            if new_links.is_empty() {
                tracing::info!(url, "No new links to classify");
                return Some(CrawlPageResult {
                    url,
                    link_count: 0,
                    links: vec![],
                });
            }

            let scored = self
                .classify_batches(&new_links, high_priority_keywords, medium_priority_keywords)
                .await;

            let relevant: Vec<ScoredLink> = scored
                .into_iter()
                .filter(|link| link.relevancy >= self.config.relevancy_threshold)
                .collect();
            if relevant.is_empty() {
                tracing::info!(url, "No links classified as relevant");
                return None;
            }

            if let Err(err) = self.store.store_links(&relevant, page_id).await {
                tracing::error!(url, page_id, %err, "Failed to store links");
                return None;
            }
            self.links_stored += relevant.len();
            tracing::info!(url, page_id, stored = relevant.len(), "Stored links");

            if depth < self.config.max_depth {
                for link in &relevant {
                    if link.url.is_empty() {
                        continue;
                    }
                    if let Some(follow) = self.config.follow_threshold {
                        if link.relevancy < follow {
                            tracing::debug!(url = %link.url, relevancy = link.relevancy, "Not following low-relevancy link");
                            continue;
                        }
                    }
                    let child_url = link.url.clone();
                    self.crawl_page(
                        &child_url,
                        high_priority_keywords,
                        medium_priority_keywords,
                        depth + 1,
                    )
                    .await;
                }
            }

            Some(CrawlPageResult {
                url,
                link_count: relevant.len(),
                links: relevant,
            })
        })
    }

    /// Canonicalize candidate target URLs and drop the ones that already
    /// have a stored link (the persisted dedup layer).
    async fn filter_new_links(
        &self,
        candidates: Vec<CandidateLink>,
    ) -> Result<Vec<CandidateLink>, AppError> {
        let mut canonical = Vec::with_capacity(candidates.len());
        for mut candidate in candidates {
            match normalize_url(&candidate.url) {
                Ok(normalized) => {
                    candidate.url = normalized;
                    canonical.push(candidate);
                }
                Err(_) => {
                    tracing::debug!(url = %candidate.url, "Dropping non-crawlable link target");
                }
            }
        }

        let urls: Vec<String> = canonical.iter().map(|c| c.url.clone()).collect();
        let existing = self.store.existing_link_urls(&urls).await?;

        Ok(canonical
            .into_iter()
            .filter(|c| {
                if existing.contains(&c.url) {
                    tracing::debug!(url = %c.url, "Skipping already-classified link");
                    false
                } else {
                    true
                }
            })
            .collect())
    }

    /// Classify candidates in fixed-size batches, rate-limited per call.
    ///
    /// A failed or misaligned batch is dropped with a warning; the other
    /// batches still contribute. Each surviving result gets the original
    /// candidate's context and link text re-attached — classifier output
    /// for those fields is never trusted verbatim.
    async fn classify_batches(
        &self,
        new_links: &[CandidateLink],
        high_priority_keywords: &[String],
        medium_priority_keywords: &[String],
    ) -> Vec<ScoredLink> {
        let total_batches = new_links.len().div_ceil(self.config.batch_size);
        tracing::info!(
            links = new_links.len(),
            batches = total_batches,
            "Classifying new links"
        );

        let mut results = Vec::with_capacity(new_links.len());
        for (batch_num, batch) in new_links.chunks(self.config.batch_size).enumerate() {
            self.limiter.acquire().await;
            match self
                .classifier
                .classify(batch, high_priority_keywords, medium_priority_keywords)
                .await
            {
                Ok(scored) if scored.len() == batch.len() => {
                    for (candidate, mut link) in batch.iter().zip(scored) {
                        link.context = candidate.context.clone();
                        link.link_text = candidate.link_text.clone();
                        results.push(link);
                    }
                }
                Ok(scored) => {
                    tracing::warn!(
                        batch = batch_num + 1,
                        expected = batch.len(),
                        got = scored.len(),
                        "Misaligned classifier response, dropping batch"
                    );
                }
                Err(err) => {
                    tracing::warn!(batch = batch_num + 1, %err, "Classifier batch failed, dropping batch");
                }
            }
        }
        results
    }

    /// Number of distinct pages visited so far in this run.
    pub fn pages_visited(&self) -> usize {
        self.visited.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testutil::*;

    fn keywords() -> (Vec<String>, Vec<String>) {
        (
            vec!["ACFR".into(), "Budget".into()],
            vec!["Finance".into(), ".pdf".into()],
        )
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2))
    }

    fn candidate(url: &str, context: &str) -> CandidateLink {
        CandidateLink {
            url: url.to_string(),
            title: String::new(),
            link_text: "link".to_string(),
            context: context.to_string(),
        }
    }

    fn service(
        fetcher: MockFetcher,
        links: MockLinkSource,
        classifier: MockClassifier,
        store: MockStore,
        config: CrawlConfig,
    ) -> CrawlService<MockFetcher, MockLinkSource, MockClassifier, MockStore> {
        CrawlService::new(fetcher, links, classifier, store, config).with_retry_policy(fast_retry())
    }

    #[tokio::test]
    async fn scenario_a_threshold_filters_persisted_links() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::new("<html></html>");
        let links = MockLinkSource::new(vec![
            candidate("https://example.com/acfr", "annual report"),
            candidate("https://example.com/parks", "parks dept"),
            candidate("https://example.com/budget", "fy budget"),
        ]);
        let classifier = MockClassifier::with_scores(vec![vec![0.9, 0.2, 0.5]]);
        let store = MockStore::empty();

        let config = CrawlConfig {
            max_depth: 0,
            relevancy_threshold: 0.3,
            ..CrawlConfig::default()
        };
        let mut svc = service(fetcher, links, classifier, store.clone(), config);

        let result = svc
            .crawl_page("https://example.com", &high, &medium, 0)
            .await
            .unwrap();

        assert_eq!(result.link_count, 2);
        let stored = store.stored.lock().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].1.relevancy, 0.9);
        assert_eq!(stored[1].1.relevancy, 0.5);
    }

    #[tokio::test]
    async fn scenario_b_all_duplicates_skips_classifier() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::new("<html></html>");
        let links = MockLinkSource::new(vec![
            candidate("https://example.com/acfr", "seen before"),
            candidate("https://example.com/budget", "also seen"),
        ]);
        let classifier = MockClassifier::echo(0.9);
        let store = MockStore::with_existing(&[
            "https://www.example.com/acfr",
            "https://www.example.com/budget",
        ]);

        let mut svc = service(
            fetcher,
            links,
            classifier.clone(),
            store.clone(),
            CrawlConfig::default(),
        );

        let result = svc
            .crawl_page("https://example.com", &high, &medium, 0)
            .await
            .unwrap();

        assert_eq!(result.link_count, 0);
        assert!(result.links.is_empty());
        assert_eq!(classifier.call_count(), 0);
        assert!(store.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn scenario_c_fetch_recovers_within_retry_budget() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::empty().script_any(vec![
            Err(AppError::NetworkError("connection reset".into())),
            Err(AppError::Timeout(20)),
            Ok(FetchedPage::Html("<html></html>".into())),
        ]);
        let links = MockLinkSource::new(vec![candidate("https://example.com/acfr", "report")]);
        let classifier = MockClassifier::echo(0.8);
        let store = MockStore::empty();

        let config = CrawlConfig {
            max_depth: 0,
            ..CrawlConfig::default()
        };
        let mut svc = service(fetcher, links, classifier, store.clone(), config);

        let result = svc
            .crawl_page("https://example.com", &high, &medium, 0)
            .await
            .unwrap();

        assert_eq!(result.link_count, 1);
        assert_eq!(store.stored.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn scenario_c_fetch_exhausted_skips_page_run_continues() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::empty()
            .script(
                "https://www.bad.example/",
                vec![
                    Err(AppError::NetworkError("reset".into())),
                    Err(AppError::NetworkError("reset".into())),
                    Err(AppError::NetworkError("reset".into())),
                ],
            )
            .with_fallback_html("<html></html>");
        let links = MockLinkSource::new(vec![candidate("https://good.example/acfr", "report")]);
        let classifier = MockClassifier::echo(0.8);
        let store = MockStore::empty();

        let config = CrawlConfig {
            max_depth: 0,
            ..CrawlConfig::default()
        };
        let mut svc = service(fetcher, links, classifier, store.clone(), config);

        let summary = svc
            .run(
                &["https://bad.example/".into(), "https://good.example/".into()],
                &high,
                &medium,
            )
            .await;

        // The failing seed is skipped, the second seed still processes.
        assert_eq!(summary.pages_visited, 1);
        assert_eq!(summary.links_stored, 1);
    }

    #[tokio::test]
    async fn scenario_d_links_at_max_depth_are_persisted_but_not_followed() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::new("<html></html>");
        let links = MockLinkSource::per_page(vec![
            (
                "https://www.seed.example/",
                vec![candidate("https://child.example/", "child link")],
            ),
            (
                "https://www.child.example/",
                vec![candidate("https://grandchild.example/", "grandchild link")],
            ),
        ]);
        let classifier = MockClassifier::echo(0.9);
        let store = MockStore::empty();

        let config = CrawlConfig {
            max_depth: 1,
            ..CrawlConfig::default()
        };
        let mut svc = service(fetcher.clone(), links, classifier, store.clone(), config);

        svc.crawl_page("https://seed.example/", &high, &medium, 0)
            .await
            .unwrap();

        // The grandchild link was persisted (found on the depth-1 page)...
        let stored_urls: Vec<String> = store
            .stored
            .lock()
            .unwrap()
            .iter()
            .map(|(_, l)| l.url.clone())
            .collect();
        assert!(stored_urls.contains(&"https://www.grandchild.example/".to_string()));
        // ...but never fetched: only seed and child hit the network.
        assert_eq!(fetcher.fetch_count("https://www.seed.example/"), 1);
        assert_eq!(fetcher.fetch_count("https://www.child.example/"), 1);
        assert_eq!(fetcher.fetch_count("https://www.grandchild.example/"), 0);
    }

    #[tokio::test]
    async fn frontier_fetches_each_url_at_most_once() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::new("<html></html>");
        let links = MockLinkSource::new(vec![]);
        let classifier = MockClassifier::echo(0.9);
        let store = MockStore::empty();

        let mut svc = service(
            fetcher.clone(),
            links,
            classifier,
            store,
            CrawlConfig::default(),
        );

        let seeds = vec![
            "https://example.com/".to_string(),
            "https://www.example.com/".to_string(),
            "https://example.com/#top".to_string(),
        ];
        svc.run(&seeds, &high, &medium).await;

        // All three seeds normalize to the same canonical URL.
        assert_eq!(fetcher.fetch_count("https://www.example.com/"), 1);
        assert_eq!(svc.pages_visited(), 1);
    }

    #[tokio::test]
    async fn page_budget_bounds_the_run() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::new("<html></html>");
        // Every page links to two fresh children — unbounded growth
        // without the budget.
        let links = MockLinkSource::fanout();
        let classifier = MockClassifier::echo(0.9);
        let store = MockStore::empty();

        let config = CrawlConfig {
            max_depth: 10,
            max_pages: 3,
            ..CrawlConfig::default()
        };
        let mut svc = service(fetcher.clone(), links, classifier, store, config);

        svc.run(&["https://example.com/".into()], &high, &medium)
            .await;

        assert_eq!(svc.pages_visited(), 3);
        assert_eq!(fetcher.total_fetches(), 3);
    }

    #[tokio::test]
    async fn context_reattached_from_extraction_not_classifier() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::new("<html></html>");
        let links = MockLinkSource::new(vec![candidate(
            "https://example.com/acfr",
            "original context from the page",
        )]);
        // The echo classifier rewrites context to prove it gets discarded.
        let classifier = MockClassifier::echo(0.9);
        let store = MockStore::empty();

        let config = CrawlConfig {
            max_depth: 0,
            ..CrawlConfig::default()
        };
        let mut svc = service(fetcher, links, classifier, store.clone(), config);

        svc.crawl_page("https://example.com", &high, &medium, 0)
            .await
            .unwrap();

        let stored = store.stored.lock().unwrap();
        assert_eq!(stored[0].1.context, "original context from the page");
        assert_eq!(stored[0].1.link_text, "link");
    }

    #[tokio::test]
    async fn batches_preserve_order_and_total_count() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::new("<html></html>");
        let candidates: Vec<CandidateLink> = (0..5)
            .map(|i| candidate(&format!("https://example.com/doc{i}"), "ctx"))
            .collect();
        let links = MockLinkSource::new(candidates.clone());
        let classifier = MockClassifier::echo(0.9);
        let store = MockStore::empty();

        let config = CrawlConfig {
            max_depth: 0,
            batch_size: 2,
            ..CrawlConfig::default()
        };
        let mut svc = service(fetcher, links, classifier.clone(), store.clone(), config);

        let result = svc
            .crawl_page("https://example.com", &high, &medium, 0)
            .await
            .unwrap();

        assert_eq!(classifier.batch_sizes(), vec![2, 2, 1]);
        assert_eq!(result.link_count, 5);
        let stored_urls: Vec<String> = store
            .stored
            .lock()
            .unwrap()
            .iter()
            .map(|(_, l)| l.url.clone())
            .collect();
        let expected: Vec<String> = (0..5)
            .map(|i| format!("https://www.example.com/doc{i}"))
            .collect();
        assert_eq!(stored_urls, expected);
    }

    #[tokio::test]
    async fn failed_batch_is_dropped_others_proceed() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::new("<html></html>");
        let candidates: Vec<CandidateLink> = (0..4)
            .map(|i| candidate(&format!("https://example.com/doc{i}"), "ctx"))
            .collect();
        let links = MockLinkSource::new(candidates);
        let classifier = MockClassifier::with_responses(vec![
            Err(AppError::LlmError {
                message: "overloaded".into(),
                status_code: 503,
                retryable: true,
            }),
            Ok(vec![
                scored("https://www.example.com/doc2", 0.8),
                scored("https://www.example.com/doc3", 0.7),
            ]),
        ]);
        let store = MockStore::empty();

        let config = CrawlConfig {
            max_depth: 0,
            batch_size: 2,
            ..CrawlConfig::default()
        };
        let mut svc = service(fetcher, links, classifier, store.clone(), config);

        let result = svc
            .crawl_page("https://example.com", &high, &medium, 0)
            .await
            .unwrap();

        assert_eq!(result.link_count, 2);
        let stored = store.stored.lock().unwrap();
        assert_eq!(stored[0].1.url, "https://www.example.com/doc2");
        assert_eq!(stored[1].1.url, "https://www.example.com/doc3");
    }

    #[tokio::test]
    async fn misaligned_batch_is_dropped() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::new("<html></html>");
        let links = MockLinkSource::new(vec![
            candidate("https://example.com/a", "ctx"),
            candidate("https://example.com/b", "ctx"),
        ]);
        // Two inputs, one result: positional merge is impossible.
        let classifier = MockClassifier::with_responses(vec![Ok(vec![scored(
            "https://www.example.com/a",
            0.9,
        )])]);
        let store = MockStore::empty();

        let mut svc = service(
            fetcher,
            links,
            classifier,
            store.clone(),
            CrawlConfig::default(),
        );

        let result = svc
            .crawl_page("https://example.com", &high, &medium, 0)
            .await;

        // Nothing classified as relevant once the batch is dropped.
        assert!(result.is_none());
        assert!(store.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_link_failure_fails_whole_page() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::new("<html></html>");
        let links = MockLinkSource::new(vec![candidate("https://example.com/acfr", "ctx")]);
        let classifier = MockClassifier::echo(0.9);
        let store = MockStore::with_store_error(AppError::DatabaseError("disk full".into()));

        let config = CrawlConfig {
            max_depth: 0,
            ..CrawlConfig::default()
        };
        let mut svc = service(fetcher, links, classifier, store, config);

        let result = svc
            .crawl_page("https://example.com", &high, &medium, 0)
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn register_failure_leaves_url_retriable() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::new("<html></html>");
        let links = MockLinkSource::new(vec![candidate("https://example.com/acfr", "ctx")]);
        let classifier = MockClassifier::echo(0.9);
        // First register_page errors, later calls succeed.
        let store = MockStore::with_register_error(AppError::DatabaseError("locked".into()));

        let config = CrawlConfig {
            max_depth: 0,
            ..CrawlConfig::default()
        };
        let mut svc = service(fetcher, links, classifier, store, config);

        let first = svc
            .crawl_page("https://example.com", &high, &medium, 0)
            .await;
        assert!(first.is_none());
        assert_eq!(svc.pages_visited(), 0);

        // The URL was never marked visited, so a later attempt proceeds.
        let second = svc
            .crawl_page("https://example.com", &high, &medium, 0)
            .await;
        assert!(second.is_some());
        assert_eq!(svc.pages_visited(), 1);
    }

    #[tokio::test]
    async fn invalid_seed_is_skipped() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::new("<html></html>");
        let links = MockLinkSource::new(vec![]);
        let classifier = MockClassifier::echo(0.9);
        let store = MockStore::empty();

        let mut svc = service(
            fetcher.clone(),
            links,
            classifier,
            store,
            CrawlConfig::default(),
        );

        let result = svc.crawl_page("not a url", &high, &medium, 0).await;
        assert!(result.is_none());
        assert_eq!(fetcher.total_fetches(), 0);
    }

    #[tokio::test]
    async fn non_html_content_skips_without_retry() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::not_html("application/pdf");
        let links = MockLinkSource::new(vec![]);
        let classifier = MockClassifier::echo(0.9);
        let store = MockStore::empty();

        let mut svc = service(
            fetcher.clone(),
            links,
            classifier,
            store,
            CrawlConfig::default(),
        );

        let result = svc
            .crawl_page("https://example.com/acfr.pdf", &high, &medium, 0)
            .await;
        assert!(result.is_none());
        // One attempt, no retries: the skip is an Ok outcome.
        assert_eq!(fetcher.total_fetches(), 1);
    }

    #[tokio::test]
    async fn follow_threshold_limits_recursion() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::new("<html></html>");
        let links = MockLinkSource::per_page(vec![(
            "https://www.seed.example/",
            vec![
                candidate("https://high.example/", "high"),
                candidate("https://low.example/", "low"),
            ],
        )]);
        let classifier = MockClassifier::with_scores(vec![vec![0.9, 0.4]]);
        let store = MockStore::empty();

        let config = CrawlConfig {
            max_depth: 2,
            relevancy_threshold: 0.3,
            follow_threshold: Some(0.7),
            ..CrawlConfig::default()
        };
        let mut svc = service(fetcher.clone(), links, classifier, store.clone(), config);

        svc.crawl_page("https://seed.example/", &high, &medium, 0)
            .await
            .unwrap();

        // Both persisted, only the high-relevancy one expanded.
        assert_eq!(store.stored.lock().unwrap().len(), 2);
        assert_eq!(fetcher.fetch_count("https://www.high.example/"), 1);
        assert_eq!(fetcher.fetch_count("https://www.low.example/"), 0);
    }

    #[tokio::test]
    async fn test_mode_truncation_keeps_document_order() {
        let (high, medium) = keywords();
        let fetcher = MockFetcher::new("<html></html>");
        let candidates: Vec<CandidateLink> = (0..6)
            .map(|i| candidate(&format!("https://example.com/doc{i}"), "ctx"))
            .collect();
        let links = MockLinkSource::new(candidates);
        let classifier = MockClassifier::echo(0.9);
        let store = MockStore::empty();

        let config = CrawlConfig {
            max_depth: 0,
            max_links_per_page: Some(3),
            ..CrawlConfig::default()
        };
        let mut svc = service(fetcher, links, classifier, store.clone(), config);

        let result = svc
            .crawl_page("https://example.com", &high, &medium, 0)
            .await
            .unwrap();

        assert_eq!(result.link_count, 3);
        let stored_urls: Vec<String> = store
            .stored
            .lock()
            .unwrap()
            .iter()
            .map(|(_, l)| l.url.clone())
            .collect();
        assert_eq!(
            stored_urls,
            vec![
                "https://www.example.com/doc0",
                "https://www.example.com/doc1",
                "https://www.example.com/doc2",
            ]
        );
    }
}
