//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests. All mocks
//! use `Arc<Mutex<_>>` for interior mutability, so cloned handles share
//! state and tests can assert on recorded calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::{CandidateLink, ScoredLink};
use crate::traits::{FetchedPage, Fetcher, LinkClassifier, LinkSource, LinkStore};

/// Build a ScoredLink with the given score; everything else defaulted.
pub fn scored(url: &str, relevancy: f64) -> ScoredLink {
    ScoredLink {
        url: url.to_string(),
        title: String::new(),
        link_text: String::new(),
        relevancy,
        relevancy_explanation: "mock score".to_string(),
        high_priority_keywords: vec![],
        medium_priority_keywords: vec![],
        context: String::new(),
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher with per-URL scripted responses and a shared fallback.
///
/// Lookup order per call: the URL's own script queue, then the wildcard
/// queue (`script_any`), then the fallback page. Records every fetched
/// URL.
#[derive(Clone)]
pub struct MockFetcher {
    scripts: Arc<Mutex<HashMap<String, Vec<Result<FetchedPage, AppError>>>>>,
    fallback: Arc<Mutex<Option<FetchedPage>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

const WILDCARD: &str = "*";

impl MockFetcher {
    /// Every URL resolves to the given HTML.
    pub fn new(html: &str) -> Self {
        Self::empty().with_fallback_html(html)
    }

    /// No scripted responses; unscripted URLs fail.
    pub fn empty() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(HashMap::new())),
            fallback: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every URL resolves to a non-HTML response of the given type.
    pub fn not_html(content_type: &str) -> Self {
        let fetcher = Self::empty();
        *fetcher.fallback.lock().unwrap() = Some(FetchedPage::NotHtml {
            content_type: content_type.to_string(),
        });
        fetcher
    }

    /// Queue responses for one specific (canonical) URL.
    pub fn script(self, url: &str, responses: Vec<Result<FetchedPage, AppError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .extend(responses);
        self
    }

    /// Queue responses consumed by any URL without its own script.
    pub fn script_any(self, responses: Vec<Result<FetchedPage, AppError>>) -> Self {
        self.script(WILDCARD, responses)
    }

    pub fn with_fallback_html(self, html: &str) -> Self {
        *self.fallback.lock().unwrap() = Some(FetchedPage::Html(html.to_string()));
        self
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_fetches(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, AppError> {
        self.calls.lock().unwrap().push(url.to_string());

        let mut scripts = self.scripts.lock().unwrap();
        for key in [url, WILDCARD] {
            if let Some(queue) = scripts.get_mut(key) {
                if !queue.is_empty() {
                    return queue.remove(0);
                }
            }
        }
        drop(scripts);

        match self.fallback.lock().unwrap().clone() {
            Some(page) => Ok(page),
            None => Err(AppError::NetworkError(format!("unscripted URL: {url}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// MockLinkSource
// ---------------------------------------------------------------------------

enum LinkScript {
    /// Same candidates for every page.
    Fixed(Vec<CandidateLink>),
    /// Candidates keyed by the page's canonical URL; unknown pages yield
    /// nothing.
    PerPage(HashMap<String, Vec<CandidateLink>>),
    /// Every page yields two fresh, never-seen-before child links.
    Fanout(Mutex<usize>),
}

/// Mock link source returning scripted candidate links.
#[derive(Clone)]
pub struct MockLinkSource {
    script: Arc<LinkScript>,
}

impl MockLinkSource {
    pub fn new(candidates: Vec<CandidateLink>) -> Self {
        Self {
            script: Arc::new(LinkScript::Fixed(candidates)),
        }
    }

    pub fn per_page(pages: Vec<(&str, Vec<CandidateLink>)>) -> Self {
        let map = pages
            .into_iter()
            .map(|(url, links)| (url.to_string(), links))
            .collect();
        Self {
            script: Arc::new(LinkScript::PerPage(map)),
        }
    }

    /// Unbounded synthetic graph: useful for exercising budgets.
    pub fn fanout() -> Self {
        Self {
            script: Arc::new(LinkScript::Fanout(Mutex::new(0))),
        }
    }
}

impl LinkSource for MockLinkSource {
    fn extract_links(&self, _html: &str, base_url: &str) -> Vec<CandidateLink> {
        match &*self.script {
            LinkScript::Fixed(candidates) => candidates.clone(),
            LinkScript::PerPage(map) => map.get(base_url).cloned().unwrap_or_default(),
            LinkScript::Fanout(counter) => {
                let mut n = counter.lock().unwrap();
                let links = (0..2)
                    .map(|i| CandidateLink {
                        url: format!("https://fan{}.example/", *n + i),
                        title: String::new(),
                        link_text: "child".to_string(),
                        context: format!("fanout from {base_url}"),
                    })
                    .collect();
                *n += 2;
                links
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MockClassifier
// ---------------------------------------------------------------------------

enum ClassifierScript {
    /// Echo the batch back, every link scored the same. The context is
    /// deliberately rewritten so merge tests can prove it is discarded.
    Echo(f64),
    /// Queue of per-batch score vectors, applied positionally.
    Scores(Mutex<Vec<Vec<f64>>>),
    /// Queue of full per-batch responses.
    Responses(Mutex<Vec<Result<Vec<ScoredLink>, AppError>>>),
}

/// Mock classifier with call recording.
#[derive(Clone)]
pub struct MockClassifier {
    script: Arc<ClassifierScript>,
    batches: Arc<Mutex<Vec<usize>>>,
}

impl MockClassifier {
    pub fn echo(relevancy: f64) -> Self {
        Self {
            script: Arc::new(ClassifierScript::Echo(relevancy)),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_scores(scores: Vec<Vec<f64>>) -> Self {
        Self {
            script: Arc::new(ClassifierScript::Scores(Mutex::new(scores))),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_responses(responses: Vec<Result<Vec<ScoredLink>, AppError>>) -> Self {
        Self {
            script: Arc::new(ClassifierScript::Responses(Mutex::new(responses))),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of classify calls made.
    pub fn call_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    /// Sizes of the batches received, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }

    fn echo_batch(batch: &[CandidateLink], relevancy: f64) -> Vec<ScoredLink> {
        batch
            .iter()
            .map(|candidate| ScoredLink {
                url: candidate.url.clone(),
                title: candidate.title.clone(),
                link_text: "classifier-rewrote-this".to_string(),
                relevancy,
                relevancy_explanation: "mock score".to_string(),
                high_priority_keywords: vec![],
                medium_priority_keywords: vec![],
                context: "classifier-rewrote-this".to_string(),
            })
            .collect()
    }
}

impl LinkClassifier for MockClassifier {
    async fn classify(
        &self,
        batch: &[CandidateLink],
        _high_priority_keywords: &[String],
        _medium_priority_keywords: &[String],
    ) -> Result<Vec<ScoredLink>, AppError> {
        self.batches.lock().unwrap().push(batch.len());

        match &*self.script {
            ClassifierScript::Echo(relevancy) => Ok(Self::echo_batch(batch, *relevancy)),
            ClassifierScript::Scores(queue) => {
                let mut queue = queue.lock().unwrap();
                let scores = if queue.is_empty() {
                    vec![]
                } else {
                    queue.remove(0)
                };
                Ok(batch
                    .iter()
                    .enumerate()
                    .map(|(i, candidate)| {
                        let mut link = scored(&candidate.url, scores.get(i).copied().unwrap_or(0.0));
                        link.title = candidate.title.clone();
                        link
                    })
                    .collect())
            }
            ClassifierScript::Responses(queue) => {
                let mut queue = queue.lock().unwrap();
                if queue.is_empty() {
                    Ok(Self::echo_batch(batch, 0.5))
                } else {
                    queue.remove(0)
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// In-memory store that records registered pages and stored links.
///
/// `store_links` also marks the link URLs as existing, so recursive
/// crawls see the same persisted-dedup behavior as the real store.
#[derive(Clone)]
pub struct MockStore {
    pages: Arc<Mutex<HashMap<String, i64>>>,
    next_id: Arc<Mutex<i64>>,
    existing: Arc<Mutex<HashSet<String>>>,
    /// Every stored link with the page id it was attributed to.
    pub stored: Arc<Mutex<Vec<(i64, ScoredLink)>>>,
    register_error: Arc<Mutex<Option<AppError>>>,
    store_error: Arc<Mutex<Option<AppError>>>,
}

impl MockStore {
    pub fn empty() -> Self {
        Self {
            pages: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
            existing: Arc::new(Mutex::new(HashSet::new())),
            stored: Arc::new(Mutex::new(Vec::new())),
            register_error: Arc::new(Mutex::new(None)),
            store_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Store that already has links for the given (canonical) URLs.
    pub fn with_existing(urls: &[&str]) -> Self {
        let store = Self::empty();
        {
            let mut existing = store.existing.lock().unwrap();
            for url in urls {
                existing.insert((*url).to_string());
            }
        }
        store
    }

    /// Fails the next `register_page` call, then recovers.
    pub fn with_register_error(error: AppError) -> Self {
        let store = Self::empty();
        *store.register_error.lock().unwrap() = Some(error);
        store
    }

    /// Fails the next `store_links` call, then recovers.
    pub fn with_store_error(error: AppError) -> Self {
        let store = Self::empty();
        *store.store_error.lock().unwrap() = Some(error);
        store
    }
}

impl LinkStore for MockStore {
    async fn register_page(&self, url: &str) -> Result<i64, AppError> {
        if let Some(err) = self.register_error.lock().unwrap().take() {
            return Err(err);
        }

        let mut pages = self.pages.lock().unwrap();
        if let Some(id) = pages.get(url) {
            return Ok(*id);
        }
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        pages.insert(url.to_string(), id);
        Ok(id)
    }

    async fn existing_link_urls(&self, urls: &[String]) -> Result<HashSet<String>, AppError> {
        let existing = self.existing.lock().unwrap();
        Ok(urls
            .iter()
            .filter(|u| existing.contains(*u))
            .cloned()
            .collect())
    }

    async fn store_links(&self, links: &[ScoredLink], page_id: i64) -> Result<(), AppError> {
        if let Some(err) = self.store_error.lock().unwrap().take() {
            return Err(err);
        }

        let mut stored = self.stored.lock().unwrap();
        let mut existing = self.existing.lock().unwrap();
        for link in links {
            stored.push((page_id, link.clone()));
            existing.insert(link.url.clone());
        }
        Ok(())
    }
}
