use chrono::{DateTime, Utc};

/// A crawled page, unique on its canonical URL.
///
/// Created on the first successful fetch of a previously-unseen URL and
/// never mutated afterwards.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Page {
    pub id: i64,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// A link discovered on a page, before classification.
///
/// Ephemeral: lives only between extraction and classification. The
/// `context` is the whitespace-normalized text surrounding the anchor,
/// capped at extraction time.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CandidateLink {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link_text: String,
    #[serde(default)]
    pub context: String,
}

/// A candidate link enriched with classifier output.
///
/// `context` and `link_text` are always the values captured at extraction
/// time — classifier output for those fields is discarded during merge,
/// since the model may alter or summarize them.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoredLink {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link_text: String,
    pub relevancy: f64,
    #[serde(default)]
    pub relevancy_explanation: String,
    #[serde(default)]
    pub high_priority_keywords: Vec<String>,
    #[serde(default)]
    pub medium_priority_keywords: Vec<String>,
    #[serde(default)]
    pub context: String,
}

/// A persisted link row, attributed to its source page.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredLink {
    pub id: i64,
    pub source_page_id: i64,
    pub url: String,
    pub title: String,
    pub link_text: String,
    pub relevancy: f64,
    pub relevancy_explanation: String,
    pub high_priority_keywords: Vec<String>,
    pub medium_priority_keywords: Vec<String>,
    pub context: String,
}

/// Per-page crawl outcome: only the links newly discovered and classified
/// at this page, not anything found during recursion.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CrawlPageResult {
    pub url: String,
    pub link_count: usize,
    pub links: Vec<ScoredLink>,
}

/// Run-level aggregate maintained by the seed loop.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CrawlSummary {
    pub pages_visited: usize,
    pub links_stored: usize,
}
