use std::time::Duration;

/// Budgets and tuning knobs for a crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum recursion depth. Seeds start at depth 0.
    pub max_depth: u32,

    /// Maximum number of distinct pages fetched per run.
    pub max_pages: usize,

    /// When set, only the first N extracted links per page are considered
    /// (in document order). Used by test mode to keep runs cheap.
    pub max_links_per_page: Option<usize>,

    /// Number of candidate links per classifier call.
    pub batch_size: usize,

    /// Links scoring below this are dropped before persistence.
    ///
    /// Filtering is owned here, by the orchestrator — the classifier
    /// returns everything it scored.
    pub relevancy_threshold: f64,

    /// When set, only persisted links scoring at or above this are
    /// recursed into. `None` follows every persisted link.
    pub follow_threshold: Option<f64>,

    /// Sustained classifier call rate.
    pub calls_per_minute: u32,

    /// Token-bucket burst capacity for classifier calls.
    pub burst: u32,

    /// Per-request timeout for page fetches.
    pub fetch_timeout: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: 10,
            max_links_per_page: None,
            batch_size: 20,
            relevancy_threshold: 0.3,
            follow_threshold: None,
            calls_per_minute: 15,
            burst: 3,
            fetch_timeout: Duration::from_secs(20),
        }
    }
}

impl CrawlConfig {
    /// Small budgets for smoke-testing a crawl against a single page.
    pub fn test_mode() -> Self {
        Self {
            max_depth: 1,
            max_pages: 1,
            max_links_per_page: Some(200),
            batch_size: 5,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budgets() {
        let config = CrawlConfig::default();
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.max_pages, 10);
        assert_eq!(config.batch_size, 20);
        assert!(config.max_links_per_page.is_none());
        assert!(config.follow_threshold.is_none());
    }

    #[test]
    fn test_mode_truncates_links() {
        let config = CrawlConfig::test_mode();
        assert_eq!(config.max_pages, 1);
        assert_eq!(config.max_links_per_page, Some(200));
    }
}
