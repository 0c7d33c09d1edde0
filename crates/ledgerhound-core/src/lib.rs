pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod retry;
pub mod testutil;
pub mod traits;
pub mod url_norm;

pub use config::CrawlConfig;
pub use crawler::CrawlService;
pub use error::AppError;
pub use models::{CandidateLink, CrawlPageResult, CrawlSummary, Page, ScoredLink, StoredLink};
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
pub use traits::{FetchedPage, Fetcher, LinkClassifier, LinkSource, LinkStore};
pub use url_norm::normalize_url;
