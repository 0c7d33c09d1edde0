use std::sync::Arc;

use axum::Router;
use sqlx::sqlite::SqlitePoolOptions;

use ledgerhound_core::testutil::scored;
use ledgerhound_db::{CrawlRepository, Database};
use ledgerhound_server::routes;
use ledgerhound_server::state::AppState;

/// Build a router over a fresh in-memory database, plus a repository
/// handle on the same pool for seeding test data.
pub async fn setup_test_app() -> (Router, CrawlRepository) {
    // One connection: each in-memory SQLite connection is its own database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    let db = Database::from_pool(pool);
    db.init_schema().await.expect("Failed to init schema");
    let repo = db.crawl_repo();

    let state = Arc::new(AppState { db });
    (routes::router(state), repo)
}

/// Seed one crawled page with three links across the relevancy range.
/// Returns the page id.
pub async fn seed_crawl(repo: &CrawlRepository) -> i64 {
    let page_id = repo
        .register_page("https://www.example.gov/finance")
        .await
        .expect("Failed to register page");

    let mut acfr = scored("https://www.example.gov/acfr-2024.pdf", 0.9);
    acfr.title = "ACFR 2024".into();
    acfr.high_priority_keywords = vec!["ACFR".into(), "Annual Report".into()];

    let mut staff = scored("https://www.example.gov/staff", 0.5);
    staff.title = "Finance Department Staff".into();
    staff.medium_priority_keywords = vec!["Staff".into(), "Department".into()];

    let news = scored("https://www.example.gov/news", 0.1);

    repo.store_links(&[acfr, staff, news], page_id)
        .await
        .expect("Failed to store links");

    page_id
}
