use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::common::{seed_crawl, setup_test_app};

async fn get_json(
    router: axum::Router,
    uri: &str,
) -> (StatusCode, serde_json::Value) {
    let response = router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn health_returns_200() {
    let (router, _repo) = setup_test_app().await;

    let (status, json) = get_json(router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn pages_list_includes_link_buckets() {
    let (router, repo) = setup_test_app().await;
    let page_id = seed_crawl(&repo).await;

    let (status, json) = get_json(router, "/v1/pages").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);

    let page = &json["pages"][0];
    assert_eq!(page["id"], page_id);
    assert_eq!(page["url"], "https://www.example.gov/finance");
    assert_eq!(page["total_links"], 3);
    assert_eq!(page["high_relevancy_links"], 1);
    assert_eq!(page["medium_relevancy_links"], 1);
}

#[tokio::test]
async fn page_links_filters_by_relevancy() {
    let (router, repo) = setup_test_app().await;
    let page_id = seed_crawl(&repo).await;

    let (status, json) = get_json(
        router,
        &format!("/v1/pages/{page_id}/links?min_relevancy=0.4"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);
    // Most relevant first.
    assert_eq!(json["links"][0]["url"], "https://www.example.gov/acfr-2024.pdf");
    assert_eq!(json["links"][0]["high_priority_keywords"][0], "ACFR");
    assert_eq!(json["links"][1]["url"], "https://www.example.gov/staff");
}

#[tokio::test]
async fn unknown_page_returns_404() {
    let (router, _repo) = setup_test_app().await;

    let (status, json) = get_json(router, "/v1/pages/999/links").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn links_listing_paginates() {
    let (router, repo) = setup_test_app().await;
    seed_crawl(&repo).await;

    let (status, json) = get_json(router.clone(), "/v1/links?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 3);
    assert_eq!(json["links"].as_array().unwrap().len(), 2);
    assert_eq!(json["limit"], 2);

    let (_, next) = get_json(router, "/v1/links?limit=2&offset=2").await;
    assert_eq!(next["links"].as_array().unwrap().len(), 1);
    assert_eq!(next["links"][0]["url"], "https://www.example.gov/news");
}

#[tokio::test]
async fn search_matches_keywords() {
    let (router, repo) = setup_test_app().await;
    seed_crawl(&repo).await;

    let (status, json) = get_json(router, "/v1/search?q=ACFR").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["links"][0]["title"], "ACFR 2024");
}

#[tokio::test]
async fn search_respects_min_relevancy() {
    let (router, repo) = setup_test_app().await;
    seed_crawl(&repo).await;

    let (_, json) = get_json(router, "/v1/search?q=example.gov&min_relevancy=0.8").await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["links"][0]["url"], "https://www.example.gov/acfr-2024.pdf");
}
