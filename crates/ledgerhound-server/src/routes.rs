use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::dto::{
    HealthResponse, LinkListResponse, LinkResponse, ListLinksQuery, PageLinksQuery,
    PageListResponse, PageResponse, SearchQuery, SearchResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;

/// Build the full router. All routes are read-only and unauthenticated.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/pages", get(list_pages))
        .route("/v1/pages/{id}/links", get(page_links))
        .route("/v1/links", get(list_links))
        .route("/v1/search", get(search_links))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/pages",
    responses(
        (status = 200, description = "All crawled pages with link counts", body = PageListResponse),
    ),
    tag = "pages"
)]
pub async fn list_pages(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let pages = state.db.crawl_repo().list_pages().await?;

    let pages: Vec<PageResponse> = pages.into_iter().map(Into::into).collect();
    let total = pages.len();

    Ok(axum::Json(PageListResponse { pages, total }))
}

#[utoipa::path(
    get,
    path = "/v1/pages/{id}/links",
    params(
        ("id" = i64, Path, description = "Page id"),
        PageLinksQuery,
    ),
    responses(
        (status = 200, description = "Links discovered on this page", body = LinkListResponse),
        (status = 404, description = "Unknown page", body = crate::dto::ErrorResponse),
    ),
    tag = "pages"
)]
pub async fn page_links(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<PageLinksQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = state.db.crawl_repo();

    if repo.get_page(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("No page with id {id}")));
    }

    let min_relevancy = query.min_relevancy.unwrap_or(0.0);
    let links = repo.page_links(id, min_relevancy).await?;

    let links: Vec<LinkResponse> = links.into_iter().map(Into::into).collect();
    let total = links.len() as i64;

    Ok(axum::Json(LinkListResponse {
        links,
        total,
        limit: total,
        offset: 0,
    }))
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/links",
    params(ListLinksQuery),
    responses(
        (status = 200, description = "Stored links, most relevant first", body = LinkListResponse),
    ),
    tag = "links"
)]
pub async fn list_links(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListLinksQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let min_relevancy = query.min_relevancy.unwrap_or(0.0);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let page = state
        .db
        .crawl_repo()
        .list_links(min_relevancy, limit, offset)
        .await?;

    Ok(axum::Json(LinkListResponse {
        links: page.links.into_iter().map(Into::into).collect(),
        total: page.total,
        limit,
        offset,
    }))
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Links matching the query", body = SearchResponse),
    ),
    tag = "links"
)]
pub async fn search_links(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let min_relevancy = query.min_relevancy.unwrap_or(0.0);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let links = state
        .db
        .crawl_repo()
        .search_links(&query.q, min_relevancy, limit)
        .await?;

    let links: Vec<LinkResponse> = links.into_iter().map(Into::into).collect();
    let total = links.len();

    Ok(axum::Json(SearchResponse { links, total }))
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match state.db.crawl_repo().health_check().await {
        Ok(()) => "ok",
        Err(_) => "error",
    };

    axum::Json(HealthResponse {
        status: "healthy",
        database,
    })
}
