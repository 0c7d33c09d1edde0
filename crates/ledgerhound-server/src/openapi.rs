use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ledgerhound API",
        version = "0.1.0",
        description = "Read-only API over keyword-driven crawl results for government financial disclosures."
    ),
    paths(
        crate::routes::list_pages,
        crate::routes::page_links,
        crate::routes::list_links,
        crate::routes::search_links,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::PageResponse,
        crate::dto::PageListResponse,
        crate::dto::LinkResponse,
        crate::dto::LinkListResponse,
        crate::dto::SearchResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "pages", description = "Crawled pages"),
        (name = "links", description = "Scored links"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
