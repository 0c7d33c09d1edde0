use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerhound_core::models::StoredLink;
use ledgerhound_db::PageSummary;

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PageResponse {
    pub id: i64,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub total_links: i64,
    pub high_relevancy_links: i64,
    pub medium_relevancy_links: i64,
}

impl From<PageSummary> for PageResponse {
    fn from(p: PageSummary) -> Self {
        Self {
            id: p.id,
            url: p.url,
            created_at: p.created_at,
            total_links: p.total_links,
            high_relevancy_links: p.high_relevancy_links,
            medium_relevancy_links: p.medium_relevancy_links,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PageListResponse {
    pub pages: Vec<PageResponse>,
    pub total: usize,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PageLinksQuery {
    /// Only return links at or above this relevancy (default 0.0).
    pub min_relevancy: Option<f64>,
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LinkResponse {
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

impl From<StoredLink> for LinkResponse {
    fn from(l: StoredLink) -> Self {
        Self {
            id: l.id,
            source_page_id: l.source_page_id,
            url: l.url,
            title: l.title,
            link_text: l.link_text,
            relevancy: l.relevancy,
            relevancy_explanation: l.relevancy_explanation,
            high_priority_keywords: l.high_priority_keywords,
            medium_priority_keywords: l.medium_priority_keywords,
            context: l.context,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListLinksQuery {
    pub min_relevancy: Option<f64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LinkListResponse {
    pub links: Vec<LinkResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    /// Substring matched against URL, title, link text, keywords, and context.
    pub q: String,
    pub min_relevancy: Option<f64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SearchResponse {
    pub links: Vec<LinkResponse>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
