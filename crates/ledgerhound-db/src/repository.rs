use std::collections::HashSet;

use chrono::{DateTime, Utc};
use ledgerhound_core::error::AppError;
use ledgerhound_core::models::{Page, ScoredLink, StoredLink};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Per-page aggregate returned by the page listing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PageSummary {
    pub id: i64,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub total_links: i64,
    pub high_relevancy_links: i64,
    pub medium_relevancy_links: i64,
}

/// One page of the link listing, with the unpaginated total.
#[derive(Debug, Clone)]
pub struct LinkPage {
    pub links: Vec<StoredLink>,
    pub total: i64,
}

/// Repository for crawl persistence in SQLite.
///
/// Keyword lists are stored comma-joined in a single column and split
/// back on read; both directions go through the helpers below so the
/// format never leaks.
#[derive(Clone)]
pub struct CrawlRepository {
    pool: SqlitePool,
}

impl CrawlRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a canonical URL as a page and return its id. Idempotent:
    /// re-registering returns the existing id.
    pub async fn register_page(&self, url: &str) -> Result<i64, AppError> {
        sqlx::query("INSERT OR IGNORE INTO pages (url, created_at) VALUES (?, ?)")
            .bind(url)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let row: (i64,) = sqlx::query_as("SELECT id FROM pages WHERE url = ?")
            .bind(url)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.0)
    }

    /// Which of the given target URLs already have a stored link.
    pub async fn existing_link_urls(&self, urls: &[String]) -> Result<HashSet<String>, AppError> {
        if urls.is_empty() {
            return Ok(HashSet::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT url FROM links WHERE url IN (");
        let mut separated = builder.separated(", ");
        for url in urls {
            separated.push_bind(url);
        }
        separated.push_unseparated(")");

        let existing: Vec<String> = builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(existing.into_iter().collect())
    }

    /// Persist scored links attributed to a page, in one transaction.
    /// A link URL that raced in since the dedup check is skipped.
    pub async fn store_links(&self, links: &[ScoredLink], page_id: i64) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        for link in links {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO links
                    (source_page_id, url, title, link_text, relevancy,
                     relevancy_explanation, high_priority_keywords,
                     medium_priority_keywords, context, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(page_id)
            .bind(&link.url)
            .bind(&link.title)
            .bind(&link.link_text)
            .bind(link.relevancy)
            .bind(&link.relevancy_explanation)
            .bind(join_keywords(&link.high_priority_keywords))
            .bind(join_keywords(&link.medium_priority_keywords))
            .bind(&link.context)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        tracing::debug!(page_id, count = links.len(), "Stored scored links");
        Ok(())
    }

    /// Look up a single page by id.
    pub async fn get_page(&self, id: i64) -> Result<Option<Page>, AppError> {
        let row = sqlx::query_as::<_, PageRow>(
            "SELECT id, url, created_at FROM pages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    /// All crawled pages with link counts, bucketed by relevancy
    /// (high >= 0.7, medium 0.3..0.7).
    pub async fn list_pages(&self) -> Result<Vec<PageSummary>, AppError> {
        let rows = sqlx::query_as::<_, PageSummaryRow>(
            r#"
            SELECT p.id, p.url, p.created_at,
                   COUNT(l.id) AS total_links,
                   COALESCE(SUM(CASE WHEN l.relevancy >= 0.7 THEN 1 ELSE 0 END), 0)
                       AS high_relevancy_links,
                   COALESCE(SUM(CASE WHEN l.relevancy >= 0.3 AND l.relevancy < 0.7 THEN 1 ELSE 0 END), 0)
                       AS medium_relevancy_links
            FROM pages p
            LEFT JOIN links l ON l.source_page_id = p.id
            GROUP BY p.id, p.url, p.created_at
            ORDER BY p.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Links found on one page, most relevant first.
    pub async fn page_links(
        &self,
        page_id: i64,
        min_relevancy: f64,
    ) -> Result<Vec<StoredLink>, AppError> {
        let rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, source_page_id, url, title, link_text, relevancy,
                   relevancy_explanation, high_priority_keywords,
                   medium_priority_keywords, context
            FROM links
            WHERE source_page_id = ? AND relevancy >= ?
            ORDER BY relevancy DESC, id
            "#,
        )
        .bind(page_id)
        .bind(min_relevancy)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Paginated listing across all pages, most relevant first.
    pub async fn list_links(
        &self,
        min_relevancy: f64,
        limit: i64,
        offset: i64,
    ) -> Result<LinkPage, AppError> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM links WHERE relevancy >= ?")
            .bind(min_relevancy)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, source_page_id, url, title, link_text, relevancy,
                   relevancy_explanation, high_priority_keywords,
                   medium_priority_keywords, context
            FROM links
            WHERE relevancy >= ?
            ORDER BY relevancy DESC, id
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(min_relevancy)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(LinkPage {
            links: rows.into_iter().map(Into::into).collect(),
            total: total.0,
        })
    }

    /// Substring search over URL, title, link text, keywords, and context.
    pub async fn search_links(
        &self,
        query: &str,
        min_relevancy: f64,
        limit: i64,
    ) -> Result<Vec<StoredLink>, AppError> {
        let pattern = format!("%{query}%");
        let rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, source_page_id, url, title, link_text, relevancy,
                   relevancy_explanation, high_priority_keywords,
                   medium_priority_keywords, context
            FROM links
            WHERE relevancy >= ?1
              AND (url LIKE ?2 OR title LIKE ?2 OR link_text LIKE ?2
                   OR high_priority_keywords LIKE ?2 OR medium_priority_keywords LIKE ?2
                   OR context LIKE ?2)
            ORDER BY relevancy DESC, id
            LIMIT ?3
            "#,
        )
        .bind(min_relevancy)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

fn join_keywords(keywords: &[String]) -> String {
    keywords.join(",")
}

fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

// -- Internal row types for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct PageRow {
    id: i64,
    url: String,
    created_at: DateTime<Utc>,
}

impl From<PageRow> for Page {
    fn from(row: PageRow) -> Self {
        Page {
            id: row.id,
            url: row.url,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PageSummaryRow {
    id: i64,
    url: String,
    created_at: DateTime<Utc>,
    total_links: i64,
    high_relevancy_links: i64,
    medium_relevancy_links: i64,
}

impl From<PageSummaryRow> for PageSummary {
    fn from(row: PageSummaryRow) -> Self {
        PageSummary {
            id: row.id,
            url: row.url,
            created_at: row.created_at,
            total_links: row.total_links,
            high_relevancy_links: row.high_relevancy_links,
            medium_relevancy_links: row.medium_relevancy_links,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    id: i64,
    source_page_id: i64,
    url: String,
    title: String,
    link_text: String,
    relevancy: f64,
    relevancy_explanation: String,
    high_priority_keywords: String,
    medium_priority_keywords: String,
    context: String,
}

impl From<LinkRow> for StoredLink {
    fn from(row: LinkRow) -> Self {
        StoredLink {
            id: row.id,
            source_page_id: row.source_page_id,
            url: row.url,
            title: row.title,
            link_text: row.link_text,
            relevancy: row.relevancy,
            relevancy_explanation: row.relevancy_explanation,
            high_priority_keywords: split_keywords(&row.high_priority_keywords),
            medium_priority_keywords: split_keywords(&row.medium_priority_keywords),
            context: row.context,
        }
    }
}

// -- Trait implementation --

impl ledgerhound_core::traits::LinkStore for CrawlRepository {
    async fn register_page(&self, url: &str) -> Result<i64, AppError> {
        CrawlRepository::register_page(self, url).await
    }

    async fn existing_link_urls(&self, urls: &[String]) -> Result<HashSet<String>, AppError> {
        CrawlRepository::existing_link_urls(self, urls).await
    }

    async fn store_links(&self, links: &[ScoredLink], page_id: i64) -> Result<(), AppError> {
        CrawlRepository::store_links(self, links, page_id).await
    }
}
