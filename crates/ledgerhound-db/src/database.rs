use ledgerhound_core::AppError;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use crate::config::DatabaseConfig;
use crate::repository::CrawlRepository;

/// Central database facade — owns the connection pool, bootstraps the
/// schema, and vends repository instances.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to SQLite with the given configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    /// Create a `Database` from an existing pool (useful for testing).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if they do not exist yet. Idempotent,
    /// run at every startup.
    pub async fn init_schema(&self) -> Result<(), AppError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_page_id INTEGER NOT NULL REFERENCES pages(id),
                url TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL DEFAULT '',
                link_text TEXT NOT NULL DEFAULT '',
                relevancy REAL NOT NULL DEFAULT 0.0,
                relevancy_explanation TEXT NOT NULL DEFAULT '',
                high_priority_keywords TEXT NOT NULL DEFAULT '',
                medium_priority_keywords TEXT NOT NULL DEFAULT '',
                context TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_links_source_page ON links (source_page_id)",
            "CREATE INDEX IF NOT EXISTS idx_links_relevancy ON links (relevancy)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Schema init failed: {e}")))?;
        }

        tracing::debug!("Database schema ready");
        Ok(())
    }

    /// Get a [`CrawlRepository`] backed by this pool.
    pub fn crawl_repo(&self) -> CrawlRepository {
        CrawlRepository::new(self.pool.clone())
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
