//! # linkstash-db
//!
//! PostgreSQL database layer for linkstash.
//!
//! This crate provides:
//! - Connection pool management
//! - [`PgBookmarkRepository`], the durable [`BookmarkRepository`]
//! - [`PgEnrichmentQueue`], a `SKIP LOCKED` job table feeding the enrichment worker
//! - Embedded migrations behind the `migrations` feature
//!
//! ## Example
//!
//! ```rust,ignore
//! use linkstash_db::{BookmarkRepository, Database, NewBookmark, PoolConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/linkstash", PoolConfig::from_env()).await?;
//!     db.migrate().await?;
//!
//!     let saved = db
//!         .bookmarks
//!         .save(NewBookmark::pending("https://example.com", vec![]).into())
//!         .await?;
//!
//!     println!("Created bookmark: {}", saved.id);
//!     Ok(())
//! }
//! ```
pub mod bookmarks;
pub mod enrichment_queue;
pub mod pool;

// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use linkstash_core::*;

pub use bookmarks::PgBookmarkRepository;
pub use enrichment_queue::PgEnrichmentQueue;
pub use pool::{create_pool, PoolConfig};

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Bookmark repository.
    pub bookmarks: PgBookmarkRepository,
    /// Enrichment job queue.
    pub enrichment: PgEnrichmentQueue,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            bookmarks: PgBookmarkRepository::new(pool.clone()),
            enrichment: PgEnrichmentQueue::new(pool.clone()),
            pool,
        }
    }

    /// Open a pool and build the repositories on it.
    pub async fn connect(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool(url, &config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        migrator()
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

/// The embedded migration set.
#[cfg(feature = "migrations")]
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("../../migrations")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_plain_text_unchanged() {
        assert_eq!(escape_like("rust async"), "rust async");
    }

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
    }

    #[test]
    fn test_escape_like_backslash_escaped_first() {
        assert_eq!(escape_like("a\\%b"), "a\\\\\\%b");
    }

    #[cfg(feature = "migrations")]
    #[test]
    fn test_migrator_embeds_both_tables() {
        let migrator = migrator();
        let descriptions: Vec<_> = migrator
            .iter()
            .map(|m| m.description.to_string())
            .collect();
        assert!(descriptions.iter().any(|d| d.contains("create bookmark")));
        assert!(descriptions
            .iter()
            .any(|d| d.contains("create enrichment job")));
    }
}
