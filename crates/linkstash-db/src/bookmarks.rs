//! Bookmark repository implementation.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, instrument};

use linkstash_core::*;

use crate::escape_like;

const BOOKMARK_COLUMNS: &str = "id, url, title, description, image_url, favicon_url, status, \
                                tags, fetched_at, created_at, updated_at";

/// Unique constraint guarding `bookmark.url`.
const URL_UNIQUE_CONSTRAINT: &str = "bookmark_url_key";

/// PostgreSQL implementation of BookmarkRepository.
#[derive(Clone)]
pub struct PgBookmarkRepository {
    pool: Pool<Postgres>,
}

impl PgBookmarkRepository {
    /// Create a new PgBookmarkRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> Result<Bookmark> {
        let status: String = row.try_get("status")?;
        Ok(Bookmark {
            id: row.try_get("id")?,
            url: row.try_get("url")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            image_url: row.try_get("image_url")?,
            favicon_url: row.try_get("favicon_url")?,
            status: status.parse()?,
            tags: row.try_get("tags")?,
            fetched_at: row.try_get("fetched_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn map_rows(rows: Vec<PgRow>) -> Result<Vec<Bookmark>> {
        rows.into_iter().map(Self::map_row).collect()
    }

    /// Translate constraint violations into domain errors.
    fn map_write_error(err: sqlx::Error, url: &str) -> Error {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation()
                && db_err.constraint().map_or(true, |c| c == URL_UNIQUE_CONSTRAINT)
            {
                return Error::Conflict(format!("Bookmark for {} already exists", url));
            }
            if db_err.is_check_violation() {
                return Error::InvalidInput(db_err.message().to_string());
            }
        }
        Error::Database(err)
    }

    async fn insert(&self, new: NewBookmark) -> Result<Bookmark> {
        let now = Utc::now();
        let fetched_at = (new.status == BookmarkStatus::Fetched).then_some(now);

        let row = sqlx::query(&format!(
            "INSERT INTO bookmark (url, status, tags, fetched_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING {BOOKMARK_COLUMNS}"
        ))
        .bind(&new.url)
        .bind(new.status.as_str())
        .bind(&new.tags)
        .bind(fetched_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(e, &new.url))?;

        Self::map_row(row)
    }

    async fn update(&self, bookmark: Bookmark) -> Result<Bookmark> {
        let now = Utc::now();

        // A dead row only accepts a write that keeps it dead.
        let row = sqlx::query(&format!(
            "UPDATE bookmark
             SET url = $2, title = $3, description = $4, image_url = $5, favicon_url = $6,
                 status = $7, tags = $8, fetched_at = $9, updated_at = $10
             WHERE id = $1 AND (status <> 'dead' OR $7 = 'dead')
             RETURNING {BOOKMARK_COLUMNS}"
        ))
        .bind(bookmark.id)
        .bind(&bookmark.url)
        .bind(&bookmark.title)
        .bind(&bookmark.description)
        .bind(&bookmark.image_url)
        .bind(&bookmark.favicon_url)
        .bind(bookmark.status.as_str())
        .bind(&bookmark.tags)
        .bind(bookmark.fetched_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(e, &bookmark.url))?;

        match row {
            Some(row) => Self::map_row(row),
            None if self.exists(bookmark.id).await? => Err(Error::InvalidInput(format!(
                "Bookmark {} is dead and cannot become {}",
                bookmark.id, bookmark.status
            ))),
            None => Err(Error::NotFound(format!("Bookmark {} not found", bookmark.id))),
        }
    }
}

#[async_trait]
impl BookmarkRepository for PgBookmarkRepository {
    #[instrument(skip(self, bookmark), fields(subsystem = "database", component = "bookmarks", op = "save"))]
    async fn save(&self, bookmark: SaveBookmark) -> Result<Bookmark> {
        let start = Instant::now();
        let saved = match bookmark {
            SaveBookmark::Insert(new) => self.insert(new).await?,
            SaveBookmark::Update(existing) => self.update(existing).await?,
        };
        debug!(
            bookmark_id = saved.id,
            status = %saved.status,
            duration_ms = start.elapsed().as_millis() as u64,
            "Bookmark saved"
        );
        Ok(saved)
    }

    async fn find_by_id(&self, id: i64) -> Result<Bookmark> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKMARK_COLUMNS} FROM bookmark WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::map_row)
            .transpose()?
            .ok_or_else(|| Error::NotFound(format!("Bookmark {} not found", id)))
    }

    async fn find_by_url(&self, url: &str) -> Result<Bookmark> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKMARK_COLUMNS} FROM bookmark WHERE url = $1"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::map_row)
            .transpose()?
            .ok_or_else(|| Error::NotFound(format!("Bookmark for {} not found", url)))
    }

    async fn find_all(&self) -> Result<Vec<Bookmark>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKMARK_COLUMNS} FROM bookmark ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Self::map_rows(rows)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM bookmark WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Bookmark {} not found", id)));
        }
        Ok(())
    }

    #[instrument(skip(self, search), fields(subsystem = "database", component = "bookmarks", op = "search"))]
    async fn search(&self, search: &BookmarkSearch) -> Result<Vec<Bookmark>> {
        let start = Instant::now();
        let search = search.normalized();
        let pattern = format!("%{}%", escape_like(&search.query));

        let rows = sqlx::query(&format!(
            "SELECT {BOOKMARK_COLUMNS} FROM bookmark
             WHERE ($1::text = ''
                    OR title ILIKE $2 ESCAPE '\\'
                    OR description ILIKE $2 ESCAPE '\\')
               AND (cardinality($3::text[]) = 0 OR tags && $3::text[])
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(&search.query)
        .bind(&pattern)
        .bind(&search.tags)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let results = Self::map_rows(rows)?;
        debug!(
            tag_count = search.tags.len(),
            result_count = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Bookmark search complete"
        );
        Ok(results)
    }

    async fn find_older_than_fetched(&self, cutoff: DateTime<Utc>) -> Result<Vec<Bookmark>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKMARK_COLUMNS} FROM bookmark
             WHERE status = 'fetched' AND fetched_at < $1
             ORDER BY fetched_at ASC, id ASC"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Self::map_rows(rows)
    }

    async fn find_pending_before(&self, idle_since: DateTime<Utc>) -> Result<Vec<Bookmark>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKMARK_COLUMNS} FROM bookmark
             WHERE status = 'pending' AND updated_at <= $1
             ORDER BY updated_at ASC, id ASC"
        ))
        .bind(idle_since)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Self::map_rows(rows)
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bookmark WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(exists)
    }
}
