//! Bookmark endpoints under `/api/bookmarks`.

use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use linkstash_core::{Bookmark, BookmarkStatus};

use crate::error::ApiError;
use crate::AppState;

/// Body of `POST /api/bookmarks`.
#[derive(Debug, Deserialize)]
pub struct CreateBookmarkBody {
    pub url: String,
    /// Missing and `null` both mean no tags.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Bookmark as rendered to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookmarkResponse {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub favicon_url: Option<String>,
    pub status: BookmarkStatus,
    pub tags: Vec<String>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Bookmark> for BookmarkResponse {
    fn from(b: Bookmark) -> Self {
        Self {
            id: b.id,
            url: b.url,
            title: b.title,
            description: b.description,
            image_url: b.image_url,
            favicon_url: b.favicon_url,
            status: b.status,
            tags: b.tags,
            fetched_at: b.fetched_at,
            created_at: b.created_at,
        }
    }
}

fn to_responses(bookmarks: Vec<Bookmark>) -> Vec<BookmarkResponse> {
    bookmarks.into_iter().map(BookmarkResponse::from).collect()
}

/// Path ids must be integers; anything else is a 400 rather than a 404.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::invalid_id())
}

/// Search parameters from `?q=..&tags=..`.
///
/// `tags` may be comma-separated, repeated, or both.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub tags: Vec<String>,
}

impl SearchParams {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(raw) = raw else {
            return params;
        };

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "q" => params.query = value.into_owned(),
                "tags" => params
                    .tags
                    .extend(value.split(',').map(|t| t.to_string())),
                _ => {}
            }
        }
        params
    }
}

pub async fn create_bookmark(
    State(state): State<AppState>,
    body: Result<Json<CreateBookmarkBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let bookmark = state.service
        .create(&body.url, body.tags.unwrap_or_default())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(BookmarkResponse::from(bookmark))))
}

pub async fn list_bookmarks(
    State(state): State<AppState>,
) -> Result<Json<Vec<BookmarkResponse>>, ApiError> {
    let bookmarks = state.service.get_all().await?;
    Ok(Json(to_responses(bookmarks)))
}

pub async fn search_bookmarks(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Vec<BookmarkResponse>>, ApiError> {
    let params = SearchParams::parse(raw.as_deref());
    let bookmarks = state.service.search(&params.query, params.tags).await?;
    Ok(Json(to_responses(bookmarks)))
}

pub async fn get_bookmark(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookmarkResponse>, ApiError> {
    let id = parse_id(&id)?;
    let bookmark = state.service.get_by_id(id).await?;
    Ok(Json(bookmark.into()))
}

pub async fn delete_bookmark(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(parse_id("abc").is_err());
        assert!(parse_id("1.5").is_err());
    }

    #[test]
    fn test_create_body_accepts_null_tags() {
        let body: CreateBookmarkBody =
            serde_json::from_str(r#"{"url": "https://example.com", "tags": null}"#).unwrap();
        assert_eq!(body.tags, None);

        let body: CreateBookmarkBody =
            serde_json::from_str(r#"{"url": "https://example.com"}"#).unwrap();
        assert_eq!(body.tags, None);
    }

    #[test]
    fn test_search_params_empty() {
        assert_eq!(SearchParams::parse(None), SearchParams::default());
        assert_eq!(SearchParams::parse(Some("")), SearchParams::default());
    }

    #[test]
    fn test_search_params_comma_and_repeated_tags() {
        let params = SearchParams::parse(Some("q=rust%20async&tags=a,b&tags=c"));
        assert_eq!(params.query, "rust async");
        assert_eq!(params.tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_search_params_ignores_unknown_keys() {
        let params = SearchParams::parse(Some("page=2&q=x"));
        assert_eq!(params.query, "x");
        assert!(params.tags.is_empty());
    }
}
