//! HTTP handlers for linkstash-api.

pub mod bookmarks;

use axum::Json;
use serde_json::{json, Value};

pub use bookmarks::{
    create_bookmark, delete_bookmark, get_bookmark, list_bookmarks, search_bookmarks,
    BookmarkResponse, CreateBookmarkBody, SearchParams,
};

/// Liveness check.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
