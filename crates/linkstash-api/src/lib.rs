//! # linkstash-api
//!
//! axum adapter over [`BookmarkService`]. The binary in `main.rs` wires it to
//! Postgres; tests drive [`router`] directly over the in-memory backends.

pub mod config;
pub mod error;
pub mod handlers;

use axum::{routing::get, Router};
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use linkstash_core::BookmarkService;

pub use config::AppConfig;
pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: BookmarkService,
}

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Build the application router.
pub fn router(service: BookmarkService) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/up", get(handlers::health))
        .route(
            "/api/bookmarks",
            get(handlers::list_bookmarks).post(handlers::create_bookmark),
        )
        // Static segment, matched ahead of `:id`.
        .route("/api/bookmarks/search", get(handlers::search_bookmarks))
        .route(
            "/api/bookmarks/:id",
            get(handlers::get_bookmark).delete(handlers::delete_bookmark),
        )
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .with_state(state)
}
