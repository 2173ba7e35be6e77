//! # linkstash-core
//!
//! Core types, traits, and the bookmark lifecycle service for linkstash.
//!
//! This crate owns the bookmark entity and its status state machine, the
//! storage-agnostic [`BookmarkRepository`] and [`EnrichmentQueue`] contracts,
//! in-memory implementations of both, and the [`BookmarkService`] that the
//! HTTP layer drives.

pub mod defaults;
pub mod error;
pub mod memory;
pub mod models;
pub mod service;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{Error, ErrorKind, Result};
pub use memory::{MemoryBookmarkRepository, MemoryEnrichmentQueue};
pub use models::*;
pub use service::{BookmarkService, ServiceConfig};
pub use traits::*;
pub use validation::{normalize_tags, validate_url};
