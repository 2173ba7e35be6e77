//! Centralized default constants for linkstash.
//!
//! Binaries and library constructors reference these instead of repeating
//! magic numbers.

// =============================================================================
// SERVICE
// =============================================================================

/// Deadline for a single repository call made through the lifecycle service.
pub const OPERATION_TIMEOUT_SECS: u64 = 10;

/// Age after which a fetched bookmark is considered stale (7 days).
pub const STALE_AFTER_SECS: u64 = 7 * 24 * 60 * 60;

/// Period of the sweep that re-queues `pending` bookmarks with no open job.
pub const REQUEUE_INTERVAL_SECS: u64 = 60;

/// How long a `pending` bookmark must sit untouched before the sweep
/// considers it orphaned. Keeps the sweep clear of in-flight creates.
pub const REQUEUE_MIN_IDLE_SECS: u64 = 60;

// =============================================================================
// DATABASE
// =============================================================================

/// Maximum number of pooled connections.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Seconds to wait when acquiring a pooled connection.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Seconds an idle pooled connection is kept.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

// =============================================================================
// HTTP
// =============================================================================

/// Default bind address.
pub const HTTP_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const HTTP_PORT: u16 = 8080;

/// Default deployment environment name.
pub const APP_ENV: &str = "development";
