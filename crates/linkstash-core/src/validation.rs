//! Input validation for bookmark creation and search.

use url::Url;

use crate::error::{Error, Result};

/// Schemes a bookmark may point at.
pub const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Validate a user-submitted URL.
///
/// Returns the input trimmed of surrounding whitespace. The stored string is
/// the user's, not the parser's serialization, so `https://a.test` and
/// `https://a.test/` remain distinct bookmarks.
pub fn validate_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("url must not be empty".to_string()));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| Error::InvalidInput(format!("invalid url {:?}: {}", trimmed, e)))?;

    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return Err(Error::InvalidInput(format!(
            "unsupported url scheme {:?}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(Error::InvalidInput(format!(
            "url {:?} has no host",
            trimmed
        )));
    }

    Ok(trimmed.to_string())
}

/// Trim tags, drop empty ones and remove duplicates, keeping first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
