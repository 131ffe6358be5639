//! Utility functions and helpers.

pub mod http;

use url::Url;

use crate::models::ListingId;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Extract the listing id carried in the `marker` query parameter of a URL.
///
/// Only a purely numeric value is accepted.
pub fn extract_listing_id(url: &str, marker: &str) -> Option<ListingId> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key.eq_ignore_ascii_case(marker))
        .and_then(|(_, value)| {
            if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                value.parse().ok()
            } else {
                None
            }
        })
}

/// File extension (with dot) of the last path segment of a URL, if any.
pub fn url_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 4 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}
