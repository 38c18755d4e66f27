//! Utility functions and helpers.

use std::borrow::Cow;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .map(|base| resolve_url(&base, href))
}

/// Percent-decode a path segment, keeping the input on malformed escapes.
pub fn percent_decode(s: &str) -> String {
    match urlencoding::decode(s) {
        Ok(Cow::Borrowed(_)) => s.to_string(),
        Ok(Cow::Owned(decoded)) => decoded,
        Err(_) => s.to_string(),
    }
}
