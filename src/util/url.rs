use url::Url;

/// Resolves a potentially relative URL against a base URL.
///
/// Handles absolute, protocol-relative (`//host/path`) and relative forms.
/// Returns `None` when the result is not a valid URL.
pub fn resolve_url(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    // Protocol-relative: inherit the base scheme
    if let Some(rest) = href.strip_prefix("//") {
        return Url::parse(&format!("{}://{}", base.scheme(), rest)).ok();
    }

    base.join(href).ok()
}

/// Returns true if `url` carries a query parameter `name` whose value is `value`.
pub fn has_query_param(url: &Url, name: &str, value: &str) -> bool {
    url.query_pairs().any(|(k, v)| k == name && v == value)
}
