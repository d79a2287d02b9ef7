//! Resolving page-relative request targets into absolute URLs.
//!
//! Pages issue requests like `/api/contact` or `_next/static/chunks/main.js`;
//! the worker keys its partitions on absolute URLs, so every target is resolved
//! against the site origin first.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a request target against `origin`.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Absolute URLs (any scheme) are kept, relative ones join the origin
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
///
/// Non-http schemes are accepted here; the router decides to pass them through.
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        Err(e) => return Err(UrlError::InvalidUrl(e.to_string())),
    };

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://spinezone.test").unwrap()
    }

    #[test]
    fn test_resolve_absolute_path() {
        let url = resolve(&origin(), "/api/contact").unwrap();
        assert_eq!(url.as_str(), "https://spinezone.test/api/contact");
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = resolve(&origin(), "_next/static/chunks/main.js").unwrap();
        assert_eq!(url.path(), "/_next/static/chunks/main.js");
    }

    #[test]
    fn test_resolve_keeps_absolute_url() {
        let url = resolve(&origin(), "https://cdn.example.com/font.woff2").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn test_resolve_lowercase_host() {
        let url = resolve(&origin(), "https://CDN.EXAMPLE.COM/a.css").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn test_resolve_remove_fragment() {
        let url = resolve(&origin(), "/blog#latest").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/blog");
    }

    #[test]
    fn test_resolve_preserve_query() {
        let url = resolve(&origin(), "/api/locations?state=ca&limit=5").unwrap();
        assert_eq!(url.query(), Some("state=ca&limit=5"));
    }

    #[test]
    fn test_resolve_keeps_other_schemes() {
        let url = resolve(&origin(), "chrome-extension://abcdef/inject.js").unwrap();
        assert_eq!(url.scheme(), "chrome-extension");
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&origin(), "   "), Err(UrlError::Empty)));
    }
}
