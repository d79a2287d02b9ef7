//! Entry keys: one key per request method + URL.

use sha2::{Digest, Sha256};

use crate::http::Method;

/// Compute the storage key for a request.
///
/// Two requests share a key exactly when their method and full URL match, so
/// a later write for the same pair replaces the earlier one.
pub fn compute_entry_key(method: Method, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let a = compute_entry_key(Method::Get, "https://example.com/");
        let b = compute_entry_key(Method::Get, "https://example.com/");
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_depends_on_method() {
        let get = compute_entry_key(Method::Get, "https://example.com/api/contact");
        let post = compute_entry_key(Method::Post, "https://example.com/api/contact");
        assert_ne!(get, post);
    }

    #[test]
    fn test_key_keeps_query() {
        let a = compute_entry_key(Method::Get, "https://example.com/?a=1");
        let b = compute_entry_key(Method::Get, "https://example.com/?a=2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_format() {
        let key = compute_entry_key(Method::Get, "https://example.com");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
