//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::cache::PartitionKind;
use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

/// Upper bound for `partitions.*.max_age_secs` (ten years).
pub const MAX_AGE_LIMIT_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version` or `cache_prefix` is empty or contains whitespace
    /// - `origin` is not an absolute http(s) URL
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - a path setting does not start with `/`
    /// - a partition `max_entries` is 0
    /// - a partition `max_age_secs` exceeds ten years
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.is_empty() || self.version.chars().any(char::is_whitespace) {
            return Err(invalid("version", "must be a non-empty tag without whitespace"));
        }
        if self.cache_prefix.is_empty() || self.cache_prefix.chars().any(char::is_whitespace) {
            return Err(invalid("cache_prefix", "must be non-empty without whitespace"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(_) => return Err(invalid("origin", "must use http or https")),
            Err(e) => return Err(invalid("origin", &e.to_string())),
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        for (field, value) in [
            ("offline_page", &self.offline_page),
            ("routing.api_prefix", &self.routing.api_prefix),
            ("sync.submission_endpoint", &self.sync.submission_endpoint),
        ] {
            if !value.starts_with('/') {
                return Err(invalid(field, "must start with '/'"));
            }
        }

        if self.routing.static_marker.is_empty() {
            return Err(invalid("routing.static_marker", "must not be empty"));
        }
        if self.sync.tag.is_empty() {
            return Err(invalid("sync.tag", "must not be empty"));
        }

        if self.precache.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid("precache", "entries must not be empty"));
        }

        for kind in PartitionKind::ALL {
            if self.partitions.policy(kind).max_entries == Some(0) {
                return Err(ConfigError::Invalid {
                    field: format!("partitions.{}.max_entries", kind.as_str()),
                    reason: "must be greater than 0".into(),
                });
            }
            if self.partitions.policy(kind).max_age_secs.is_some_and(|secs| secs > MAX_AGE_LIMIT_SECS) {
                return Err(ConfigError::Invalid {
                    field: format!("partitions.{}.max_age_secs", kind.as_str()),
                    reason: format!("must not exceed {MAX_AGE_LIMIT_SECS} (ten years)"),
                });
            }
        }

        if !self.sync.submission_endpoint.starts_with(&self.routing.api_prefix) {
            tracing::warn!(
                endpoint = %self.sync.submission_endpoint,
                api_prefix = %self.routing.api_prefix,
                "submission endpoint is outside the API prefix"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(config: AppConfig, expected: &str) {
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { ref field, .. }) if field == expected), "{result:?}");
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_version() {
        assert_invalid(AppConfig { version: String::new(), ..Default::default() }, "version");
        assert_invalid(AppConfig { version: "1.0 beta".into(), ..Default::default() }, "version");
    }

    #[test]
    fn test_validate_origin() {
        assert_invalid(AppConfig { origin: "not a url".into(), ..Default::default() }, "origin");
        assert_invalid(AppConfig { origin: "ftp://example.com".into(), ..Default::default() }, "origin");
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        assert_invalid(AppConfig { max_bytes: 0, ..Default::default() }, "max_bytes");
    }

    #[test]
    fn test_validate_timeout_bounds() {
        assert_invalid(AppConfig { timeout_ms: 50, ..Default::default() }, "timeout_ms");
        assert_invalid(AppConfig { timeout_ms: 301_000, ..Default::default() }, "timeout_ms");
    }

    #[test]
    fn test_validate_relative_paths() {
        let mut config = AppConfig::default();
        config.routing.api_prefix = "api/".into();
        assert_invalid(config, "routing.api_prefix");

        let mut config = AppConfig::default();
        config.sync.submission_endpoint = "contact".into();
        assert_invalid(config, "sync.submission_endpoint");
    }

    #[test]
    fn test_validate_zero_entry_cap() {
        let mut config = AppConfig::default();
        config.partitions.images.max_entries = Some(0);
        assert_invalid(config, "partitions.images.max_entries");
    }

    #[test]
    fn test_validate_max_age_bound() {
        let mut config = AppConfig::default();
        config.partitions.dynamic.max_age_secs = Some(MAX_AGE_LIMIT_SECS);
        assert!(config.validate().is_ok());

        for secs in [MAX_AGE_LIMIT_SECS + 1, 10_000_000_000_000_000, u64::MAX] {
            let mut config = AppConfig::default();
            config.partitions.dynamic.max_age_secs = Some(secs);
            assert_invalid(config, "partitions.dynamic.max_age_secs");
        }
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
