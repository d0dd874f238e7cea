//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits consistent)
//! - Check that every upstream endpoint is an absolute http(s) URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{ProxyConfig, PLACEHOLDER_API_KEY};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    for (field, value) in [
        ("upstream.search_url", &config.upstream.search_url),
        ("upstream.people_search_url", &config.upstream.people_search_url),
        ("upstream.genome_url", &config.upstream.genome_url),
    ] {
        if let Err(message) = check_http_url(value) {
            errors.push(ValidationError::new(field, message));
        }
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be greater than 0"));
    }
    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "upstream.connect_timeout_secs",
            "must be greater than 0",
        ));
    }
    if config.upstream.user_agent.trim().is_empty() {
        errors.push(ValidationError::new("upstream.user_agent", "must not be empty"));
    }

    if config.timeouts.request_secs <= config.upstream.timeout_secs {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than upstream.timeout_secs",
        ));
    }

    if config.search.max_limit == 0 {
        errors.push(ValidationError::new("search.max_limit", "must be greater than 0"));
    }
    if config.search.default_limit == 0 || config.search.default_limit > config.search.max_limit {
        errors.push(ValidationError::new(
            "search.default_limit",
            format!("must be between 1 and {}", config.search.max_limit),
        ));
    }
    if config.search.default_experience.trim().is_empty() {
        errors.push(ValidationError::new("search.default_experience", "must not be empty"));
    }

    let rl = &config.rate_limit;
    if rl.max_requests == 0 {
        errors.push(ValidationError::new("rate_limit.max_requests", "must be greater than 0"));
    }
    if rl.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be greater than 0"));
    }
    if rl.max_tracked_clients == 0 {
        errors.push(ValidationError::new(
            "rate_limit.max_tracked_clients",
            "must be greater than 0",
        ));
    }
    if rl.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "rate_limit.sweep_interval_secs",
            "must be greater than 0",
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.admin.enabled {
        let key = config.admin.api_key.trim();
        if key.is_empty() {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must not be empty when admin is enabled",
            ));
        } else if key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must be changed from the placeholder when admin is enabled",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(value: &str) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("'{}' is not a valid URL: {}", value, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.upstream.search_url = "not a url".into();
        config.upstream.genome_url = "ftp://example.com/bios".into();
        config.search.default_limit = 500;
        config.rate_limit.window_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();

        assert_eq!(errors.len(), 4);
        assert!(fields.contains(&"upstream.search_url"));
        assert!(fields.contains(&"upstream.genome_url"));
        assert!(fields.contains(&"search.default_limit"));
        assert!(fields.contains(&"rate_limit.window_secs"));
    }

    #[test]
    fn test_request_timeout_must_exceed_upstream_timeout() {
        let mut config = ProxyConfig::default();
        config.timeouts.request_secs = 10;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "timeouts.request_secs");
    }

    #[test]
    fn test_admin_key_must_be_set_when_enabled() {
        let mut config = ProxyConfig::default();
        config.admin.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "admin.api_key");
        assert!(errors[0].message.contains("placeholder"));

        config.admin.api_key = "   ".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].message.contains("empty"));

        config.admin.api_key = "a-real-operator-key".into();
        assert!(validate_config(&config).is_ok());
    }
}
