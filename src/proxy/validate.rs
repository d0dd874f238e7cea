//! Inbound request validation.
//!
//! Runs before any upstream call so malformed input never costs a round trip.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::config::SearchConfig;
use crate::proxy::error::ProxyError;

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{3,50}$").expect("username pattern is valid"));

/// A validated opportunity search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keywords: String,
    pub experience: String,
    pub limit: u32,
}

impl SearchQuery {
    /// Validate a `{keywords, experience?, limit?}` body against the search policy.
    pub fn from_body(body: &Value, policy: &SearchConfig) -> Result<Self, ProxyError> {
        let object = body
            .as_object()
            .ok_or_else(|| ProxyError::Validation("Request body must be a JSON object".into()))?;

        let keywords = match object.get("keywords") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return Err(ProxyError::Validation("Keywords are required".into())),
        };

        let experience = match object.get("experience") {
            None | Some(Value::Null) => policy.default_experience.clone(),
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(_) => {
                return Err(ProxyError::Validation(
                    "Experience must be a non-empty string".into(),
                ))
            }
        };

        let limit = match object.get("limit") {
            None | Some(Value::Null) => policy.default_limit,
            Some(value) => parse_limit(value)?,
        };
        if limit > policy.max_limit {
            return Err(ProxyError::Validation(format!(
                "Limit must not exceed {}",
                policy.max_limit
            )));
        }

        Ok(Self {
            keywords,
            experience,
            limit,
        })
    }
}

/// Accept a positive integer, either as a JSON number or a numeric string.
fn parse_limit(value: &Value) -> Result<u32, ProxyError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) if n >= 1 => Ok(u32::try_from(n).unwrap_or(u32::MAX)),
        _ => Err(ProxyError::Validation("Limit must be a positive integer".into())),
    }
}

/// Check a profile username against `^[a-zA-Z0-9_-]{3,50}$`.
pub fn validate_username(username: &str) -> Result<&str, ProxyError> {
    if USERNAME_PATTERN.is_match(username) {
        Ok(username)
    } else {
        Err(ProxyError::Validation(
            "Username must be 3-50 characters of letters, digits, '_' or '-'".into(),
        ))
    }
}

/// People search bodies are forwarded verbatim but must at least be an object.
pub fn validate_people_query(body: &Value) -> Result<&Value, ProxyError> {
    if body.is_object() {
        Ok(body)
    } else {
        Err(ProxyError::Validation("Request body must be a JSON object".into()))
    }
}
