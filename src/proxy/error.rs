//! Client-facing error taxonomy and translation of upstream failures.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::observability::metrics;
use crate::upstream::UpstreamError;

/// Message returned when an upstream call produced no response.
pub const NO_RESPONSE_MESSAGE: &str = "No response received from upstream service";

/// Errors surfaced to API clients. Every variant is terminal for the request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Too many requests, please try again later")]
    RateLimited { retry_after_secs: u64 },

    #[error("{message}")]
    UpstreamRejected {
        status: u16,
        message: String,
        details: Value,
    },

    #[error("{}", NO_RESPONSE_MESSAGE)]
    UpstreamUnreachable,

    #[error("Request timed out")]
    Timeout,

    #[error("{0}")]
    Internal(String),
}

/// Which upstream operation failed; profile lookups special-case 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    JobSearch,
    Profile,
    PeopleSearch,
}

impl Operation {
    fn failure_message(self) -> &'static str {
        match self {
            Operation::JobSearch => "Failed to search jobs",
            Operation::Profile => "Failed to fetch genome data",
            Operation::PeopleSearch => "Failed to search people",
        }
    }
}

impl ProxyError {
    /// Classify an upstream failure for the given operation.
    pub fn from_upstream(err: UpstreamError, operation: Operation) -> Self {
        metrics::record_upstream_error(err.kind());

        match err {
            UpstreamError::Status { status: 404, .. } if operation == Operation::Profile => {
                ProxyError::NotFound("User not found".to_string())
            }
            UpstreamError::Status { status, body } => ProxyError::UpstreamRejected {
                status,
                message: operation.failure_message().to_string(),
                details: body,
            },
            UpstreamError::Unreachable(e) => {
                tracing::warn!(error = %e, operation = ?operation, "Upstream unreachable");
                ProxyError::UpstreamUnreachable
            }
            UpstreamError::Internal(msg) => ProxyError::Internal(msg),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::UpstreamRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ProxyError::UpstreamUnreachable | ProxyError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        }

        let retry_after = match &self {
            ProxyError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let error = self.to_string();
        let details = match self {
            ProxyError::UpstreamRejected { details, .. } => Some(details),
            _ => None,
        };

        let mut response = (status, Json(ErrorBody { error, details })).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rejected(status: u16) -> UpstreamError {
        UpstreamError::Status {
            status,
            body: json!({ "message": "nope" }),
        }
    }

    #[test]
    fn test_profile_404_becomes_not_found() {
        let err = ProxyError::from_upstream(rejected(404), Operation::Profile);
        assert!(matches!(err, ProxyError::NotFound(_)));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "User not found");
    }

    #[test]
    fn test_search_404_passes_through() {
        let err = ProxyError::from_upstream(rejected(404), Operation::JobSearch);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        match err {
            ProxyError::UpstreamRejected { details, .. } => {
                assert_eq!(details, json!({ "message": "nope" }));
            }
            other => panic!("expected UpstreamRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_upstream_5xx_passes_through_status() {
        let err = ProxyError::from_upstream(rejected(503), Operation::Profile);
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_internal_maps_to_500() {
        let err = ProxyError::from_upstream(
            UpstreamError::Internal("invalid JSON from upstream".into()),
            Operation::JobSearch,
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "invalid JSON from upstream");
    }

    #[test]
    fn test_unreachable_message_is_fixed() {
        assert_eq!(ProxyError::UpstreamUnreachable.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ProxyError::UpstreamUnreachable.to_string(), NO_RESPONSE_MESSAGE);
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ProxyError::RateLimited { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn test_payload_too_large_and_timeout_statuses() {
        let too_large = ProxyError::PayloadTooLarge { limit: 65536 };
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(too_large.to_string(), "Request body exceeds 65536 bytes");

        assert_eq!(ProxyError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(ProxyError::Timeout.into_response().headers().get(header::RETRY_AFTER).is_none());
    }
}
