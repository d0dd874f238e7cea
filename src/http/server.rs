//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, timeout, body limit, CORS, headers)
//! - Render timeouts and oversized bodies as JSON error bodies
//! - Apply rate limiting to `/api` routes
//! - Bind server to listener and shut down gracefully

use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    middleware,
    routing::{get, post},
    BoxError, Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::admin::admin_router;
use crate::config::ProxyConfig;
use crate::http::request::{make_span, propagate_request_id_layer, set_request_id_layer};
use crate::proxy::handlers::{genome, job_search, people_search};
use crate::proxy::ProxyError;
use crate::security::rate_limit::{
    rate_limit_middleware, InMemoryRateLimiter, RateLimitState, RateLimiter,
};
use crate::upstream::{UpstreamClient, UpstreamError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub upstream: UpstreamClient,
    pub limiter: Arc<dyn RateLimiter>,
}

/// HTTP server for the talent proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
    /// Set when the built-in limiter is used; it needs a sweeper task.
    sweepable: Option<Arc<InMemoryRateLimiter>>,
}

impl HttpServer {
    /// Create a new HTTP server with the in-memory rate limiter.
    pub fn new(config: ProxyConfig) -> Result<Self, UpstreamError> {
        let limiter = Arc::new(InMemoryRateLimiter::from_config(&config.rate_limit));
        let mut server = Self::with_rate_limiter(config, limiter.clone())?;
        server.sweepable = Some(limiter);
        Ok(server)
    }

    /// Create a server around an externally owned rate limiter.
    pub fn with_rate_limiter(
        config: ProxyConfig,
        limiter: Arc<dyn RateLimiter>,
    ) -> Result<Self, UpstreamError> {
        let config = Arc::new(config);
        let state = AppState {
            config: config.clone(),
            upstream: UpstreamClient::new(&config.upstream)?,
            limiter,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            sweepable: None,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut api = Router::new()
            .route("/api/job-search", post(job_search))
            .route("/api/genome/{username}", get(genome))
            .route("/api/people-search", post(people_search));

        if config.rate_limit.enabled {
            let rate_limit_state = RateLimitState {
                limiter: state.limiter.clone(),
                trust_forwarded_for: config.rate_limit.trust_forwarded_for,
            };
            api = api.route_layer(middleware::from_fn_with_state(
                rate_limit_state,
                rate_limit_middleware,
            ));
        }

        let mut router = Router::new().route("/health", get(health)).merge(api);
        if config.admin.enabled {
            router = router.merge(admin_router(config.admin.api_key.clone()));
        }

        let mut router = router
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(handle_middleware_error))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            );

        if config.security.enable_headers {
            router = router
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ));
        }

        if config.security.cors_allow_any_origin {
            router = router.layer(CorsLayer::permissive());
        }

        router
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener until shutdown.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rate_limit = self.config.rate_limit.enabled,
            "HTTP server starting"
        );

        if self.config.rate_limit.enabled && self.config.rate_limit.trust_forwarded_for {
            tracing::warn!(
                "Rate limiting keys on X-Forwarded-For; callers can choose their own key \
                 unless a trusted proxy in front overwrites the header"
            );
        }

        if let Some(limiter) = self.sweepable.clone() {
            let interval = Duration::from_secs(self.config.rate_limit.sweep_interval_secs);
            tokio::spawn(limiter.run_sweeper(interval, shutdown.resubscribe()));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router with all layers, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Turn errors from the timeout layer into the JSON error shape.
async fn handle_middleware_error(err: BoxError) -> ProxyError {
    if err.is::<Elapsed>() {
        tracing::warn!("Request exceeded the overall timeout");
        ProxyError::Timeout
    } else {
        ProxyError::Internal(format!("Unhandled middleware error: {}", err))
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn server(config: ProxyConfig) -> HttpServer {
        HttpServer::new(config).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_has_request_id_and_security_headers() {
        let app = server(ProxyConfig::default()).router();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_supplied_request_id_is_echoed() {
        let app = server(ProxyConfig::default()).router();
        let response = app
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "trace-me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "trace-me");
    }

    #[tokio::test]
    async fn test_invalid_username_rejected_in_process() {
        let app = server(ProxyConfig::default()).router();
        let response = app
            .oneshot(Request::get("/api/genome/a.b").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().contains_key("ratelimit-remaining"));
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("Username"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let app = server(ProxyConfig::default()).router();
        let response = app
            .oneshot(
                Request::post("/api/job-search")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await.get("error").is_some());
    }

    #[tokio::test]
    async fn test_oversized_body_is_json_413() {
        let app = server(ProxyConfig::default()).router();
        let payload = format!(r#"{{"keywords":"{}"}}"#, "a".repeat(70 * 1024));
        let response = app
            .oneshot(
                Request::post("/api/job-search")
                    .header("content-type", "application/json")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let body = json_body(response).await;
        assert_eq!(body["error"], "Request body exceeds 65536 bytes");
    }

    #[tokio::test]
    async fn test_overall_timeout_is_json_504() {
        // Accepts into the backlog but never answers.
        let silent = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = ProxyConfig::default();
        config.upstream.genome_url = format!("http://{}/bios", silent.local_addr().unwrap());
        config.timeouts.request_secs = 1;

        let response = server(config)
            .router()
            .oneshot(Request::get("/api/genome/slow_user").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(json_body(response).await["error"], "Request timed out");
        drop(silent);
    }

    #[tokio::test]
    async fn test_admin_routes_absent_unless_enabled() {
        let app = server(ProxyConfig::default()).router();
        let response = app
            .oneshot(Request::get("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
