//! Operator endpoints, mounted only when `admin.enabled` is set.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::{admin_auth_middleware, AdminKey};
use self::handlers::get_status;
use crate::http::server::AppState;

pub fn admin_router(api_key: String) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .layer(middleware::from_fn_with_state(
            AdminKey(api_key.into()),
            admin_auth_middleware,
        ))
}
