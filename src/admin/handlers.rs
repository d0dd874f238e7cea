use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Serialize)]
pub struct RateLimitSummary {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_secs: u64,
    pub tracked_clients: usize,
    pub max_tracked_clients: usize,
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub rate_limit: RateLimitSummary,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let rl = &state.config.rate_limit;

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        rate_limit: RateLimitSummary {
            enabled: rl.enabled,
            max_requests: rl.max_requests,
            window_secs: rl.window_secs,
            tracked_clients: state.limiter.tracked_clients(),
            max_tracked_clients: rl.max_tracked_clients,
        },
    })
}
