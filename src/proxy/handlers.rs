//! API handlers: validate, call upstream, normalize or translate.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::error::{Operation, ProxyError};
use crate::proxy::normalize::{normalize_results, SearchResult};
use crate::proxy::validate::{validate_people_query, validate_username, SearchQuery};

/// `POST /api/job-search`
pub async fn job_search(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Vec<SearchResult>>, ProxyError> {
    let start = Instant::now();
    let result = search_jobs(&state, body).await;
    record("job_search", start, &result);
    result.map(Json)
}

async fn search_jobs(
    state: &AppState,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Vec<SearchResult>, ProxyError> {
    let Json(body) = body.map_err(|rejection| invalid_json(rejection, state))?;
    let query = SearchQuery::from_body(&body, &state.config.search)?;

    tracing::info!(
        keywords = %query.keywords,
        experience = %query.experience,
        limit = query.limit,
        "Job search"
    );

    let payload = state
        .upstream
        .search_opportunities(&query.keywords, &query.experience, query.limit)
        .await
        .map_err(|e| ProxyError::from_upstream(e, Operation::JobSearch))?;

    Ok(normalize_results(&payload))
}

/// `GET /api/genome/{username}`
pub async fn genome(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Value>, ProxyError> {
    let start = Instant::now();
    let result = fetch_genome(&state, &username).await;
    record("genome", start, &result);
    result.map(Json)
}

async fn fetch_genome(state: &AppState, username: &str) -> Result<Value, ProxyError> {
    let username = validate_username(username)?;
    tracing::info!(username = %username, "Genome lookup");

    state
        .upstream
        .fetch_profile(username)
        .await
        .map_err(|e| ProxyError::from_upstream(e, Operation::Profile))
}

/// `POST /api/people-search`
pub async fn people_search(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ProxyError> {
    let start = Instant::now();
    let result = search_people(&state, body).await;
    record("people_search", start, &result);
    result.map(Json)
}

async fn search_people(
    state: &AppState,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Value, ProxyError> {
    let Json(body) = body.map_err(|rejection| invalid_json(rejection, state))?;
    let query = validate_people_query(&body)?;

    state
        .upstream
        .search_people(query)
        .await
        .map_err(|e| ProxyError::from_upstream(e, Operation::PeopleSearch))
}

fn invalid_json(rejection: JsonRejection, state: &AppState) -> ProxyError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ProxyError::PayloadTooLarge {
            limit: state.config.security.max_body_size,
        };
    }
    ProxyError::Validation(format!("Invalid JSON body: {}", rejection.body_text()))
}

fn record<T>(route: &'static str, start: Instant, result: &Result<T, ProxyError>) {
    let status = match result {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status(),
    };
    metrics::record_request(route, status.as_u16(), start);
}
