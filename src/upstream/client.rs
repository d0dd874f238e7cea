//! HTTP client for the third-party talent API.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::UpstreamConfig;

/// Failures raised by an upstream call, before translation to a client response.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The upstream answered with a non-success status.
    #[error("upstream responded with status {status}")]
    Status { status: u16, body: Value },

    /// The request was sent but no response arrived (timeout or transport failure).
    #[error("no response from upstream: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// Anything else: request construction, undecodable success payloads.
    #[error("upstream call failed: {0}")]
    Internal(String),
}

impl UpstreamError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_builder() || err.is_decode() {
            UpstreamError::Internal(err.to_string())
        } else if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            UpstreamError::Unreachable(err)
        } else {
            UpstreamError::Internal(err.to_string())
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Status { .. } => "status",
            UpstreamError::Unreachable(_) => "unreachable",
            UpstreamError::Internal(_) => "internal",
        }
    }
}

/// Search filter sent to the opportunity search endpoint.
///
/// Serializes as `{"size": n, "and": [{"skill/role": {"text": .., "experience": ..}}]}`.
#[derive(Debug, Serialize)]
pub struct SearchEnvelope<'a> {
    pub size: u32,
    pub and: Vec<SearchClause<'a>>,
}

#[derive(Debug, Serialize)]
pub struct SearchClause<'a> {
    #[serde(rename = "skill/role")]
    pub skill_role: SkillRole<'a>,
}

#[derive(Debug, Serialize)]
pub struct SkillRole<'a> {
    pub text: &'a str,
    pub experience: &'a str,
}

impl<'a> SearchEnvelope<'a> {
    pub fn new(keywords: &'a str, experience: &'a str, size: u32) -> Self {
        Self {
            size,
            and: vec![SearchClause {
                skill_role: SkillRole {
                    text: keywords,
                    experience,
                },
            }],
        }
    }
}

/// One-shot, non-retrying client for the talent API.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    search_url: String,
    people_search_url: String,
    genome_url: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            search_url: config.search_url.clone(),
            people_search_url: config.people_search_url.clone(),
            genome_url: config.genome_url.trim_end_matches('/').to_string(),
        })
    }

    /// Search opportunities matching `keywords` at the given experience level.
    pub async fn search_opportunities(
        &self,
        keywords: &str,
        experience: &str,
        limit: u32,
    ) -> Result<Value, UpstreamError> {
        let envelope = SearchEnvelope::new(keywords, experience, limit);
        tracing::debug!(url = %self.search_url, size = limit, "Searching opportunities");

        let response = self
            .client
            .post(&self.search_url)
            .json(&envelope)
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;

        read_json(response).await
    }

    /// Fetch the genome (profile) document for an already validated username.
    pub async fn fetch_profile(&self, username: &str) -> Result<Value, UpstreamError> {
        let url = format!("{}/{}", self.genome_url, username);
        tracing::debug!(url = %url, "Fetching profile");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;

        read_json(response).await
    }

    /// Forward a people search query verbatim.
    pub async fn search_people(&self, query: &Value) -> Result<Value, UpstreamError> {
        tracing::debug!(url = %self.people_search_url, "Searching people");

        let response = self
            .client
            .post(&self.people_search_url)
            .json(query)
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;

        read_json(response).await
    }
}

/// Decode a success body, or capture the status and body of a rejection.
async fn read_json(response: Response) -> Result<Value, UpstreamError> {
    let status = response.status();

    if !status.is_success() {
        let text = response.text().await.map_err(UpstreamError::from_reqwest)?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await.map_err(UpstreamError::from_reqwest)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| UpstreamError::Internal(format!("invalid JSON from upstream: {}", e)))
}
