//! Upstream talent API subsystem.
//!
//! # Data Flow
//! ```text
//! Validated request
//!     → client.rs (build envelope, POST/GET with timeout + user agent)
//!     → Ok(JSON payload)            → normalizer / passthrough
//!     → Err(UpstreamError)          → error translator
//! ```
//!
//! # Design Decisions
//! - Every call has a deadline (configured timeout, default 10s)
//! - No retries: a failure is reported once per inbound request
//! - Non-success bodies are kept so they can be surfaced as `details`

pub mod client;

pub use client::{SearchEnvelope, UpstreamClient, UpstreamError};
