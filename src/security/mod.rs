//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming /api request:
//!     → headers.rs (identify client: X-Forwarded-For or peer IP)
//!     → rate_limit.rs (fixed window per client)
//!     → Pass to request validation
//! ```
//!
//! # Design Decisions
//! - Rate limiting happens before validation and before any upstream cost
//! - The limiter is injected as a trait object, never a global
//! - No trust in client-held session data

pub mod headers;
pub mod rate_limit;

pub use rate_limit::{InMemoryRateLimiter, RateDecision, RateLimitState, RateLimiter};
