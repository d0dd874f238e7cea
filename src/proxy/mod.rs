//! Request shaping subsystem.
//!
//! # Data Flow
//! ```text
//! /api request (already admitted by the rate limiter)
//!     → validate.rs (keywords, limit, username pattern)
//!     → upstream client call
//!     → normalize.rs (search results only)
//!     → error.rs (translate failures to status + {error, details})
//! ```
//!
//! # Design Decisions
//! - Validation never touches the network
//! - Profiles and people searches are forwarded verbatim
//! - Every error body has the same `{error, details?}` shape

pub mod error;
pub mod handlers;
pub mod normalize;
pub mod validate;

pub use error::{ErrorBody, Operation, ProxyError};
pub use normalize::SearchResult;
pub use validate::SearchQuery;
