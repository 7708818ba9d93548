//! HTTP middleware.

pub mod rate_limit;
pub mod request_id;

pub use rate_limit::{RateLimitResult, RateLimiter, rate_limit_middleware};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
