//! HTTP module
//!
//! The `Transport` trait is the only thing the query planner needs from the
//! network. `HttpClient` implements it on top of reqwest.
//!
//! # Features
//!
//! - **Status mapping**: non-2xx responses become `Error::Request { status, url }`
//! - **Rate Limiting**: optional token bucket rate limiter using governor
//! - **Endpoint override**: `base_url` redirects requests to a mirror or test server
//!
//! There are no retries: a failed request aborts the operation that issued it.

mod client;
mod rate_limit;

pub use client::{
    records_from_body, HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig,
    Transport,
};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
