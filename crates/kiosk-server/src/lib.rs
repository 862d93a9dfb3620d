//! # Kiosk Server
//!
//! HTTP server for the Kiosk service: a fixed middleware pipeline in front
//! of a handful of REST endpoints, plus one outbound call to a completion
//! API.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod files;
pub mod handlers;
pub mod logbook;
pub mod middleware;
pub mod ratelimit;
pub mod server;
pub mod session;
pub mod upstream;

pub use error::ApiError;
pub use ratelimit::{RateLimitConfig, RateLimiter};
pub use server::{router, AppState, Server, ServerConfig};
pub use session::SessionStore;
pub use upstream::{CompletionClient, UpstreamConfig};
