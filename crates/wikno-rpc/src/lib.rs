//! Wikno RPC: the JSON-over-HTTP surface shared by both services.
//!
//! - [`status`]: error kind to HTTP status mapping and body extractors
//! - [`layers`]: request id, tracing span and request metrics
//! - [`client`]: outbound calls to a sibling service
//! - [`liveness`]: the unauthenticated health endpoint
//! - [`server`]: listener binding and graceful shutdown

pub mod client;
pub mod layers;
pub mod liveness;
pub mod server;
pub mod status;

pub use client::{CallOptions, RpcClient};
pub use layers::{apply_common_layers, current_request_id};
pub use server::{serve, shutdown_signal, ServerConfig};
pub use status::{ApiError, ApiJson, ApiQuery, ApiResult};

/// Header carrying the bearer token.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Header carrying the request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
