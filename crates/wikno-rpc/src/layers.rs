//! Cross-cutting request layers.
//!
//! Order, outermost first: set request id, propagate it to the response,
//! trace span, request metrics. Authorization is installed by the graph
//! service as a `route_layer` on its protected routes, so it always runs
//! inside these and rejected calls are still counted and traced.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::HeaderName;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use metrics::{counter, gauge, histogram};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::REQUEST_ID_HEADER;

pub const REQUESTS_TOTAL: &str = "wikno_rpc_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "wikno_rpc_request_duration_seconds";
pub const REQUESTS_IN_FLIGHT: &str = "wikno_rpc_requests_in_flight";

// Request id of the call being handled on this task. Outbound RPCs read it
// so the downstream service logs under the same id.
tokio::task_local! {
    static CURRENT_REQUEST_ID: String;
}

/// The request id of the call currently being handled, if any.
pub fn current_request_id() -> Option<String> {
    CURRENT_REQUEST_ID.try_with(|id| id.clone()).ok()
}

/// Wrap a service router with the common layers.
pub fn apply_common_layers(router: Router) -> Router {
    let header = HeaderName::from_static(REQUEST_ID_HEADER);

    router
        .layer(middleware::from_fn(track_metrics))
        .layer(TraceLayer::new_for_http().make_span_with(make_span))
        .layer(middleware::from_fn(scope_request_id))
        .layer(PropagateRequestIdLayer::new(header.clone()))
        .layer(SetRequestIdLayer::new(header, MakeRequestUuid))
}

fn make_span(req: &Request) -> Span {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("n/a");

    tracing::info_span!(
        "rpc",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = %request_id,
    )
}

async fn scope_request_id(req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    match request_id {
        Some(id) => CURRENT_REQUEST_ID.scope(id, next.run(req)).await,
        None => next.run(req).await,
    }
}

/// Count, time and gauge every call, including rejected ones.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = format!("{} {}", req.method(), route);
    let start = Instant::now();

    gauge!(REQUESTS_IN_FLIGHT, "method" => method.clone()).increment(1.0);
    let response = next.run(req).await;
    gauge!(REQUESTS_IN_FLIGHT, "method" => method.clone()).decrement(1.0);

    counter!(
        REQUESTS_TOTAL,
        "method" => method.clone(),
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "method" => method).record(start.elapsed().as_secs_f64());

    response
}
