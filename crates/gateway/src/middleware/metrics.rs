//! Per-request metrics

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use yamdb_common::metrics::RequestMetrics;

/// Record count and latency per method and route template.
///
/// Mounted with `route_layer`, so unmatched paths never reach it and
/// label cardinality stays bounded by the route table.
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let timer = RequestMetrics::start(request.method().as_str(), &route);
    let response = next.run(request).await;
    timer.finish(response.status().as_u16());

    response
}
