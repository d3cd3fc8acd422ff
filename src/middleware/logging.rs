use axum::{
    extract::{ConnectInfo, MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use uuid::Uuid;

/// Label attached to the completion log line for each status class.
fn outcome(status: StatusCode) -> &'static str {
    match status.as_u16() {
        200..=299 => "request completed",
        300..=399 => "request completed (redirect)",
        400..=499 => "request completed (client error)",
        500..=599 => "request completed (server error)",
        _ => "request completed (unknown status)",
    }
}

/// Request logging middleware that adds structured logging for all HTTP requests
pub async fn request_logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let uri = req.uri().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_owned())
        .unwrap_or_else(|| "unknown".to_owned());
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        uri = %uri,
        remote_addr = %remote_addr,
        "incoming request"
    );

    let response = next.run(req).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis();
    let message = outcome(status);

    if status.is_server_error() {
        tracing::error!(request_id = %request_id, method = %method, path = %path, status = status.as_u16(), duration_ms = %duration_ms, "{}", message);
    } else if status.is_client_error() {
        tracing::warn!(request_id = %request_id, method = %method, path = %path, status = status.as_u16(), duration_ms = %duration_ms, "{}", message);
    } else {
        tracing::info!(request_id = %request_id, method = %method, path = %path, status = status.as_u16(), duration_ms = %duration_ms, "{}", message);
    }

    response
}
