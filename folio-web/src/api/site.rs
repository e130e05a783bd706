//! Site-wide routes: favicon, 404 fallback, redirect helper

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// 302 Found to `location`
///
/// An invalid header value turns into a 500 rather than a panic.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// GET /favicon.ico
pub async fn favicon() -> Response {
    found("/static/graphics/favicon.ico")
}

/// Fallback for unknown routes
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 not found.")
}
