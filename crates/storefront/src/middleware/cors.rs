//! Cross-origin access for the storefront frontend.
//!
//! The frontend is served from a different origin than the API, so every
//! origin is allowed. No credentials are involved.

use axum::http::{Method, header::CONTENT_TYPE};
use tower_http::cors::{Any, CorsLayer};

/// `Access-Control-Allow-Origin: *` for `GET`, `POST` and `OPTIONS` with a
/// `Content-Type` request header.
#[must_use]
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}
