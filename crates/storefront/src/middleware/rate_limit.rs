//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Provides rate limiters for the two endpoint groups:
//! - `verification_rate_limiter`: Strict limits for code issue/verify (~10/min)
//! - `order_rate_limiter`: Relaxed limits for order submission (~100/min)
//!
//! Rejections are rendered in the same JSON envelope as every other API
//! response.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, Response, StatusCode};
use axum::response::IntoResponse;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::routes::ApiResponse;

/// Shown when a client exceeds its quota.
pub const TOO_MANY_REQUESTS_MESSAGE: &str = "Слишком много запросов. Попробуйте позже.";

/// Shown when the limiter cannot tell who the client is.
pub const LIMITER_FAILURE_MESSAGE: &str = "Внутренняя ошибка сервера";

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Proxy headers carrying the real client IP, most trusted first.
const CLIENT_IP_HEADERS: &[&str] = &[
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// Key extractor that reads the client IP from proxy headers, then falls
/// back to the socket peer address.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        header_ip(req.headers())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// First parseable IP among [`CLIENT_IP_HEADERS`].
///
/// For `X-Forwarded-For` only the first (client) hop is considered.
fn header_ip(headers: &HeaderMap) -> Option<IpAddr> {
    CLIENT_IP_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    })
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

// =============================================================================
// Rejection Responses
// =============================================================================

/// Render a limiter rejection as `{"success": false, "error": ...}`.
fn rate_limit_error(error: GovernorError) -> Response<Body> {
    let (status, message, headers) = match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            tracing::debug!(wait_time, "Rate limit exceeded");
            (StatusCode::TOO_MANY_REQUESTS, TOO_MANY_REQUESTS_MESSAGE, headers)
        }
        GovernorError::UnableToExtractKey => {
            tracing::warn!("Rate limiter could not determine client IP");
            (StatusCode::INTERNAL_SERVER_ERROR, LIMITER_FAILURE_MESSAGE, None)
        }
        GovernorError::Other { code, msg, headers } => {
            tracing::warn!(status = %code, msg = ?msg, "Rate limiter error");
            (code, LIMITER_FAILURE_MESSAGE, headers)
        }
    };

    let mut response = (status, Json(ApiResponse::failure(message))).into_response();
    if let Some(headers) = headers {
        response.headers_mut().extend(headers);
    }
    response
}

/// Create rate limiter for verification endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
/// Each issue request sends a mail, and verification has no attempt cap of
/// its own, so this is what bounds code guessing.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(6)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn verification_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6) // Replenish 1 token every 6 seconds (~10/minute)
        .burst_size(5) // Allow burst of 5 requests
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config)).error_handler(rate_limit_error)
}

/// Create rate limiter for order submission: ~100 requests per minute per IP.
///
/// Configuration: 1 request per second (replenish), burst of 50.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(1)` and `burst_size(50)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn order_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(1)
        .burst_size(50)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(50) is valid");
    GovernorLayer::new(Arc::new(config)).error_handler(rate_limit_error)
}
