//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//!
//! # Email verification
//! POST /api/send-verification      - Mail a one-time code
//! GET  /api/send-verification      - Liveness probe
//! POST /api/verify-email           - Check a code
//! GET  /api/verify-email           - Liveness probe
//!
//! # Checkout
//! POST /api/submit-order           - Notify owner and buyer about an order
//! ```
//!
//! Every API route also answers `OPTIONS` with 200 and any other method with
//! a JSON 405.

pub mod orders;
pub mod verification;

use axum::{
    Router,
    http::StatusCode,
    routing::{MethodRouter, post},
};
use serde::{Deserialize, Serialize};

use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::middleware::{order_rate_limiter, verification_rate_limiter};
use crate::state::AppState;

/// JSON envelope shared by every API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// CORS preflight answer. Headers are added by the CORS layer.
async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Attach the shared `OPTIONS` and 405 handling to an endpoint.
fn api_endpoint(router: MethodRouter<AppState>) -> MethodRouter<AppState> {
    router.options(preflight).fallback(method_not_allowed)
}

/// Create the email verification routes router.
pub fn verification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/send-verification",
            api_endpoint(post(verification::send_code).get(verification::send_code_alive)),
        )
        .route(
            "/verify-email",
            api_endpoint(post(verification::verify_code).get(verification::verify_code_alive)),
        )
}

/// Create the checkout routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new().route("/submit-order", api_endpoint(post(orders::submit)))
}

/// Create all API routes for the storefront.
///
/// Rate limiters wrap the routes only when enabled in `config`.
pub fn routes(config: &StorefrontConfig) -> Router<AppState> {
    let mut verification = verification_routes();
    let mut orders = order_routes();

    if config.rate_limit_enabled {
        verification = verification.layer(verification_rate_limiter());
        orders = orders.layer(order_rate_limiter());
    }

    Router::new().nest("/api", verification.merge(orders))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_shape() {
        let ok = serde_json::to_value(ApiResponse::success("done")).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "message": "done"}));

        let err = serde_json::to_value(ApiResponse::failure("nope")).unwrap();
        assert_eq!(err, serde_json::json!({"success": false, "error": "nope"}));
    }
}
