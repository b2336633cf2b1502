//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. CORS (answers preflights before anything else runs)
//! 3. `TraceLayer` (request span)
//! 4. Request ID (recorded on the span, echoed on the response)
//! 5. API headers (nosniff, no-store)
//! 6. Rate limiting (governor, per route group)

pub mod api_headers;
pub mod cors;
pub mod rate_limit;
pub mod request_id;

pub use api_headers::api_headers_middleware;
pub use cors::cors_layer;
pub use rate_limit::{order_rate_limiter, verification_rate_limiter};
pub use request_id::request_id_middleware;
