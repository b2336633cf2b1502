//! Domain models for storefront.

pub mod order;
pub mod verification;

pub use order::{DEFAULT_ORDER_DETAILS, MissingField, Order, OrderRequest};
pub use verification::VerificationEntry;
