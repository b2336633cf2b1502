//! Core types for the storefront.

pub mod code;
pub mod email;

pub use code::{CodeError, VerificationCode};
pub use email::{Email, EmailError};
