//! MR.ING Core - Shared types library.
//!
//! This crate provides the domain types used by the storefront service:
//! validated email addresses and one-time verification codes.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage, no transports.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for emails and verification codes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
