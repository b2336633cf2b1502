//! Business logic services for storefront.
//!
//! # Services
//!
//! - `email` - Outbound mail transport (SMTP or log-only)
//! - `messages` - Rendered verification and order mails
//! - `verification` - One-time email verification codes
//! - `orders` - Order notifications to the owner and the buyer

pub mod email;
pub mod messages;
pub mod orders;
pub mod verification;

pub use email::{Delivery, EmailError, LogMailer, Mailer, OutgoingEmail, SmtpMailer};
pub use orders::{OrderError, OrderReceipt, OrderService};
pub use verification::{IssueError, VerificationService, VerifyError};
