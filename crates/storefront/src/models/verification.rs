//! Pending email verification.

use chrono::{DateTime, Duration, Utc};

use mring_core::{Email, VerificationCode};

/// A code that has been mailed and not yet consumed.
///
/// At most one entry exists per email; issuing again replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationEntry {
    /// Address the code was sent to.
    pub email: Email,
    /// The code the user has to echo back.
    pub code: VerificationCode,
    /// When the code was generated.
    pub issued_at: DateTime<Utc>,
}

impl VerificationEntry {
    #[must_use]
    pub const fn new(email: Email, code: VerificationCode, issued_at: DateTime<Utc>) -> Self {
        Self {
            email,
            code,
            issued_at,
        }
    }

    /// An entry is expired once its age is strictly greater than `ttl`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.issued_at > ttl
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let issued_at = Utc::now();
        let entry = VerificationEntry::new(
            Email::parse("buyer@example.com").unwrap(),
            VerificationCode::from_number(123_456).unwrap(),
            issued_at,
        );
        let ttl = Duration::minutes(10);

        assert!(!entry.is_expired(issued_at, ttl));
        assert!(!entry.is_expired(issued_at + ttl, ttl));
        assert!(entry.is_expired(issued_at + ttl + Duration::milliseconds(1), ttl));
    }
}
