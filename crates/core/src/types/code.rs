//! One-time verification code type.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`VerificationCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// The number is outside 100000..=999999.
    #[error("verification code must be between {min} and {max}")]
    OutOfRange {
        /// Smallest valid code.
        min: u32,
        /// Largest valid code.
        max: u32,
    },
}

/// A six-digit numeric code mailed to prove control of an address.
///
/// Codes never start with a zero, so the decimal form is always six
/// characters long.
///
/// ```
/// use mring_core::VerificationCode;
///
/// let code = VerificationCode::generate();
/// assert_eq!(code.as_str().len(), 6);
/// assert!(code.matches(code.as_str()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Smallest code that can be issued.
    pub const MIN: u32 = 100_000;
    /// Largest code that can be issued.
    pub const MAX: u32 = 999_999;

    /// Draw a code uniformly from [`Self::MIN`]..=[`Self::MAX`].
    #[must_use]
    pub fn generate() -> Self {
        let n: u32 = rand::rng().random_range(Self::MIN..=Self::MAX);
        Self(n.to_string())
    }

    /// Build a code from a known number.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::OutOfRange`] unless `n` has exactly six digits.
    pub fn from_number(n: u32) -> Result<Self, CodeError> {
        if !(Self::MIN..=Self::MAX).contains(&n) {
            return Err(CodeError::OutOfRange {
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(n.to_string()))
    }

    /// Exact string comparison against a submitted code.
    #[must_use]
    pub fn matches(&self, submitted: &str) -> bool {
        self.0 == submitted
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_format() {
        let code = VerificationCode::generate();
        assert_eq!(code.as_str().len(), 6);
        assert!(code.as_str().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_range() {
        for _ in 0..100 {
            let n: u32 = VerificationCode::generate().as_str().parse().unwrap();
            assert!((VerificationCode::MIN..=VerificationCode::MAX).contains(&n));
        }
    }

    #[test]
    fn test_from_number_bounds() {
        assert!(VerificationCode::from_number(100_000).is_ok());
        assert!(VerificationCode::from_number(999_999).is_ok());
        assert!(VerificationCode::from_number(99_999).is_err());
        assert!(VerificationCode::from_number(1_000_000).is_err());
    }

    #[test]
    fn test_matches_is_exact() {
        let code = VerificationCode::from_number(123_456).unwrap();
        assert!(code.matches("123456"));
        assert!(!code.matches(" 123456"));
        assert!(!code.matches("123457"));
        assert!(!code.matches(""));
    }
}
