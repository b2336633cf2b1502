//! Email verification codes.
//!
//! Per address the lifecycle is `NONE -> PENDING -> CONSUMED | EXPIRED`.
//! Re-issuing while pending replaces the code. Wrong guesses leave the
//! entry pending; only expiry bounds the number of attempts.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::instrument;

use mring_core::{Email, VerificationCode};

use super::email::{EmailError, Mailer};
use super::messages;
use crate::clock::Clock;
use crate::models::VerificationEntry;
use crate::store::{Verdict, VerificationStore};

/// Issuing a code failed after the code was stored.
///
/// The stored entry is not rolled back, so a later retry simply replaces it.
#[derive(Debug, Error)]
pub enum IssueError {
    /// The message could not be rendered or the transport failed.
    #[error("verification email failed: {0}")]
    Delivery(#[from] EmailError),

    /// The transport answered but accepted no recipients.
    #[error("verification email was not accepted by the relay")]
    NotAccepted,
}

/// Why a submitted code was refused.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum VerifyError {
    /// Nothing pending for the address: never issued, consumed, or purged.
    #[error("no pending code")]
    NotFound,

    /// The pending code outlived its TTL and has been discarded.
    #[error("code expired")]
    Expired,

    /// The code does not match; the pending entry is kept.
    #[error("code mismatch")]
    Mismatch,
}

/// Issues and checks one-time codes.
#[derive(Clone)]
pub struct VerificationService {
    store: Arc<dyn VerificationStore>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    shop: String,
}

impl VerificationService {
    #[must_use]
    pub fn new(
        store: Arc<dyn VerificationStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        shop: impl Into<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            clock,
            ttl,
            shop: shop.into(),
        }
    }

    /// Generate a code for `email`, store it, and mail it.
    ///
    /// # Errors
    ///
    /// Returns `IssueError` if the mail could not be delivered. The new code
    /// stays stored either way.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn issue(&self, email: &Email) -> Result<(), IssueError> {
        let code = VerificationCode::generate();
        let message = messages::verification_code(
            &self.shop,
            email.clone(),
            &code,
            self.ttl_minutes(),
        )?;

        self.store.put(VerificationEntry::new(
            email.clone(),
            code,
            self.clock.now(),
        ));

        let delivery = self.mailer.send(message).await?;
        if !delivery.is_accepted() {
            tracing::warn!(
                rejected = ?delivery.rejected,
                "Verification email was not accepted by SMTP server"
            );
            return Err(IssueError::NotAccepted);
        }

        tracing::info!("Verification code sent");
        Ok(())
    }

    /// Check `code` against the pending entry for `email`.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError` describing why the code was refused.
    #[instrument(skip(self, code), fields(email = %email))]
    pub fn verify(&self, email: &Email, code: &str) -> Result<(), VerifyError> {
        let now = self.clock.now();
        let ttl = self.ttl;

        let verdict = self.store.take_if(email, &|entry| {
            if entry.is_expired(now, ttl) {
                Verdict::Expire
            } else if entry.code.matches(code) {
                Verdict::Accept
            } else {
                Verdict::Reject
            }
        });

        match verdict {
            Some(Verdict::Accept) => {
                tracing::info!("Email verified");
                Ok(())
            }
            Some(Verdict::Expire) => Err(VerifyError::Expired),
            Some(Verdict::Reject) => Err(VerifyError::Mismatch),
            None => Err(VerifyError::NotFound),
        }
    }

    /// Drop entries too old to be interesting even as "expired".
    ///
    /// Entries between one and two TTLs old are kept so a late attempt still
    /// learns that its code expired rather than that none exists.
    ///
    /// Skips the purge when the cutoff falls outside the representable range.
    pub fn purge_stale(&self) -> usize {
        let Some(cutoff) = self.stale_cutoff() else {
            tracing::warn!(
                ttl_secs = self.ttl.num_seconds(),
                "Stale code cutoff out of range, skipping purge"
            );
            return 0;
        };
        let purged = self.store.purge_issued_before(cutoff);
        if purged > 0 {
            tracing::debug!(purged, remaining = self.store.len(), "Purged stale verification codes");
        }
        purged
    }

    fn stale_cutoff(&self) -> Option<DateTime<Utc>> {
        self.ttl
            .checked_mul(2)
            .and_then(|age| self.clock.now().checked_sub_signed(age))
    }

    /// Lifetime quoted in the mail, rounded up to whole minutes.
    fn ttl_minutes(&self) -> u64 {
        u64::try_from(self.ttl.num_seconds()).map_or(0, |secs| secs.div_ceil(60))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::clock::ManualClock;
    use crate::services::email::{Delivery, OutgoingEmail};
    use crate::store::MemoryStore;

    /// Records messages and answers with a fixed outcome.
    #[derive(Default)]
    struct FakeMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
        refuse: bool,
    }

    impl FakeMailer {
        fn last_code(&self) -> String {
            let sent = self.sent.lock().unwrap();
            let text = &sent.last().unwrap().text;
            text.split_whitespace()
                .find(|w| w.len() == 6 && w.chars().all(|c| c.is_ascii_digit()))
                .unwrap()
                .to_string()
        }
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        async fn send(&self, email: OutgoingEmail) -> Result<Delivery, EmailError> {
            let delivery = if self.refuse {
                Delivery {
                    accepted: Vec::new(),
                    rejected: vec![email.to.to_string()],
                }
            } else {
                Delivery::all_accepted(&email.to)
            };
            self.sent.lock().unwrap().push(email);
            Ok(delivery)
        }
    }

    struct Harness {
        service: VerificationService,
        mailer: Arc<FakeMailer>,
        clock: Arc<ManualClock>,
        store: Arc<MemoryStore>,
    }

    fn harness(refuse: bool) -> Harness {
        harness_with_ttl(refuse, Duration::minutes(10))
    }

    fn harness_with_ttl(refuse: bool, ttl: Duration) -> Harness {
        let mailer = Arc::new(FakeMailer {
            refuse,
            ..FakeMailer::default()
        });
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new());
        let service = VerificationService::new(
            store.clone(),
            mailer.clone(),
            clock.clone(),
            ttl,
            "MR.ING",
        );
        Harness {
            service,
            mailer,
            clock,
            store,
        }
    }

    fn email() -> Email {
        Email::parse("buyer@example.com").unwrap()
    }

    #[tokio::test]
    async fn test_issue_then_verify_once() {
        let h = harness(false);
        h.service.issue(&email()).await.unwrap();
        let code = h.mailer.last_code();

        assert_eq!(h.service.verify(&email(), &code), Ok(()));
        assert_eq!(
            h.service.verify(&email(), &code),
            Err(VerifyError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_reissue_invalidates_previous_code() {
        let h = harness(false);
        h.service.issue(&email()).await.unwrap();
        let first = h.mailer.last_code();
        h.service.issue(&email()).await.unwrap();
        let second = h.mailer.last_code();

        if first != second {
            assert_eq!(
                h.service.verify(&email(), &first),
                Err(VerifyError::Mismatch)
            );
        }
        assert_eq!(h.service.verify(&email(), &second), Ok(()));
        assert_eq!(h.store.len(), 0);
    }

    #[tokio::test]
    async fn test_wrong_code_keeps_entry() {
        let h = harness(false);
        h.service.issue(&email()).await.unwrap();
        let code = h.mailer.last_code();

        for _ in 0..5 {
            assert_eq!(
                h.service.verify(&email(), "000000"),
                Err(VerifyError::Mismatch)
            );
        }
        assert_eq!(h.service.verify(&email(), &code), Ok(()));
    }

    #[tokio::test]
    async fn test_expired_code_is_removed() {
        let h = harness(false);
        h.service.issue(&email()).await.unwrap();
        let code = h.mailer.last_code();

        h.clock.advance(Duration::minutes(10));
        h.clock.advance(Duration::seconds(1));

        assert_eq!(h.service.verify(&email(), &code), Err(VerifyError::Expired));
        assert_eq!(
            h.service.verify(&email(), &code),
            Err(VerifyError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_code_valid_at_exact_ttl() {
        let h = harness(false);
        h.service.issue(&email()).await.unwrap();
        let code = h.mailer.last_code();

        h.clock.advance(Duration::minutes(10));
        assert_eq!(h.service.verify(&email(), &code), Ok(()));
    }

    #[tokio::test]
    async fn test_refused_delivery_keeps_stored_code() {
        let h = harness(true);
        let result = h.service.issue(&email()).await;

        assert!(matches!(result, Err(IssueError::NotAccepted)));
        assert_eq!(h.store.len(), 1);
    }

    #[test]
    fn test_verify_unknown_email() {
        let h = harness(false);
        assert_eq!(
            h.service.verify(&email(), "123456"),
            Err(VerifyError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_purge_stale_spares_recently_expired() {
        let h = harness(false);
        h.service.issue(&email()).await.unwrap();

        h.clock.advance(Duration::minutes(15));
        assert_eq!(h.service.purge_stale(), 0);
        assert_eq!(h.service.verify(&email(), "x"), Err(VerifyError::Expired));

        h.service.issue(&email()).await.unwrap();
        h.clock.advance(Duration::minutes(21));
        assert_eq!(h.service.purge_stale(), 1);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_purge_skipped_when_cutoff_out_of_range() {
        let h = harness_with_ttl(false, Duration::seconds(9_000_000_000_000));
        h.service.issue(&email()).await.unwrap();

        assert_eq!(h.service.purge_stale(), 0);
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn test_mail_rounds_partial_minutes_up() {
        for (secs, quoted) in [(30, "1 минут"), (90, "2 минут"), (600, "10 минут")] {
            let h = harness_with_ttl(false, Duration::seconds(secs));
            h.service.issue(&email()).await.unwrap();

            let sent = h.mailer.sent.lock().unwrap();
            assert!(
                sent[0].text.contains(&format!("в течение {quoted}")),
                "{secs}s: {}",
                sent[0].text
            );
        }
    }
}
