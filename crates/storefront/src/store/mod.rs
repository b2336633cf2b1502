//! Storage for pending verification codes.
//!
//! The store is deliberately narrow: insert-or-replace, and an atomic
//! look-up-judge-delete. Services never read an entry without deciding its
//! fate under the same lock, so two concurrent verifications of one code
//! cannot both succeed.

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};

use mring_core::Email;

use crate::models::VerificationEntry;

/// What [`VerificationStore::take_if`] should do with the entry it found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The submitted code is correct; consume the entry.
    Accept,
    /// The entry is too old; delete it.
    Expire,
    /// The submitted code is wrong; keep the entry for another attempt.
    Reject,
}

impl Verdict {
    /// Whether the entry is removed after this verdict.
    #[must_use]
    pub const fn consumes(self) -> bool {
        matches!(self, Self::Accept | Self::Expire)
    }
}

/// Keyed, single-writer-wins store of pending codes.
pub trait VerificationStore: Send + Sync {
    /// Insert `entry`, replacing any pending entry for the same email.
    fn put(&self, entry: VerificationEntry);

    /// Judge the entry for `email` and delete it if the verdict consumes it.
    ///
    /// Returns `None` when no entry exists.
    fn take_if(
        &self,
        email: &Email,
        judge: &dyn Fn(&VerificationEntry) -> Verdict,
    ) -> Option<Verdict>;

    /// Drop every entry issued before `cutoff`, returning how many went.
    fn purge_issued_before(&self, cutoff: DateTime<Utc>) -> usize;

    /// Number of pending entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
