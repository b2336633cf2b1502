//! Process-local store. Everything is lost on restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use mring_core::Email;

use super::{Verdict, VerificationStore};
use crate::models::VerificationEntry;

/// `HashMap` behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<Email, VerificationEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Email, VerificationEntry>> {
        // Entries stay consistent even if a holder panicked: every critical
        // section is a single map operation.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VerificationStore for MemoryStore {
    fn put(&self, entry: VerificationEntry) {
        self.lock().insert(entry.email.clone(), entry);
    }

    fn take_if(
        &self,
        email: &Email,
        judge: &dyn Fn(&VerificationEntry) -> Verdict,
    ) -> Option<Verdict> {
        let mut entries = self.lock();
        let verdict = judge(entries.get(email)?);
        if verdict.consumes() {
            entries.remove(email);
        }
        Some(verdict)
    }

    fn purge_issued_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.issued_at >= cutoff);
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}
