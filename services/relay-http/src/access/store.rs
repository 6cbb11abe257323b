use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use super::{AccessDecision, AllowListEntry};

/// Process-lifetime allow-list plus the cache of recent access decisions.
///
/// Every allow-list write bumps `generation`; a decision computed before a
/// write is discarded instead of cached, so an admin update can never be
/// shadowed by a check that was already in flight.
#[derive(Default)]
pub struct AccessStore {
    entries: DashMap<i64, AllowListEntry>,
    decisions: DashMap<i64, AccessDecision>,
    generation: AtomicU64,
}

impl AccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = AllowListEntry>) -> Self {
        let store = Self::new();
        for entry in entries {
            store.entries.insert(entry.identity_id, entry);
        }
        store
    }

    pub fn entry(&self, identity_id: i64) -> Option<AllowListEntry> {
        self.entries.get(&identity_id).map(|entry| entry.clone())
    }

    /// All entries ordered by identity.
    pub fn entries(&self) -> Vec<AllowListEntry> {
        let mut entries: Vec<AllowListEntry> =
            self.entries.iter().map(|entry| entry.value().clone()).collect();
        entries.sort_by_key(|entry| entry.identity_id);
        entries
    }

    /// Insert or overwrite an entry and drop any cached decision for it.
    pub fn upsert(&self, entry: AllowListEntry) -> Option<AllowListEntry> {
        let identity_id = entry.identity_id;
        let previous = self.entries.insert(identity_id, entry);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.decisions.remove(&identity_id);
        previous
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn fresh_decision(
        &self,
        identity_id: i64,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<AccessDecision> {
        let decision = self.decisions.get(&identity_id)?;
        decision.is_fresh(now, ttl).then(|| decision.clone())
    }

    /// Cache a decision computed while the store was at `generation`.
    /// Returns false if the allow-list changed in the meantime.
    pub fn remember(&self, decision: AccessDecision, generation: u64) -> bool {
        if self.generation() != generation {
            return false;
        }

        let identity_id = decision.identity_id;
        self.decisions.insert(identity_id, decision);

        // An upsert that bumped the generation after the first check may
        // already have run its removal; undo the insert in that case.
        if self.generation() != generation {
            self.decisions.remove(&identity_id);
            return false;
        }
        true
    }

    pub fn invalidate(&self, identity_id: i64) {
        self.decisions.remove(&identity_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
