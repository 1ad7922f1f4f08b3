//! Hint-tier escalation over a bounded wrong-answer streak table
//!
//! Every (learner, concept) pair that answered wrong at least once holds a
//! consecutive-wrong counter. Two wrong answers in a row earn a hint, three
//! reveal the answer and reset the streak. A correct answer clears it.
//!
//! The table is bounded. Eviction order is first-insertion order: bumping an
//! existing counter never refreshes its position, so this is deliberately not
//! an LRU even though it is stored in an [`LruCache`] (only `peek*` accessors
//! are used on existing keys, which leave the recency list untouched).

use crate::types::{ReplyTier, StreakKey};
use lru::LruCache;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Streak length that earns a hint
pub const HINT_THRESHOLD: u32 = 2;

/// Streak length that reveals the answer and resets the streak
pub const ANSWER_THRESHOLD: u32 = 3;

/// Insertion-ordered map from streak key to a positive wrong-answer count
pub struct StreakTable {
    entries: LruCache<StreakKey, u32>,
    capacity: usize,
}

impl StreakTable {
    /// Create an empty table holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity,
        }
    }

    /// Count one more wrong answer for `key`, returning the new streak
    ///
    /// A brand-new key takes the newest eviction position; an existing key
    /// keeps the position it was first inserted at.
    pub fn record_wrong(&mut self, key: StreakKey) -> u32 {
        if let Some(count) = self.entries.peek_mut(&key) {
            *count += 1;
            return *count;
        }
        self.entries.put(key, 1);
        1
    }

    /// Drop the streak for `key`, returning the count it had
    pub fn clear(&mut self, key: &StreakKey) -> Option<u32> {
        self.entries.pop(key)
    }

    /// Evict the oldest-inserted entry if the table is over capacity
    ///
    /// Removes at most one entry per call.
    pub fn evict_overflow(&mut self) -> Option<(StreakKey, u32)> {
        if self.entries.len() > self.capacity {
            self.entries.pop_lru()
        } else {
            None
        }
    }

    /// Current streak for `key`, without touching eviction order
    pub fn get(&self, key: &StreakKey) -> Option<u32> {
        self.entries.peek(key).copied()
    }

    pub fn contains(&self, key: &StreakKey) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys in eviction order, oldest first
    pub fn keys_oldest_first(&self) -> Vec<StreakKey> {
        self.entries.iter().rev().map(|(key, _)| *key).collect()
    }
}

/// Turns correctness verdicts into reply tiers
///
/// One instance per process, shared behind an `Arc`. Every read-modify-write
/// on the table happens under a single mutex, so concurrent turns for the
/// same key are serialized.
pub struct HintTierController {
    table: Mutex<StreakTable>,
}

impl HintTierController {
    pub fn new(max_entries: usize) -> Self {
        Self {
            table: Mutex::new(StreakTable::new(max_entries)),
        }
    }

    /// Advance the streak for `key` with one verdict and pick the reply tier
    pub fn advance(&self, key: StreakKey, correct: bool) -> ReplyTier {
        let mut table = self.lock();

        if correct {
            table.clear(&key);
            return ReplyTier::Normal;
        }

        let count = table.record_wrong(key);
        let tier = if count == HINT_THRESHOLD {
            ReplyTier::Hint
        } else if count >= ANSWER_THRESHOLD {
            // Answer revealed; the next wrong answer starts a fresh streak
            table.clear(&key);
            ReplyTier::Answer
        } else {
            ReplyTier::Normal
        };

        if let Some((evicted, streak)) = table.evict_overflow() {
            debug!("Evicted streak {} (count {}) at capacity {}", evicted, streak, table.capacity());
        }

        debug!("Streak {} -> {} after wrong answer ({})", key, count, tier);
        tier
    }

    /// Current streak for `key`
    pub fn streak(&self, key: &StreakKey) -> Option<u32> {
        self.lock().get(key)
    }

    /// Number of tracked streaks
    pub fn tracked(&self) -> usize {
        self.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// Tracked keys, oldest first
    pub fn snapshot(&self) -> Vec<StreakKey> {
        self.lock().keys_oldest_first()
    }

    // The table holds plain counters, so a panic elsewhere cannot leave it
    // structurally broken; keep serving rather than propagate the poison.
    fn lock(&self) -> MutexGuard<'_, StreakTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
