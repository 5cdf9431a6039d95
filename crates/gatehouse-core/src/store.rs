//! Counter storage for the fixed-window rate limiter.
//!
//! The evaluator talks to storage through [`CounterStore`] so a shared
//! backend can replace the in-process map without touching the limiter.

use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::traffic::TrafficClass;

/// Requests seen for one key in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateRecord {
    pub count: u64,
    pub reset_at: Instant,
}

impl RateRecord {
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.reset_at
    }
}

/// Counter key: client identity plus traffic class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateKey {
    pub client: String,
    pub class: TrafficClass,
}

impl RateKey {
    pub fn new(client: impl Into<String>, class: TrafficClass) -> Self {
        Self {
            client: client.into(),
            class,
        }
    }
}

/// Storage for rate records.
///
/// `update` must give the closure exclusive access to the slot for `key`
/// for its whole duration; the limiter relies on that for atomic
/// read-modify-write.
pub trait CounterStore: Send + Sync {
    /// Runs `f` on the slot for `key`. `None` means no record exists; if the
    /// slot holds `Some` after `f` returns it is stored, otherwise removed.
    fn update(&self, key: RateKey, f: &mut dyn FnMut(&mut Option<RateRecord>));

    /// Number of stored records, live or expired.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every record whose window ended before `now`. Returns how many
    /// were removed.
    fn sweep_expired(&self, now: Instant) -> usize;
}

/// Process-local store backed by a sharded concurrent map.
///
/// Counters are not shared between processes: with N instances the
/// effective global limit is N times the configured one.
#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<RateKey, RateRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the record for `key`, if any.
    pub fn get(&self, key: &RateKey) -> Option<RateRecord> {
        self.records.get(key).map(|r| *r.value())
    }
}

impl CounterStore for MemoryStore {
    fn update(&self, key: RateKey, f: &mut dyn FnMut(&mut Option<RateRecord>)) {
        match self.records.entry(key) {
            Entry::Occupied(mut occupied) => {
                let mut slot = Some(*occupied.get());
                f(&mut slot);
                match slot {
                    Some(record) => *occupied.get_mut() = record,
                    None => {
                        occupied.remove();
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let mut slot = None;
                f(&mut slot);
                if let Some(record) = slot {
                    vacant.insert(record);
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn sweep_expired(&self, now: Instant) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now));
        before.saturating_sub(self.records.len())
    }
}
