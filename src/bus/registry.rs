//! Listener Registry
//!
//! Maps registered identifiers (exact keys, wildcard patterns or opaque
//! values) to buckets of listener entries, plus a reverse index from listener
//! id to the key that owns it.
//!
//! Invariants kept by every operation:
//! - a bucket present in the registry is never empty
//! - every listener id in a bucket has exactly one reverse index entry
//! - listener ids are never reused for the lifetime of the registry

use std::collections::{BTreeMap, HashMap};

use log::warn;

use crate::bus::identifier::EventId;
use crate::bus::listener::{Capacity, Listener, ListenerEntry, ListenerId};
use crate::bus::pattern::CompiledPattern;

/// Listener entries filed under one exact registered key
pub struct Bucket<A: ?Sized, R> {
    seq: u64,
    entries: Vec<ListenerEntry<A, R>>,
    oversize_reported: bool,
}

impl<A: ?Sized, R> Bucket<A, R> {
    fn new(seq: u64) -> Self {
        Self {
            seq,
            entries: Vec::new(),
            oversize_reported: false,
        }
    }

    pub fn entries(&self) -> &[ListenerEntry<A, R>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Identifier-keyed listener storage
pub struct Registry<A: ?Sized, R> {
    buckets: HashMap<EventId, Bucket<A, R>>,
    /// Wildcard keys by bucket creation order
    patterns: BTreeMap<u64, (EventId, CompiledPattern)>,
    owners: HashMap<ListenerId, EventId>,
    next_id: ListenerId,
    next_seq: u64,
}

impl<A: ?Sized, R> Registry<A, R> {
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
            patterns: BTreeMap::new(),
            owners: HashMap::new(),
            next_id: 1,
            next_seq: 0,
        }
    }

    /// File a new entry under `identifier` and return its id.
    ///
    /// Performs no validation.
    pub fn insert(
        &mut self,
        identifier: EventId,
        callback: Listener<A, R>,
        capacity: Capacity,
    ) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;

        if !self.buckets.contains_key(&identifier) {
            let seq = self.next_seq;
            self.next_seq += 1;
            if let Some(text) = identifier.as_text().filter(|_| identifier.is_pattern()) {
                match CompiledPattern::compile(text) {
                    Ok(compiled) => {
                        self.patterns.insert(seq, (identifier.clone(), compiled));
                    }
                    Err(e) => warn!("Pattern '{}' kept as exact key only: {}", text, e),
                }
            }
            self.buckets.insert(identifier.clone(), Bucket::new(seq));
        }

        if let Some(bucket) = self.buckets.get_mut(&identifier) {
            bucket.entries.push(ListenerEntry::new(id, callback, capacity));
        }
        self.owners.insert(id, identifier);
        id
    }

    /// Bucket registered under exactly this key
    pub fn exact_lookup(&self, identifier: &EventId) -> Option<&Bucket<A, R>> {
        self.buckets.get(identifier)
    }

    /// Keys of every bucket an emission of `concrete` reaches.
    ///
    /// The exact bucket comes first, then wildcard buckets in creation
    /// order. Opaque identifiers only ever resolve to their exact bucket.
    pub fn pattern_scan(&self, concrete: &EventId) -> Vec<EventId> {
        let mut keys = Vec::new();
        if self.buckets.contains_key(concrete) {
            keys.push(concrete.clone());
        }

        if let Some(text) = concrete.as_text() {
            keys.extend(
                self.patterns
                    .values()
                    .filter(|(key, compiled)| key != concrete && compiled.is_match(text))
                    .map(|(key, _)| key.clone()),
            );
        }
        keys
    }

    /// Remove one entry by id
    pub fn remove_by_id(&mut self, id: ListenerId) -> bool {
        let identifier = match self.owners.remove(&id) {
            Some(identifier) => identifier,
            None => return false,
        };

        let now_empty = match self.buckets.get_mut(&identifier) {
            Some(bucket) => {
                bucket.entries.retain(|entry| entry.id != id);
                bucket.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.drop_bucket(&identifier);
        }
        true
    }

    /// Remove the whole bucket filed under exactly this key
    pub fn remove_by_identifier(&mut self, identifier: &EventId) -> bool {
        match self.drop_bucket(identifier) {
            Some(bucket) => {
                for entry in &bucket.entries {
                    self.owners.remove(&entry.id);
                }
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.patterns.clear();
        self.owners.clear();
    }

    fn drop_bucket(&mut self, identifier: &EventId) -> Option<Bucket<A, R>> {
        let bucket = self.buckets.remove(identifier)?;
        self.patterns.remove(&bucket.seq);
        Some(bucket)
    }

    /// Live entries of a bucket at this moment, in insertion order.
    ///
    /// Entries that already used up their capacity and wait for pruning are
    /// left out.
    pub(crate) fn snapshot(&self, identifier: &EventId) -> Vec<(ListenerId, Listener<A, R>)> {
        self.buckets
            .get(identifier)
            .map(|bucket| {
                bucket
                    .entries
                    .iter()
                    .filter(|entry| !entry.remaining.is_exhausted())
                    .map(|entry| (entry.id, entry.callback.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a bucket holds an entry with capacity left
    pub(crate) fn has_live_entries(&self, identifier: &EventId) -> bool {
        self.buckets.get(identifier).is_some_and(|bucket| {
            bucket
                .entries
                .iter()
                .any(|entry| !entry.remaining.is_exhausted())
        })
    }

    /// Consume one invocation of a listener.
    ///
    /// Returns the remaining capacity, or `None` when the entry is gone or
    /// already exhausted.
    pub(crate) fn claim(&mut self, id: ListenerId) -> Option<Capacity> {
        let identifier = self.owners.get(&id)?;
        let entry = self
            .buckets
            .get_mut(identifier)?
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)?;
        if entry.remaining.is_exhausted() {
            return None;
        }
        Some(entry.remaining.consume())
    }

    /// Remove the given entries if their capacity is used up
    pub(crate) fn prune(&mut self, ids: &[ListenerId]) -> usize {
        let expired: Vec<ListenerId> = ids
            .iter()
            .copied()
            .filter(|id| self.remaining(*id).is_some_and(|capacity| capacity.is_exhausted()))
            .collect();
        let mut removed = 0;
        for id in expired {
            if self.remove_by_id(id) {
                removed += 1;
            }
        }
        removed
    }

    /// Remaining capacity of a live entry
    pub fn remaining(&self, id: ListenerId) -> Option<Capacity> {
        let identifier = self.owners.get(&id)?;
        self.buckets
            .get(identifier)?
            .entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.remaining)
    }

    /// Registered key owning a listener
    pub fn owner(&self, id: ListenerId) -> Option<&EventId> {
        self.owners.get(&id)
    }

    /// Report a bucket growing past `limit` once per bucket
    pub(crate) fn exceeds_limit(&mut self, identifier: &EventId, limit: usize) -> Option<usize> {
        let bucket = self.buckets.get_mut(identifier)?;
        if limit == 0 || bucket.len() <= limit || bucket.oversize_reported {
            return None;
        }
        bucket.oversize_reported = true;
        Some(bucket.len())
    }

    pub fn listener_count(&self, identifier: &EventId) -> usize {
        self.buckets.get(identifier).map(Bucket::len).unwrap_or(0)
    }

    /// Registered keys in bucket creation order
    pub fn identifiers(&self) -> Vec<EventId> {
        let mut keys: Vec<(u64, &EventId)> = self
            .buckets
            .iter()
            .map(|(key, bucket)| (bucket.seq, key))
            .collect();
        keys.sort_by_key(|(seq, _)| *seq);
        keys.into_iter().map(|(_, key)| key.clone()).collect()
    }

    /// Total number of live entries
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

impl<A: ?Sized, R> Default for Registry<A, R> {
    fn default() -> Self {
        Self::new()
    }
}
