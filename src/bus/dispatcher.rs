//! Emission Protocol
//!
//! Resolves the buckets an emitted identifier reaches, invokes their
//! listeners in order and retires listeners whose capacity ran out.
//!
//! The registry lock is only held to resolve, snapshot, claim and prune,
//! never while a listener runs, so listeners may call back into the bus.
//! Each bucket is snapshotted when its turn comes: entries added meanwhile
//! wait for the next emission, entries removed meanwhile are skipped.
//!
//! A listener error aborts the emission. Capacity already consumed stays
//! consumed and exhausted entries are still pruned.

use std::collections::HashMap;
use std::ops::Index;

use log::{debug, trace};
use parking_lot::Mutex;

use crate::bus::error::{BusError, BusResult};
use crate::bus::identifier::EventId;
use crate::bus::listener::{Capacity, ListenerId};
use crate::bus::pattern::validate_for_emission;
use crate::bus::registry::Registry;
use crate::bus::stats::StatsCounters;

/// Outcome of one listener call
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation<R> {
    /// Value returned by the listener
    pub result: R,

    /// Key the listener was registered under (possibly a pattern)
    pub identifier: EventId,

    /// Capacity left after this call
    pub rest: Capacity,
}

/// Per-listener records of a delivered emission
#[derive(Debug, Clone, PartialEq)]
pub struct EmitResult<R> {
    ids: Vec<ListenerId>,
    records: HashMap<ListenerId, Invocation<R>>,
}

impl<R> EmitResult<R> {
    fn new() -> Self {
        Self {
            ids: Vec::new(),
            records: HashMap::new(),
        }
    }

    fn record(&mut self, id: ListenerId, invocation: Invocation<R>) {
        self.ids.push(id);
        self.records.insert(id, invocation);
    }

    /// Invoked listener ids in invocation order
    pub fn ids(&self) -> &[ListenerId] {
        &self.ids
    }

    pub fn get(&self, id: ListenerId) -> Option<&Invocation<R>> {
        self.records.get(&id)
    }

    /// Records in invocation order
    pub fn iter(&self) -> impl Iterator<Item = (ListenerId, &Invocation<R>)> + '_ {
        self.ids
            .iter()
            .filter_map(move |id| self.records.get(id).map(|invocation| (*id, invocation)))
    }

    /// Listener return values in invocation order
    pub fn results(&self) -> impl Iterator<Item = &R> + '_ {
        self.iter().map(|(_, invocation)| &invocation.result)
    }

    pub fn into_results(mut self) -> Vec<R> {
        self.ids
            .iter()
            .filter_map(|id| self.records.remove(id))
            .map(|invocation| invocation.result)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<R> Index<ListenerId> for EmitResult<R> {
    type Output = Invocation<R>;

    fn index(&self, id: ListenerId) -> &Self::Output {
        &self.records[&id]
    }
}

/// Prunes exhausted listeners when dropped, whichever way the emission ends
struct PendingPrune<'a, A: ?Sized, R> {
    registry: &'a Mutex<Registry<A, R>>,
    stats: &'a StatsCounters,
    expired: Vec<ListenerId>,
    trace: bool,
}

impl<A: ?Sized, R> Drop for PendingPrune<'_, A, R> {
    fn drop(&mut self) {
        if self.expired.is_empty() {
            return;
        }
        let pruned = self.registry.lock().prune(&self.expired);
        self.stats.removed(pruned);
        if self.trace && pruned > 0 {
            debug!("Pruned {} expired listener(s): {:?}", pruned, self.expired);
        }
    }
}

/// Runs emissions against a shared registry
pub(crate) struct Dispatcher<'a, A: ?Sized, R> {
    registry: &'a Mutex<Registry<A, R>>,
    stats: &'a StatsCounters,
    trace: bool,
}

impl<'a, A: ?Sized, R> Dispatcher<'a, A, R> {
    pub(crate) fn new(
        registry: &'a Mutex<Registry<A, R>>,
        stats: &'a StatsCounters,
        trace: bool,
    ) -> Self {
        Self {
            registry,
            stats,
            trace,
        }
    }

    /// Emit `identifier` with `args`.
    ///
    /// Returns `Ok(None)` when no listener was reached.
    pub(crate) fn emit(&self, identifier: &EventId, args: &A) -> BusResult<Option<EmitResult<R>>> {
        validate_for_emission(identifier)?;
        self.stats.emitted();

        let keys = self.registry.lock().pattern_scan(identifier);
        if self.trace {
            trace!("Emitting '{}' to {} bucket(s): {:?}", identifier, keys.len(), keys);
        }

        let mut result = EmitResult::new();
        if !keys.is_empty() {
            let mut pending = PendingPrune {
                registry: self.registry,
                stats: self.stats,
                expired: Vec::new(),
                trace: self.trace,
            };
            for key in &keys {
                self.invoke_bucket(key, args, &mut result, &mut pending.expired)?;
            }
        }

        if result.is_empty() {
            self.stats.unmatched();
            if self.trace {
                debug!("No listener matched '{}'", identifier);
            }
            return Ok(None);
        }

        if self.trace {
            debug!("Emitted '{}' to listener(s) {:?}", identifier, result.ids());
        }
        Ok(Some(result))
    }

    fn invoke_bucket(
        &self,
        key: &EventId,
        args: &A,
        result: &mut EmitResult<R>,
        expired: &mut Vec<ListenerId>,
    ) -> BusResult<()> {
        let snapshot = self.registry.lock().snapshot(key);

        for (id, callback) in snapshot {
            let claimed = self.registry.lock().claim(id);
            let rest = match claimed {
                Some(rest) => rest,
                None => continue,
            };
            if rest.is_exhausted() {
                expired.push(id);
            }

            match callback(args) {
                Ok(value) => {
                    self.stats.delivered();
                    result.record(
                        id,
                        Invocation {
                            result: value,
                            identifier: key.clone(),
                            rest,
                        },
                    );
                }
                Err(source) => {
                    self.stats.failed();
                    if self.trace {
                        debug!("Listener {} under '{}' failed: {}", id, key, source);
                    }
                    return Err(BusError::listener_failed(id, key.clone(), source));
                }
            }
        }
        Ok(())
    }
}
