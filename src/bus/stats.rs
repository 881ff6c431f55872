//! Bus Statistics

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Snapshot of bus activity counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStats {
    /// Listeners added through `on`/`once`
    pub registrations: u64,

    /// Listeners removed explicitly or by expiry
    pub removals: u64,

    /// Calls to `emit` that passed validation
    pub emissions: u64,

    /// Emissions that reached no listener
    pub unmatched: u64,

    /// Listener invocations that returned successfully
    pub deliveries: u64,

    /// Listener invocations that returned an error
    pub listener_failures: u64,
}

/// Lock-free counters behind [`BusStats`]
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    registrations: AtomicU64,
    removals: AtomicU64,
    emissions: AtomicU64,
    unmatched: AtomicU64,
    deliveries: AtomicU64,
    listener_failures: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn registered(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn removed(&self, count: usize) {
        self.removals.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn emitted(&self) {
        self.emissions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn unmatched(&self) {
        self.unmatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn delivered(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.listener_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BusStats {
        BusStats {
            registrations: self.registrations.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            emissions: self.emissions.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        for counter in [
            &self.registrations,
            &self.removals,
            &self.emissions,
            &self.unmatched,
            &self.deliveries,
            &self.listener_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
