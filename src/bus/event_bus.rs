//! Event Bus Facade
//!
//! Public entry point: validates arguments and delegates to the registry and
//! the dispatcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde_json::Value;

use crate::bus::dispatcher::{Dispatcher, EmitResult};
use crate::bus::error::BusResult;
use crate::bus::identifier::EventId;
use crate::bus::listener::{Capacity, Listener, ListenerId};
use crate::bus::pattern::{validate_for_emission, validate_for_registration};
use crate::bus::registry::Registry;
use crate::bus::stats::{BusStats, StatsCounters};
use crate::config::BusConfig;

/// In-process publish/subscribe dispatcher.
///
/// `A` is the argument type handed to listeners by reference and `R` the
/// value each listener returns. The defaults suit dynamically shaped
/// payloads: listeners receive a slice of JSON values and return one.
///
/// All methods take `&self`; listeners may register, remove and emit on the
/// bus they are called from.
pub struct EventBus<A: ?Sized = [Value], R = Value> {
    registry: Mutex<Registry<A, R>>,
    stats: StatsCounters,
    trace: AtomicBool,
    max_listeners: Option<usize>,
}

impl<A: ?Sized, R> EventBus<A, R> {
    /// Create a new event bus with default configuration
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create an event bus with custom configuration
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
            stats: StatsCounters::default(),
            trace: AtomicBool::new(config.trace),
            max_listeners: config.max_listeners,
        }
    }

    /// Subscribe `callback` to `identifier` without an invocation limit
    pub fn on<I, F>(&self, identifier: I, callback: F) -> BusResult<ListenerId>
    where
        I: Into<EventId>,
        F: Fn(&A) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        let identifier = identifier.into();
        validate_for_registration(&identifier)?;
        Ok(self.register(identifier, Arc::new(callback), Capacity::Unbounded))
    }

    /// Subscribe `callback` for at most `capacity` invocations.
    ///
    /// A capacity of zero is rejected.
    pub fn on_with_capacity<I, F>(
        &self,
        identifier: I,
        capacity: u32,
        callback: F,
    ) -> BusResult<ListenerId>
    where
        I: Into<EventId>,
        F: Fn(&A) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        let identifier = identifier.into();
        validate_for_registration(&identifier)?;
        let capacity = Capacity::limited(capacity)?;
        Ok(self.register(identifier, Arc::new(callback), capacity))
    }

    /// Subscribe `callback` for a single invocation
    pub fn once<I, F>(&self, identifier: I, callback: F) -> BusResult<ListenerId>
    where
        I: Into<EventId>,
        F: Fn(&A) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        let identifier = identifier.into();
        validate_for_registration(&identifier)?;
        Ok(self.register(identifier, Arc::new(callback), Capacity::Remaining(1)))
    }

    /// File an already validated registration
    fn register(
        &self,
        identifier: EventId,
        callback: Listener<A, R>,
        capacity: Capacity,
    ) -> ListenerId {
        let (id, oversize) = {
            let mut registry = self.registry.lock();
            let id = registry.insert(identifier.clone(), callback, capacity);
            let oversize = self
                .max_listeners
                .and_then(|limit| registry.exceeds_limit(&identifier, limit));
            (id, oversize)
        };
        self.stats.registered();

        if let Some(count) = oversize {
            warn!(
                "{} listeners registered under '{}'; possible listener leak",
                count, identifier
            );
        }
        if self.is_tracing() {
            debug!("Registered listener {} on '{}' ({})", id, identifier, capacity);
        }
        id
    }

    /// Remove every listener registered under exactly `identifier`.
    ///
    /// Patterns are not expanded: `off("evt.a")` leaves `evt.*` alone.
    pub fn off<I: Into<EventId>>(&self, identifier: I) -> bool {
        let identifier = identifier.into();
        let removed = {
            let mut registry = self.registry.lock();
            let count = registry.listener_count(&identifier);
            registry.remove_by_identifier(&identifier).then_some(count)
        };

        match removed {
            Some(count) => {
                self.stats.removed(count);
                if self.is_tracing() {
                    debug!("Removed {} listener(s) registered on '{}'", count, identifier);
                }
                true
            }
            None => false,
        }
    }

    /// Remove a single listener by id
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let removed = self.registry.lock().remove_by_id(id);
        if removed {
            self.stats.removed(1);
            if self.is_tracing() {
                debug!("Removed listener {}", id);
            }
        }
        removed
    }

    /// Emit `identifier`, invoking every matching listener with `args`.
    ///
    /// Returns `Ok(None)` when nothing matched. Listeners run synchronously
    /// on the calling thread; the first listener error aborts the emission.
    pub fn emit<I: Into<EventId>>(&self, identifier: I, args: &A) -> BusResult<Option<EmitResult<R>>> {
        let identifier = identifier.into();
        Dispatcher::new(&self.registry, &self.stats, self.is_tracing()).emit(&identifier, args)
    }

    /// Remove every listener
    pub fn clear(&self) {
        let count = {
            let mut registry = self.registry.lock();
            let count = registry.len();
            registry.clear();
            count
        };
        self.stats.removed(count);
        if self.is_tracing() {
            info!("Cleared {} listener(s)", count);
        }
    }

    /// Number of listeners registered under exactly `identifier`
    pub fn listener_count<I: Into<EventId>>(&self, identifier: I) -> usize {
        self.registry.lock().listener_count(&identifier.into())
    }

    /// Whether emitting this concrete identifier would reach any listener
    pub fn has_listeners<I: Into<EventId>>(&self, identifier: I) -> bool {
        let identifier = identifier.into();
        if validate_for_emission(&identifier).is_err() {
            return false;
        }
        let registry = self.registry.lock();
        registry
            .pattern_scan(&identifier)
            .iter()
            .any(|key| registry.has_live_entries(key))
    }

    /// Registered keys in registration order
    pub fn identifiers(&self) -> Vec<EventId> {
        self.registry.lock().identifiers()
    }

    /// Remaining capacity of a listener, `None` once it is gone
    pub fn remaining(&self, id: ListenerId) -> Option<Capacity> {
        self.registry.lock().remaining(id)
    }

    /// Total number of registered listeners
    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.lock().is_empty()
    }

    pub fn stats(&self) -> BusStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Toggle trace logging; never affects dispatch
    pub fn set_trace(&self, enabled: bool) {
        self.trace.store(enabled, Ordering::Relaxed);
    }

    pub fn is_tracing(&self) -> bool {
        self.trace.load(Ordering::Relaxed)
    }

    pub fn max_listeners(&self) -> Option<usize> {
        self.max_listeners
    }
}

impl<A: ?Sized, R> Default for EventBus<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized, R> std::fmt::Debug for EventBus<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.len())
            .field("trace", &self.is_tracing())
            .field("max_listeners", &self.max_listeners)
            .finish()
    }
}

/// Event bus builder
#[derive(Debug, Clone, Default)]
pub struct EventBusBuilder {
    config: BusConfig,
}

impl EventBusBuilder {
    /// Create new event bus builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable/disable trace logging
    pub fn trace(mut self, enabled: bool) -> Self {
        self.config.trace = enabled;
        self
    }

    /// Bucket size that triggers a leak warning; `None` disables it
    pub fn max_listeners(mut self, limit: Option<usize>) -> Self {
        self.config.max_listeners = limit;
        self
    }

    /// Build the event bus
    pub fn build<A: ?Sized, R>(self) -> EventBus<A, R> {
        EventBus::with_config(self.config)
    }
}
