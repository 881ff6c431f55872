//! Shared Default Instance
//!
//! A process-wide [`EventBus`] created lazily on first access. It lives until
//! the process ends; its listeners are reset through its own `clear()`.

use std::sync::Arc;

use log::debug;
use parking_lot::{const_mutex, Mutex};

use crate::bus::event_bus::EventBus;
use crate::config::BusConfig;

static SHARED: Mutex<Option<Arc<EventBus>>> = const_mutex(None);

/// The shared bus, created with default configuration on first call
pub fn get_or_create() -> Arc<EventBus> {
    get_or_create_with(BusConfig::default)
}

/// The shared bus, created from `config` if it does not exist yet.
///
/// The configuration is ignored once the instance exists.
pub fn get_or_create_with<F>(config: F) -> Arc<EventBus>
where
    F: FnOnce() -> BusConfig,
{
    let mut shared = SHARED.lock();
    shared
        .get_or_insert_with(|| {
            debug!("Creating shared event bus");
            Arc::new(EventBus::with_config(config()))
        })
        .clone()
}

/// Drop the shared instance so the next access builds a fresh one.
///
/// Handles obtained earlier keep working but are no longer shared.
pub fn reset_for_tests() {
    if let Some(bus) = SHARED.lock().take() {
        bus.clear();
    }
}
