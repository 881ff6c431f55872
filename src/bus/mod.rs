//! Wildcard Event Bus
//!
//! An in-process, synchronous publish/subscribe dispatcher.
//!
//! # Architecture
//!
//! - **Identifiers**: textual keys (`user.login`, patterns like `user.*`) or
//!   opaque keys (integers, symbols, shared-value identity)
//! - **Pattern**: registration/emission validation and wildcard matching
//! - **Registry**: buckets of listeners per registered key, with a reverse
//!   index for removal by id
//! - **Dispatcher**: resolves matching buckets, invokes listeners, retires
//!   exhausted ones
//! - **EventBus**: the public facade
//!
//! # Example Usage
//!
//! ```
//! use wildbus::EventBus;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bus: EventBus<str, String> = EventBus::new();
//!
//! bus.on("user.*", |name: &str| Ok(format!("any user event for {}", name)))?;
//! bus.once("user.login", |name: &str| Ok(format!("welcome {}", name)))?;
//!
//! let result = bus.emit("user.login", "ada")?.expect("two listeners matched");
//! assert_eq!(result.len(), 2);
//!
//! // The `once` listener is gone now, the pattern listener stays.
//! let result = bus.emit("user.login", "ada")?.expect("pattern still matches");
//! assert_eq!(result.len(), 1);
//!
//! assert!(bus.emit("order.created", "ada")?.is_none());
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod error;
pub mod event_bus;
pub mod identifier;
pub mod listener;
pub mod pattern;
pub mod registry;
pub mod shared;
pub mod stats;


// Re-export core types for convenience
pub use dispatcher::{EmitResult, Invocation};
pub use error::{BusError, BusResult};
pub use event_bus::{EventBus, EventBusBuilder};
pub use identifier::{EventId, OpaqueKey, RefKey, Symbol};
pub use listener::{Capacity, Listener, ListenerId};
pub use stats::BusStats;
