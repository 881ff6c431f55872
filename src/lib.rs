pub mod bus;
pub mod config;
pub mod logging;

pub use bus::shared;
pub use bus::{
    BusError, BusResult, BusStats, Capacity, EmitResult, EventBus, EventBusBuilder, EventId,
    Invocation, ListenerId, Symbol,
};
pub use config::BusConfig;
