//! Listener Entries and Capacity

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bus::error::{BusError, BusResult};

/// Unique, never reused listener identifier
pub type ListenerId = u64;

/// Registered callback, invoked with the emitted arguments
pub type Listener<A, R> = Arc<dyn Fn(&A) -> anyhow::Result<R> + Send + Sync>;

/// Remaining number of invocations for a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capacity {
    /// Never expires
    Unbounded,

    /// Expires once the count reaches zero
    Remaining(u32),
}

impl Capacity {
    /// Bounded capacity; zero is rejected
    pub fn limited(times: u32) -> BusResult<Self> {
        if times == 0 {
            return Err(BusError::InvalidCapacity { capacity: times });
        }
        Ok(Self::Remaining(times))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Remaining(0))
    }

    /// Take one invocation; unbounded capacity is left untouched
    pub(crate) fn consume(&mut self) -> Capacity {
        if let Self::Remaining(count) = self {
            *count = count.saturating_sub(1);
        }
        *self
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Self::Unbounded
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Unbounded => write!(f, "unbounded"),
            Capacity::Remaining(count) => write!(f, "{}", count),
        }
    }
}

/// One registration held by a registry bucket
pub struct ListenerEntry<A: ?Sized, R> {
    pub id: ListenerId,
    pub callback: Listener<A, R>,
    pub remaining: Capacity,
}

impl<A: ?Sized, R> ListenerEntry<A, R> {
    pub fn new(id: ListenerId, callback: Listener<A, R>, remaining: Capacity) -> Self {
        Self {
            id,
            callback,
            remaining,
        }
    }
}

impl<A: ?Sized, R> fmt::Debug for ListenerEntry<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("id", &self.id)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}
