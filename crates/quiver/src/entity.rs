//! Entity handles and their allocation.
//!
//! An [`Entity`] carries no data; it only names a slot in the component
//! stores of the [`World`](crate::World) that issued it. Raw id 0 is the null
//! handle and never names a live entity, so the handle wraps a
//! [`NonZeroU64`] and "no entity" is spelled `Option<Entity>` at no size
//! cost.

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// An opaque entity handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(NonZeroU64);

impl Entity {
    /// Rebuild a handle from its raw id. Returns `None` for the null id 0.
    #[must_use]
    pub const fn from_raw(id: u64) -> Option<Self> {
        match NonZeroU64::new(id) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Returns the raw id. Never 0.
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Hands out entity handles in increasing order, starting at 1.
///
/// Handles of destroyed entities are never reissued.
#[derive(Debug)]
pub struct EntityAllocator {
    next: NonZeroU64,
}

impl EntityAllocator {
    /// Creates an allocator whose first handle is `Entity(1)`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: NonZeroU64::MIN,
        }
    }

    /// Issues the next handle.
    pub fn allocate(&mut self) -> Entity {
        let entity = Entity(self.next);
        // A u64 counter bumped once per entity does not wrap in practice.
        self.next = self.next.saturating_add(1);
        entity
    }

    /// Returns how many handles have been issued, live or destroyed.
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.next.get() - 1
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
