//! # quiver
//!
//! An entity/component registry with incrementally maintained queries.
//!
//! This crate provides:
//!
//! - [`Signature`]: fixed-width component bitsets, one bit per type.
//! - [`SignatureRegistry`]: assigns each component type its bit.
//! - [`ComponentStore`]: dense, swap-remove storage for one type.
//! - [`QueryIndex`]: the standing membership and materialized matches of
//!   one query.
//! - [`World`]: the registry tying entities, stores and queries together.
//! - [`EntityGuard`]: an entity destroyed at the end of its scope.
//!
//! Queries are kept up to date on every structural change rather than
//! evaluated on read: iterating [`World::matches`] walks a prebuilt list.

pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod guard;
pub mod query;
pub mod registry;
pub mod signature;
pub mod storage;
pub mod world;

pub use component::{Component, ComponentSet, ComponentType};
pub use config::WorldConfig;
pub use entity::{Entity, EntityAllocator};
pub use error::{ConfigError, WorldError};
pub use guard::EntityGuard;
pub use query::{Matches, Query, QueryId, QueryIndex};
pub use registry::SignatureRegistry;
pub use signature::{ComponentBit, SIGNATURE_BITS, Signature};
pub use storage::ComponentStore;
#[doc(hidden)]
pub use storage::StoreView;
pub use world::World;
