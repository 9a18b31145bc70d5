//! The world: entity registry, component stores and query indices.
//!
//! A [`World`] owns everything: its signature registry, one store per
//! registered component type (indexed by the type's bit), one subscriber
//! list per bit, every query index, and the record of each live entity.
//! Structural operations (component add/remove, entity destroy) update the
//! entity's signature, the store, and every query subscribed to the touched
//! bits before they return, so a read always reflects every prior write.
//!
//! Worlds are independent: handles, bits and query ids from one world mean
//! nothing in another.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use tracing::{debug, trace};

use crate::component::{Component, ComponentSet, ComponentType};
use crate::config::WorldConfig;
use crate::entity::{Entity, EntityAllocator};
use crate::error::{ConfigError, WorldError};
use crate::guard::EntityGuard;
use crate::query::{Matches, Query, QueryId, QueryIndex};
use crate::registry::SignatureRegistry;
use crate::signature::{ComponentBit, Signature};
use crate::storage::{self, ComponentStore, ErasedStore};

/// Per-entity bookkeeping.
#[derive(Debug, Default)]
struct EntityRecord {
    /// One bit per component the entity currently has.
    signature: Signature,
    /// Queries the entity is currently a member of.
    queries: BTreeSet<QueryId>,
}

/// An entity/component registry with incrementally maintained queries.
///
/// # Examples
///
/// ```rust
/// use quiver::{Component, World};
///
/// #[derive(Debug, Default)]
/// struct Position { x: f32 }
/// impl Component for Position {}
///
/// #[derive(Debug, Default)]
/// struct Velocity { x: f32 }
/// impl Component for Velocity {}
///
/// let mut world = World::new();
/// world.register_components::<(Position, Velocity)>()?;
/// let moving = world.register_query::<(Position, Velocity)>()?;
///
/// let e = world.create_entity();
/// world.insert_component(e, Position { x: 1.0 })?;
/// world.insert_component(e, Velocity { x: 0.5 })?;
///
/// for ((position, velocity), entity) in world.matches(moving)? {
///     assert_eq!(entity, e);
///     assert_eq!(position.x + velocity.x, 1.5);
/// }
/// # Ok::<(), quiver::WorldError>(())
/// ```
pub struct World {
    config: WorldConfig,
    allocator: EntityAllocator,
    registry: SignatureRegistry,
    /// `stores[b]` holds the values of the type that owns bit `b`.
    stores: Vec<Box<dyn ErasedStore>>,
    /// `subscribers[b]` lists the queries that require bit `b`.
    subscribers: Vec<Vec<QueryId>>,
    /// `queries[q.index()]` is the index of query `q`.
    queries: Vec<QueryIndex>,
    /// Registered queries by their ordered type list.
    query_lookup: HashMap<Vec<ComponentType>, QueryId>,
    entities: HashMap<Entity, EntityRecord>,
}

impl World {
    /// Create a world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(WorldConfig::default(), SignatureRegistry::with_full_width())
    }

    /// Create a world with the given configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::CapacityExceedsSignature`] if
    /// `config.max_component_types` is wider than the compiled signature.
    pub fn with_config(config: WorldConfig) -> Result<Self, ConfigError> {
        let registry = SignatureRegistry::new(config.max_component_types)?;
        Ok(Self::build(config, registry))
    }

    fn build(config: WorldConfig, registry: SignatureRegistry) -> Self {
        Self {
            config,
            allocator: EntityAllocator::new(),
            registry,
            stores: Vec::new(),
            subscribers: Vec::new(),
            queries: Vec::new(),
            query_lookup: HashMap::new(),
            entities: HashMap::new(),
        }
    }

    /// Returns the configuration this world was built with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Returns the signature registry.
    #[must_use]
    pub fn registry(&self) -> &SignatureRegistry {
        &self.registry
    }

    // -- Component types --

    /// Register `T`, assigning it the next signature bit and an empty store.
    ///
    /// # Errors
    ///
    /// [`ConfigError::AlreadyRegistered`] or
    /// [`ConfigError::TooManyComponentTypes`].
    pub fn register_component<T: Component>(&mut self) -> Result<ComponentBit, WorldError> {
        self.register_component_type(ComponentType::of::<T>())
    }

    /// Register every type of the tuple `Q`, in order.
    ///
    /// Registration stops at the first failure; the types before it stay
    /// registered.
    ///
    /// # Errors
    ///
    /// As [`register_component`](Self::register_component).
    pub fn register_components<Q: ComponentSet>(&mut self) -> Result<Vec<ComponentBit>, WorldError> {
        Q::component_types()
            .into_iter()
            .map(|ty| self.register_component_type(ty))
            .collect()
    }

    /// Register a component type from its runtime token.
    ///
    /// # Errors
    ///
    /// As [`register_component`](Self::register_component).
    pub fn register_component_type(&mut self, ty: ComponentType) -> Result<ComponentBit, WorldError> {
        let bit = self.registry.register(ty)?;
        self.stores.push(ty.new_store(self.config.initial_capacity));
        self.subscribers.push(Vec::new());
        debug!(component = ty.name(), bit = bit.index(), "registered component type");
        Ok(bit)
    }

    /// Returns the bit assigned to `T`, if registered.
    #[must_use]
    pub fn component_bit<T: Component>(&self) -> Option<ComponentBit> {
        self.registry.bit_of_type::<T>()
    }

    /// Returns the store holding every `T`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnregisteredComponent`] if `T` is not registered.
    pub fn store<T: Component>(&self) -> Result<&ComponentStore<T>, WorldError> {
        self.registry
            .bit_of_type::<T>()
            .and_then(|bit| storage::typed::<T>(&self.stores, bit))
            .ok_or_else(|| unregistered::<T>().into())
    }

    /// Returns the number of stored values of a registered type.
    #[must_use]
    pub fn store_len(&self, ty: ComponentType) -> Option<usize> {
        let bit = self.registry.bit_of(ty)?;
        self.stores.get(bit.index()).map(|store| store.len())
    }

    // -- Entity lifecycle --

    /// Create an entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        self.entities.insert(entity, EntityRecord::default());
        if self.config.log_lifecycle {
            debug!(%entity, "entity created");
        }
        entity
    }

    /// Create an entity that is destroyed when the returned guard drops.
    pub fn spawn_scoped(&mut self) -> EntityGuard<'_> {
        EntityGuard::new(self)
    }

    /// Destroy `entity`: remove each of its components from its store, take
    /// it out of every query it belongs to, and forget its record.
    ///
    /// # Errors
    ///
    /// [`WorldError::EntityNotFound`] if `entity` is not alive.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), WorldError> {
        let record = self
            .entities
            .remove(&entity)
            .ok_or(WorldError::EntityNotFound(entity))?;

        // Every store the entity leaves shifts another value into its slot,
        // so every query reading that store is rebuilt, not just the ones the
        // entity belonged to.
        let mut stale = BTreeSet::new();
        for bit in record.signature.bits() {
            self.stores[bit.index()].remove_entity(entity)?;
            stale.extend(self.subscribers[bit.index()].iter().copied());
        }
        for query_id in &record.queries {
            self.queries[query_id.index()].remove(entity);
        }
        for query_id in stale {
            self.queries[query_id.index()].materialize(&self.stores)?;
        }

        if self.config.log_lifecycle {
            debug!(%entity, components = record.signature.count(), "entity destroyed");
        }
        Ok(())
    }

    /// Returns `true` if `entity` is alive.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Returns the live entities, in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.keys().copied()
    }

    /// Returns `entity`'s signature.
    ///
    /// # Errors
    ///
    /// [`WorldError::EntityNotFound`] if `entity` is not alive.
    pub fn signature(&self, entity: Entity) -> Result<Signature, WorldError> {
        self.record(entity).map(|record| record.signature)
    }

    /// Returns the queries `entity` is currently a member of.
    ///
    /// # Errors
    ///
    /// [`WorldError::EntityNotFound`] if `entity` is not alive.
    pub fn entity_queries(
        &self,
        entity: Entity,
    ) -> Result<impl Iterator<Item = QueryId> + '_, WorldError> {
        self.record(entity).map(|record| record.queries.iter().copied())
    }

    fn record(&self, entity: Entity) -> Result<&EntityRecord, WorldError> {
        self.entities
            .get(&entity)
            .ok_or(WorldError::EntityNotFound(entity))
    }

    // -- Components --

    /// Attach a default-constructed `T` to `entity`.
    ///
    /// # Errors
    ///
    /// As [`insert_component`](Self::insert_component).
    pub fn add_component<T: Component + Default>(&mut self, entity: Entity) -> Result<(), WorldError> {
        self.insert_component(entity, T::default())
    }

    /// Attach `value` to `entity`.
    ///
    /// Every query subscribed to `T`'s bit re-tests the entity's full new
    /// signature; those it now satisfies gain the entity and are rebuilt
    /// before this returns.
    ///
    /// # Errors
    ///
    /// [`WorldError::EntityNotFound`], [`ConfigError::UnregisteredComponent`]
    /// or [`WorldError::DuplicateComponent`]. On error nothing changes.
    pub fn insert_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        let record = self
            .entities
            .get_mut(&entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        let bit = self.registry.bit_of_type::<T>().ok_or_else(unregistered::<T>)?;
        storage::typed_mut::<T>(&mut self.stores, bit)?.insert(entity, value)?;
        record.signature.set(bit);
        trace!(%entity, component = T::type_name(), "component added");

        for &query_id in &self.subscribers[bit.index()] {
            let query = &mut self.queries[query_id.index()];
            if query.accepts(&record.signature) && query.insert(entity) {
                record.queries.insert(query_id);
                query.materialize(&self.stores)?;
            }
        }
        Ok(())
    }

    /// Detach and return `entity`'s `T`.
    ///
    /// The entity leaves every query subscribed to `T`'s bit, and each of
    /// those queries is rebuilt, since the swap-removal moved another
    /// entity's `T` to a new slot.
    ///
    /// # Errors
    ///
    /// [`WorldError::EntityNotFound`], [`ConfigError::UnregisteredComponent`]
    /// or [`WorldError::MissingComponent`]. On error nothing changes.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<T, WorldError> {
        let record = self
            .entities
            .get_mut(&entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        let bit = self.registry.bit_of_type::<T>().ok_or_else(unregistered::<T>)?;
        let value = storage::typed_mut::<T>(&mut self.stores, bit)?.remove(entity)?;
        record.signature.clear(bit);
        trace!(%entity, component = T::type_name(), "component removed");

        for &query_id in &self.subscribers[bit.index()] {
            let query = &mut self.queries[query_id.index()];
            if query.remove(entity) {
                record.queries.remove(&query_id);
            }
            query.materialize(&self.stores)?;
        }
        Ok(value)
    }

    /// Returns `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnregisteredComponent`] or
    /// [`WorldError::MissingComponent`], including for destroyed entities.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T, WorldError> {
        self.store::<T>()?.get(entity)
    }

    /// Returns `entity`'s `T` mutably. Changing a value in place is not a
    /// structural change and leaves every query as it is.
    ///
    /// # Errors
    ///
    /// As [`get_component`](Self::get_component).
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, WorldError> {
        let bit = self.registry.bit_of_type::<T>().ok_or_else(unregistered::<T>)?;
        storage::typed_mut::<T>(&mut self.stores, bit)?.get_mut(entity)
    }

    /// Returns `true` if `entity` has a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.has_component_type(entity, ComponentType::of::<T>())
    }

    /// Returns `true` if `entity` has a value of the type named by `ty`.
    #[must_use]
    pub fn has_component_type(&self, entity: Entity, ty: ComponentType) -> bool {
        self.registry
            .bit_of(ty)
            .and_then(|bit| self.stores.get(bit.index()))
            .is_some_and(|store| store.contains(entity))
    }

    // -- Queries --

    /// Register a query requiring every type of `Q`.
    ///
    /// # Errors
    ///
    /// As [`register_query_dynamic`](Self::register_query_dynamic).
    pub fn register_query<Q: ComponentSet>(&mut self) -> Result<Query<Q>, WorldError> {
        self.register_query_dynamic(&Q::component_types())
            .map(Query::new)
    }

    /// Register a query requiring every type of `types`.
    ///
    /// Registering the same ordered list again returns the existing id.
    /// Entities that already satisfy the query become members immediately.
    ///
    /// # Errors
    ///
    /// [`ConfigError::EmptyQuery`], [`ConfigError::DuplicateQueryType`] or
    /// [`ConfigError::UnregisteredComponent`]. On error nothing changes.
    pub fn register_query_dynamic(&mut self, types: &[ComponentType]) -> Result<QueryId, WorldError> {
        if let Some(&id) = self.query_lookup.get(types) {
            return Ok(id);
        }
        if types.is_empty() {
            return Err(ConfigError::EmptyQuery.into());
        }
        for (position, ty) in types.iter().enumerate() {
            if types[..position].contains(ty) {
                return Err(ConfigError::DuplicateQueryType { name: ty.name() }.into());
            }
        }
        let bits = types
            .iter()
            .map(|&ty| self.registry.require(ty))
            .collect::<Result<Vec<_>, _>>()?;

        let id = QueryId::from_index(self.queries.len());
        let mut query = QueryIndex::new(id, types.to_vec(), bits);
        for (&entity, record) in &self.entities {
            if query.accepts(&record.signature) {
                query.insert(entity);
            }
        }
        query.materialize(&self.stores)?;

        for bit in query.bits() {
            self.subscribers[bit.index()].push(id);
        }
        for &entity in query.entities() {
            if let Some(record) = self.entities.get_mut(&entity) {
                record.queries.insert(id);
            }
        }
        debug!(
            query = id.index(),
            components = ?types,
            members = query.len(),
            "registered query"
        );
        self.queries.push(query);
        self.query_lookup.insert(types.to_vec(), id);
        Ok(id)
    }

    /// Iterate over the materialized matches of `query`.
    ///
    /// # Errors
    ///
    /// [`WorldError::QueryNotFound`] if the query belongs to another world,
    /// or [`WorldError::QueryTypeMismatch`] if that world registered a
    /// different type list under the same id.
    pub fn matches<Q: ComponentSet>(&self, query: Query<Q>) -> Result<Matches<'_, Q>, WorldError> {
        let id = query.id();
        self.query(id)?
            .view::<Q>(&self.stores)
            .ok_or(WorldError::QueryTypeMismatch(id))
    }

    /// Returns the index behind `id`.
    ///
    /// # Errors
    ///
    /// [`WorldError::QueryNotFound`] if `id` was not issued by this world.
    pub fn query(&self, id: QueryId) -> Result<&QueryIndex, WorldError> {
        self.queries
            .get(id.index())
            .ok_or(WorldError::QueryNotFound(id))
    }

    /// Returns the members of `id`, in materialized order.
    ///
    /// # Errors
    ///
    /// [`WorldError::QueryNotFound`] if `id` was not issued by this world.
    pub fn query_entities(&self, id: QueryId) -> Result<&[Entity], WorldError> {
        self.query(id).map(QueryIndex::entities)
    }

    /// Returns the number of members of `id`.
    ///
    /// # Errors
    ///
    /// [`WorldError::QueryNotFound`] if `id` was not issued by this world.
    pub fn query_len(&self, id: QueryId) -> Result<usize, WorldError> {
        self.query(id).map(QueryIndex::len)
    }

    /// Returns `true` if `entity` is a member of `id`.
    ///
    /// # Errors
    ///
    /// [`WorldError::QueryNotFound`] if `id` was not issued by this world.
    pub fn query_contains(&self, id: QueryId, entity: Entity) -> Result<bool, WorldError> {
        self.query(id).map(|query| query.contains(entity))
    }

    /// Returns the signature `id` requires.
    ///
    /// # Errors
    ///
    /// [`WorldError::QueryNotFound`] if `id` was not issued by this world.
    pub fn query_signature(&self, id: QueryId) -> Result<Signature, WorldError> {
        self.query(id).map(QueryIndex::signature)
    }

    /// Returns the number of registered queries.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.len()
    }
}

fn unregistered<T: Component>() -> ConfigError {
    ConfigError::UnregisteredComponent {
        name: T::type_name(),
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stores: Vec<(&'static str, usize)> = self
            .stores
            .iter()
            .map(|store| (store.component_type().name(), store.len()))
            .collect();
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("stores", &stores)
            .field("queries", &self.queries.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Position {
        x: f32,
    }
    impl Component for Position {}

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Velocity {
        x: f32,
    }
    impl Component for Velocity {}

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Health {
        hp: i32,
    }
    impl Component for Health {}

    fn world() -> World {
        let mut world = World::new();
        world
            .register_components::<(Position, Velocity, Health)>()
            .unwrap();
        world
    }

    /// Check the stated invariants for every live entity and query.
    fn assert_consistent(world: &World) {
        for (&entity, record) in &world.entities {
            for (ty, bit) in world.registry.iter() {
                assert_eq!(
                    record.signature.test(bit),
                    world.stores[bit.index()].contains(entity),
                    "{entity}: bit for {ty} disagrees with its store"
                );
            }
            for query in &world.queries {
                assert_eq!(
                    query.contains(entity),
                    record.signature.contains(&query.signature()),
                    "{entity}: membership of {} is wrong",
                    query.id()
                );
                assert_eq!(query.contains(entity), record.queries.contains(&query.id()));
            }
        }
        for query in &world.queries {
            assert_eq!(query.entities().len(), query.len());
            let unique: BTreeSet<Entity> = query.entities().iter().copied().collect();
            assert_eq!(unique.len(), query.len());
            for &entity in query.entities() {
                assert!(world.contains(entity));
            }
        }
    }

    #[test]
    fn test_position_velocity_scenario() {
        let mut world = world();
        let moving = world.register_query::<(Position, Velocity)>().unwrap();

        let e1 = world.create_entity();
        world.insert_component(e1, Position { x: 1.0 }).unwrap();
        assert_eq!(world.matches(moving).unwrap().len(), 0);
        world.insert_component(e1, Velocity { x: 2.0 }).unwrap();

        let rows: Vec<(f32, f32, Entity)> = world
            .matches(moving)
            .unwrap()
            .map(|((p, v), e)| (p.x, v.x, e))
            .collect();
        assert_eq!(rows, vec![(1.0, 2.0, e1)]);
        assert_consistent(&world);

        let velocity = world.remove_component::<Velocity>(e1).unwrap();
        assert_eq!(velocity.x, 2.0);
        assert_eq!(world.matches(moving).unwrap().len(), 0);
        assert_consistent(&world);

        world.destroy_entity(e1).unwrap();
        assert_eq!(world.store::<Position>().unwrap().len(), 0);
        assert_eq!(world.store::<Velocity>().unwrap().len(), 0);
        assert_consistent(&world);
    }

    #[test]
    fn test_add_default_component() {
        let mut world = world();
        let e = world.create_entity();
        world.add_component::<Health>(e).unwrap();
        assert_eq!(world.get_component::<Health>(e).unwrap(), &Health::default());
        assert!(world.has_component::<Health>(e));
        assert!(!world.has_component::<Position>(e));
    }

    #[test]
    fn test_entity_handles_start_at_one() {
        let mut world = world();
        assert_eq!(world.create_entity().to_raw(), 1);
        assert_eq!(world.create_entity().to_raw(), 2);
        assert_eq!(world.entity_count(), 2);
    }

    #[test]
    fn test_overlapping_signatures_are_independent() {
        let mut world = world();
        let moving = world.register_query::<(Position, Velocity)>().unwrap();
        let alive = world.register_query::<(Position, Health)>().unwrap();

        let runner = world.create_entity();
        world.insert_component(runner, Position { x: 1.0 }).unwrap();
        world.insert_component(runner, Velocity { x: 1.0 }).unwrap();

        let statue = world.create_entity();
        world.insert_component(statue, Position { x: 5.0 }).unwrap();
        world.insert_component(statue, Health { hp: 10 }).unwrap();

        let moving_before: Vec<Entity> = world.query_entities(moving.id()).unwrap().to_vec();
        world.insert_component(statue, Velocity { x: 0.0 }).unwrap();

        // The statue now moves too, but the runner's row is untouched.
        assert_eq!(world.query_entities(moving.id()).unwrap(), &[runner, statue]);
        assert_eq!(moving_before, vec![runner]);
        assert_eq!(world.query_entities(alive.id()).unwrap(), &[statue]);

        world.insert_component(runner, Health { hp: 3 }).unwrap();
        let alive_rows: Vec<(i32, Entity)> = world
            .matches(alive)
            .unwrap()
            .map(|((_, h), e)| (h.hp, e))
            .collect();
        assert_eq!(alive_rows, vec![(3, runner), (10, statue)]);
        assert_consistent(&world);
    }

    #[test]
    fn test_swap_remove_keeps_other_rows_correct() {
        let mut world = world();
        let moving = world.register_query::<(Position, Velocity)>().unwrap();

        let a = world.create_entity();
        let b = world.create_entity();
        let c = world.create_entity();
        for (e, x) in [(a, 1.0), (b, 2.0), (c, 3.0)] {
            world.insert_component(e, Position { x }).unwrap();
        }
        world.insert_component(c, Velocity { x: 30.0 }).unwrap();

        // Removing a's position moves c's position into slot 0, while a was
        // never a member of the query.
        world.remove_component::<Position>(a).unwrap();
        let rows: Vec<(f32, f32)> = world
            .matches(moving)
            .unwrap()
            .map(|((p, v), _)| (p.x, v.x))
            .collect();
        assert_eq!(rows, vec![(3.0, 30.0)]);

        // Same through destruction.
        world.destroy_entity(b).unwrap();
        let rows: Vec<(f32, Entity)> = world
            .matches(moving)
            .unwrap()
            .map(|((p, _), e)| (p.x, e))
            .collect();
        assert_eq!(rows, vec![(3.0, c)]);
        assert_consistent(&world);
    }

    #[test]
    fn test_destroy_removes_from_every_store_and_query() {
        let mut world = world();
        let moving = world.register_query::<(Position, Velocity)>().unwrap();
        let health = world.register_query::<(Health,)>().unwrap();

        let e = world.create_entity();
        world.add_component::<Position>(e).unwrap();
        world.add_component::<Velocity>(e).unwrap();
        world.add_component::<Health>(e).unwrap();
        assert_eq!(world.entity_queries(e).unwrap().count(), 2);

        world.destroy_entity(e).unwrap();
        assert!(!world.contains(e));
        assert!(world.query_entities(moving.id()).unwrap().is_empty());
        assert!(world.query_entities(health.id()).unwrap().is_empty());
        assert!(matches!(
            world.get_component::<Position>(e),
            Err(WorldError::MissingComponent { .. })
        ));
        assert_eq!(world.signature(e), Err(WorldError::EntityNotFound(e)));
        assert_eq!(world.destroy_entity(e), Err(WorldError::EntityNotFound(e)));
        for ty in <(Position, Velocity, Health)>::component_types() {
            assert_eq!(world.store_len(ty), Some(0));
        }
    }

    #[test]
    fn test_duplicate_and_missing_components() {
        let mut world = world();
        let e = world.create_entity();
        world.insert_component(e, Position { x: 1.0 }).unwrap();

        let err = world.insert_component(e, Position { x: 2.0 }).unwrap_err();
        assert!(matches!(err, WorldError::DuplicateComponent { entity, .. } if entity == e));
        assert_eq!(world.get_component::<Position>(e).unwrap().x, 1.0);

        let err = world.remove_component::<Velocity>(e).unwrap_err();
        assert!(matches!(err, WorldError::MissingComponent { .. }));
        assert!(world.signature(e).unwrap().test(world.component_bit::<Position>().unwrap()));
    }

    #[test]
    fn test_operations_on_dead_entity() {
        let mut world = world();
        let e = world.create_entity();
        world.destroy_entity(e).unwrap();
        assert_eq!(
            world.insert_component(e, Health { hp: 1 }),
            Err(WorldError::EntityNotFound(e))
        );
        assert_eq!(
            world.remove_component::<Health>(e).unwrap_err(),
            WorldError::EntityNotFound(e)
        );
    }

    #[test]
    fn test_unregistered_component_rejected() {
        #[derive(Debug, Default)]
        struct Unknown;
        impl Component for Unknown {}

        let mut world = world();
        let e = world.create_entity();
        let err = world.add_component::<Unknown>(e).unwrap_err();
        assert!(matches!(
            err,
            WorldError::Config(ConfigError::UnregisteredComponent { .. })
        ));
        assert!(world.signature(e).unwrap().is_empty());

        let err = world.register_query::<(Position, Unknown)>().unwrap_err();
        assert!(matches!(
            err,
            WorldError::Config(ConfigError::UnregisteredComponent { .. })
        ));
        assert_eq!(world.query_count(), 0);
    }

    #[test]
    fn test_reregistering_component_rejected() {
        let mut world = world();
        let bit = world.component_bit::<Velocity>().unwrap();
        let err = world.register_component::<Velocity>().unwrap_err();
        assert!(matches!(
            err,
            WorldError::Config(ConfigError::AlreadyRegistered { .. })
        ));
        assert_eq!(world.component_bit::<Velocity>(), Some(bit));
        assert_eq!(world.registry().len(), 3);
    }

    #[test]
    fn test_type_limit_overflow() {
        let config = WorldConfig::new().with_max_component_types(2);
        let mut world = World::with_config(config).unwrap();
        world.register_component::<Position>().unwrap();
        world.register_component::<Velocity>().unwrap();
        let err = world.register_component::<Health>().unwrap_err();
        assert!(matches!(
            err,
            WorldError::Config(ConfigError::TooManyComponentTypes { limit: 2, .. })
        ));
        assert_eq!(world.component_bit::<Position>().map(|b| b.index()), Some(0));
        assert_eq!(world.component_bit::<Velocity>().map(|b| b.index()), Some(1));

        // The registered types keep working.
        let e = world.create_entity();
        world.add_component::<Velocity>(e).unwrap();
        assert!(world.has_component::<Velocity>(e));
    }

    #[test]
    fn test_config_wider_than_signature_rejected() {
        let config = WorldConfig::new().with_max_component_types(crate::SIGNATURE_BITS + 1);
        assert!(matches!(
            World::with_config(config),
            Err(ConfigError::CapacityExceedsSignature { .. })
        ));
    }

    #[test]
    fn test_query_registration_is_idempotent() {
        let mut world = world();
        let first = world.register_query::<(Position, Velocity)>().unwrap();
        let second = world.register_query::<(Position, Velocity)>().unwrap();
        assert_eq!(first, second);
        assert_eq!(world.query_count(), 1);
        let bit = world.component_bit::<Position>().unwrap();
        assert_eq!(world.subscribers[bit.index()], vec![first.id()]);
    }

    #[test]
    fn test_invalid_query_declarations() {
        let mut world = world();
        assert_eq!(
            world.register_query_dynamic(&[]),
            Err(WorldError::Config(ConfigError::EmptyQuery))
        );
        let err = world.register_query::<(Position, Position)>().unwrap_err();
        assert!(matches!(
            err,
            WorldError::Config(ConfigError::DuplicateQueryType { .. })
        ));
    }

    #[test]
    fn test_late_query_sees_existing_entities() {
        let mut world = world();
        let e1 = world.create_entity();
        let e2 = world.create_entity();
        world.insert_component(e1, Health { hp: 1 }).unwrap();
        world.insert_component(e2, Position { x: 0.0 }).unwrap();

        let health = world.register_query::<(Health,)>().unwrap();
        assert_eq!(world.query_entities(health.id()).unwrap(), &[e1]);
        assert_eq!(world.entity_queries(e1).unwrap().collect::<Vec<_>>(), vec![health.id()]);
        assert_eq!(world.query_len(health.id()), Ok(1));
        assert_eq!(world.query_contains(health.id(), e1), Ok(true));
        assert_eq!(world.query_contains(health.id(), e2), Ok(false));
        let bit = world.component_bit::<Health>().unwrap();
        assert_eq!(world.query_signature(health.id()), Ok(Signature::from_bit(bit)));
        assert_consistent(&world);
    }

    #[test]
    fn test_query_from_other_world() {
        let mut other = world();
        other.register_query::<(Health,)>().unwrap();
        let foreign = other.register_query::<(Position, Velocity)>().unwrap();

        let mut world = world();
        assert_eq!(
            world.matches(foreign).unwrap_err(),
            WorldError::QueryNotFound(foreign.id())
        );
        world.register_query::<(Velocity,)>().unwrap();
        world.register_query::<(Health,)>().unwrap();
        assert_eq!(
            world.matches(foreign).unwrap_err(),
            WorldError::QueryTypeMismatch(foreign.id())
        );
    }

    #[test]
    fn test_dynamic_query_and_mutation_in_place() {
        let mut world = world();
        let id = world
            .register_query_dynamic(&[ComponentType::of::<Position>()])
            .unwrap();
        let e = world.create_entity();
        world.insert_component(e, Position { x: 1.0 }).unwrap();
        world.get_component_mut::<Position>(e).unwrap().x = 9.0;

        assert_eq!(world.query_entities(id).unwrap(), &[e]);
        let typed = world.register_query::<(Position,)>().unwrap();
        assert_eq!(typed.id(), id);
        let xs: Vec<f32> = world.matches(typed).unwrap().map(|((p,), _)| p.x).collect();
        assert_eq!(xs, vec![9.0]);
    }

    #[test]
    fn test_independent_worlds() {
        let mut a = world();
        let mut b = World::new();
        b.register_component::<Health>().unwrap();

        assert_eq!(a.component_bit::<Health>().map(|bit| bit.index()), Some(2));
        assert_eq!(b.component_bit::<Health>().map(|bit| bit.index()), Some(0));

        let ea = a.create_entity();
        let eb = b.create_entity();
        assert_eq!(ea, eb);
        a.add_component::<Health>(ea).unwrap();
        assert!(!b.has_component::<Health>(eb));
    }
}
