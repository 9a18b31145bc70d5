//! Dense per-type component storage.
//!
//! A [`ComponentStore`] keeps all values of one component type packed in a
//! `Vec`, with a parallel `Vec` of owning entities (index → handle) and a
//! hash map back from handle to index. Removal swaps the last value into the
//! hole, so the arrays stay dense and every operation is O(1) amortized, at
//! the price of not preserving order across removals.
//!
//! The world holds one store per registered type behind [`ErasedStore`],
//! indexed by the type's signature bit.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::component::{Component, ComponentType};
use crate::entity::Entity;
use crate::error::{ConfigError, WorldError};
use crate::signature::ComponentBit;

/// Storage for every instance of the component type `T`.
///
/// Invariant: `values`, `entities` and `index` always have the same length,
/// and `entities[index[e]] == e` for every stored entity `e`.
pub struct ComponentStore<T> {
    values: Vec<T>,
    entities: Vec<Entity>,
    index: HashMap<Entity, usize>,
}

impl<T: Component> ComponentStore<T> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty store with room for `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            entities: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Append a default-constructed value for `entity`.
    ///
    /// # Errors
    ///
    /// [`WorldError::DuplicateComponent`] if `entity` already has a value.
    pub fn add(&mut self, entity: Entity) -> Result<&mut T, WorldError>
    where
        T: Default,
    {
        self.insert(entity, T::default())
    }

    /// Append `value` for `entity`.
    ///
    /// # Errors
    ///
    /// [`WorldError::DuplicateComponent`] if `entity` already has a value.
    pub fn insert(&mut self, entity: Entity, value: T) -> Result<&mut T, WorldError> {
        if self.index.contains_key(&entity) {
            return Err(WorldError::DuplicateComponent {
                entity,
                component: T::type_name(),
            });
        }
        let slot = self.values.len();
        self.values.push(value);
        self.entities.push(entity);
        self.index.insert(entity, slot);
        Ok(&mut self.values[slot])
    }

    /// Remove and return `entity`'s value.
    ///
    /// The last value is moved into the vacated slot, so the index of the
    /// entity that owned it changes.
    ///
    /// # Errors
    ///
    /// [`WorldError::MissingComponent`] if `entity` has no value.
    pub fn remove(&mut self, entity: Entity) -> Result<T, WorldError> {
        let Some(slot) = self.index.remove(&entity) else {
            return Err(missing::<T>(entity));
        };
        let value = self.values.swap_remove(slot);
        self.entities.swap_remove(slot);
        if let Some(&displaced) = self.entities.get(slot) {
            self.index.insert(displaced, slot);
        }
        Ok(value)
    }

    /// Returns `entity`'s value.
    ///
    /// # Errors
    ///
    /// [`WorldError::MissingComponent`] if `entity` has no value.
    pub fn get(&self, entity: Entity) -> Result<&T, WorldError> {
        match self.index.get(&entity) {
            Some(&slot) => Ok(&self.values[slot]),
            None => Err(missing::<T>(entity)),
        }
    }

    /// Returns `entity`'s value mutably.
    ///
    /// # Errors
    ///
    /// [`WorldError::MissingComponent`] if `entity` has no value.
    pub fn get_mut(&mut self, entity: Entity) -> Result<&mut T, WorldError> {
        match self.index.get(&entity) {
            Some(&slot) => Ok(&mut self.values[slot]),
            None => Err(missing::<T>(entity)),
        }
    }

    /// Returns `true` if `entity` has a value in this store.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.index.contains_key(&entity)
    }

    /// Returns the dense index of `entity`'s value.
    #[must_use]
    pub fn index_of(&self, entity: Entity) -> Option<usize> {
        self.index.get(&entity).copied()
    }

    /// Returns the value at a dense index.
    #[must_use]
    pub fn value_at(&self, slot: usize) -> Option<&T> {
        self.values.get(slot)
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The packed values. `values()[i]` belongs to `entities()[i]`.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// The packed values, mutably. Values can be changed in place but not
    /// added or removed.
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// The owning entity of each packed value.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Iterate over `(entity, value)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.values.iter())
    }
}

impl<T: Component> Default for ComponentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> fmt::Debug for ComponentStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentStore")
            .field("component", &T::type_name())
            .field("len", &self.values.len())
            .finish_non_exhaustive()
    }
}

fn missing<T: Component>(entity: Entity) -> WorldError {
    WorldError::MissingComponent {
        entity,
        component: T::type_name(),
    }
}

/// Type-erased interface to a [`ComponentStore`], for the paths that walk
/// stores by signature bit without knowing their types.
pub(crate) trait ErasedStore {
    fn component_type(&self) -> ComponentType;
    fn remove_entity(&mut self, entity: Entity) -> Result<(), WorldError>;
    fn contains(&self, entity: Entity) -> bool;
    fn index_of(&self, entity: Entity) -> Option<usize>;
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStore for ComponentStore<T> {
    fn component_type(&self) -> ComponentType {
        ComponentType::of::<T>()
    }

    fn remove_entity(&mut self, entity: Entity) -> Result<(), WorldError> {
        self.remove(entity).map(drop)
    }

    fn contains(&self, entity: Entity) -> bool {
        ComponentStore::contains(self, entity)
    }

    fn index_of(&self, entity: Entity) -> Option<usize> {
        ComponentStore::index_of(self, entity)
    }

    fn len(&self) -> usize {
        ComponentStore::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Downcast the store registered under `bit` to `ComponentStore<T>`.
pub(crate) fn typed<T: Component>(
    stores: &[Box<dyn ErasedStore>],
    bit: ComponentBit,
) -> Option<&ComponentStore<T>> {
    stores
        .get(bit.index())?
        .as_any()
        .downcast_ref::<ComponentStore<T>>()
}

/// Mutable counterpart of [`typed`].
pub(crate) fn typed_mut<T: Component>(
    stores: &mut [Box<dyn ErasedStore>],
    bit: ComponentBit,
) -> Result<&mut ComponentStore<T>, WorldError> {
    stores
        .get_mut(bit.index())
        .and_then(|store| store.as_any_mut().downcast_mut::<ComponentStore<T>>())
        .ok_or_else(|| {
            ConfigError::UnregisteredComponent {
                name: T::type_name(),
            }
            .into()
        })
}

/// A query's stores, in the order of its required component types.
///
/// Handed to [`ComponentSet::stores`](crate::ComponentSet::stores) to
/// resolve the typed stores behind a [`Matches`](crate::Matches) iterator.
pub struct StoreView<'w> {
    stores: &'w [Box<dyn ErasedStore>],
    bits: &'w [ComponentBit],
}

impl<'w> StoreView<'w> {
    pub(crate) fn new(stores: &'w [Box<dyn ErasedStore>], bits: &'w [ComponentBit]) -> Self {
        Self { stores, bits }
    }

    /// The store of the query's `position`-th component type, if it holds
    /// `T` values.
    #[must_use]
    pub fn typed<T: Component>(&self, position: usize) -> Option<&'w ComponentStore<T>> {
        typed::<T>(self.stores, *self.bits.get(position)?)
    }
}
