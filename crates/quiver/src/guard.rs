//! Scoped entity handle.

use tracing::warn;

use crate::component::Component;
use crate::entity::Entity;
use crate::error::WorldError;
use crate::world::World;

/// An entity that is destroyed when the guard goes out of scope.
///
/// Returned by [`World::spawn_scoped`]. The guard borrows the world
/// mutably, so the world is only reachable through it while it lives. Call
/// [`release`](Self::release) to keep the entity past the guard.
///
/// ```rust
/// use quiver::{Component, World};
///
/// #[derive(Default)]
/// struct Marker;
/// impl Component for Marker {}
///
/// let mut world = World::new();
/// world.register_component::<Marker>()?;
/// {
///     let mut guard = world.spawn_scoped();
///     guard.add::<Marker>()?;
///     assert!(guard.has::<Marker>());
/// }
/// assert_eq!(world.entity_count(), 0);
/// # Ok::<(), quiver::WorldError>(())
/// ```
#[derive(Debug)]
pub struct EntityGuard<'w> {
    world: &'w mut World,
    entity: Entity,
    armed: bool,
}

impl<'w> EntityGuard<'w> {
    pub(crate) fn new(world: &'w mut World) -> Self {
        let entity = world.create_entity();
        Self {
            world,
            entity,
            armed: true,
        }
    }

    /// Returns the guarded entity.
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Attach a default `T`. See [`World::add_component`].
    ///
    /// # Errors
    ///
    /// As [`World::add_component`].
    pub fn add<T: Component + Default>(&mut self) -> Result<&mut Self, WorldError> {
        self.world.add_component::<T>(self.entity)?;
        Ok(self)
    }

    /// Attach `value`. See [`World::insert_component`].
    ///
    /// # Errors
    ///
    /// As [`World::insert_component`].
    pub fn insert<T: Component>(&mut self, value: T) -> Result<&mut Self, WorldError> {
        self.world.insert_component(self.entity, value)?;
        Ok(self)
    }

    /// Detach and return the entity's `T`.
    ///
    /// # Errors
    ///
    /// As [`World::remove_component`].
    pub fn remove<T: Component>(&mut self) -> Result<T, WorldError> {
        self.world.remove_component::<T>(self.entity)
    }

    /// # Errors
    ///
    /// As [`World::get_component`].
    pub fn get<T: Component>(&self) -> Result<&T, WorldError> {
        self.world.get_component::<T>(self.entity)
    }

    /// # Errors
    ///
    /// As [`World::get_component_mut`].
    pub fn get_mut<T: Component>(&mut self) -> Result<&mut T, WorldError> {
        self.world.get_component_mut::<T>(self.entity)
    }

    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.world.has_component::<T>(self.entity)
    }

    /// The world the entity lives in.
    #[must_use]
    pub fn world(&self) -> &World {
        self.world
    }

    /// The world, mutably. Destroying the guarded entity through it is
    /// allowed; the guard then has nothing left to clean up.
    pub fn world_mut(&mut self) -> &mut World {
        self.world
    }

    /// Disarm the guard and hand back the entity, which stays alive.
    #[must_use = "the released entity is no longer destroyed automatically"]
    pub fn release(mut self) -> Entity {
        self.armed = false;
        self.entity
    }
}

impl Drop for EntityGuard<'_> {
    fn drop(&mut self) {
        if !self.armed || !self.world.contains(self.entity) {
            return;
        }
        if let Err(err) = self.world.destroy_entity(self.entity) {
            warn!(entity = %self.entity, error = %err, "failed to destroy scoped entity");
        }
    }
}
