//! Query indices: standing subscriptions to a set of component types.
//!
//! A [`QueryIndex`] declares a required [`Signature`] and keeps the set of
//! entities whose signature contains it. The world updates that set on
//! every component add/remove and entity destruction that touches one of the
//! query's bits, then rebuilds the query's materialized list: one row per
//! member, holding the member's handle and the dense index of its value in
//! each required store. Reading matches walks those rows directly, with no
//! per-read lookups and no scan of the entity population.

use std::collections::BTreeSet;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::slice::{ChunksExact, Iter};

use serde::{Deserialize, Serialize};

use crate::component::{ComponentSet, ComponentType};
use crate::entity::Entity;
use crate::error::WorldError;
use crate::signature::{ComponentBit, Signature};
use crate::storage::{ErasedStore, StoreView};

/// Identifies one registered query within its world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryId(u32);

impl QueryId {
    pub(crate) fn from_index(index: usize) -> Self {
        // The world would run out of memory long before 2^32 queries.
        Self(index as u32)
    }

    /// Returns the query's position in registration order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Query({})", self.0)
    }
}

/// A [`QueryId`] that remembers the component tuple it was registered with,
/// so its matches can be read as typed references.
pub struct Query<Q> {
    id: QueryId,
    _marker: PhantomData<fn() -> Q>,
}

impl<Q> Query<Q> {
    pub(crate) fn new(id: QueryId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Returns the untyped id.
    #[must_use]
    pub fn id(self) -> QueryId {
        self.id
    }
}

impl<Q> Clone for Query<Q> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Q> Copy for Query<Q> {}

impl<Q> PartialEq for Query<Q> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<Q> Eq for Query<Q> {}

impl<Q> fmt::Debug for Query<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Query").field(&self.id.0).finish()
    }
}

/// Membership and materialized matches of one query.
#[derive(Debug)]
pub struct QueryIndex {
    id: QueryId,
    /// Required types, in declaration order.
    types: Vec<ComponentType>,
    /// `bits[i]` is the bit of `types[i]`.
    bits: Vec<ComponentBit>,
    signature: Signature,
    members: BTreeSet<Entity>,
    /// Materialized rows: `rows[r]` is a member and
    /// `slots[r * arity..][..arity]` its dense index in each required store.
    rows: Vec<Entity>,
    slots: Vec<usize>,
}

impl QueryIndex {
    pub(crate) fn new(id: QueryId, types: Vec<ComponentType>, bits: Vec<ComponentBit>) -> Self {
        let signature = bits.iter().copied().collect();
        Self {
            id,
            types,
            bits,
            signature,
            members: BTreeSet::new(),
            rows: Vec::new(),
            slots: Vec::new(),
        }
    }

    /// Returns this query's id.
    #[must_use]
    pub fn id(&self) -> QueryId {
        self.id
    }

    /// Returns the required component types, in declaration order.
    #[must_use]
    pub fn component_types(&self) -> &[ComponentType] {
        &self.types
    }

    /// Returns the bits this query subscribes to.
    #[must_use]
    pub fn bits(&self) -> &[ComponentBit] {
        &self.bits
    }

    /// Returns the OR of the required types' bits.
    #[must_use]
    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Returns `true` if an entity with `signature` belongs to this query.
    #[must_use]
    pub fn accepts(&self, signature: &Signature) -> bool {
        signature.contains(&self.signature)
    }

    /// Returns `true` if `entity` is a member.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.members.contains(&entity)
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the query has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The members in materialized order (ascending handle).
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.rows
    }

    pub(crate) fn insert(&mut self, entity: Entity) -> bool {
        self.members.insert(entity)
    }

    pub(crate) fn remove(&mut self, entity: Entity) -> bool {
        self.members.remove(&entity)
    }

    /// Rebuild the materialized rows from the current membership.
    ///
    /// # Errors
    ///
    /// [`WorldError::MissingComponent`] if a member has no value in one of
    /// the required stores, which means the world's bookkeeping is broken.
    pub(crate) fn materialize(&mut self, stores: &[Box<dyn ErasedStore>]) -> Result<(), WorldError> {
        self.rows.clear();
        self.slots.clear();
        self.rows.reserve(self.members.len());
        self.slots.reserve(self.members.len() * self.bits.len());

        for &entity in &self.members {
            for (&bit, ty) in self.bits.iter().zip(&self.types) {
                let slot = stores
                    .get(bit.index())
                    .and_then(|store| store.index_of(entity))
                    .ok_or(WorldError::MissingComponent {
                        entity,
                        component: ty.name(),
                    })?;
                self.slots.push(slot);
            }
            self.rows.push(entity);
        }
        Ok(())
    }

    /// Typed read view over the materialized rows. `None` if `Q` does not
    /// line up with the registered types.
    pub(crate) fn view<'w, Q: ComponentSet>(
        &'w self,
        stores: &'w [Box<dyn ErasedStore>],
    ) -> Option<Matches<'w, Q>> {
        if Q::ARITY != self.bits.len() {
            return None;
        }
        let stores = Q::stores(&StoreView::new(stores, &self.bits))?;
        Some(Matches {
            stores,
            rows: self.rows.iter(),
            slots: self.slots.chunks_exact(Q::ARITY),
        })
    }
}

/// Iterator over a query's materialized matches.
///
/// Yields `((&A, &B, ..), entity)` for every member, in ascending handle
/// order. It borrows the world, so no structural change can happen while it
/// is alive.
pub struct Matches<'w, Q: ComponentSet> {
    stores: Q::Stores<'w>,
    rows: Iter<'w, Entity>,
    slots: ChunksExact<'w, usize>,
}

impl<'w, Q: ComponentSet> Iterator for Matches<'w, Q> {
    type Item = (Q::Refs<'w>, Entity);

    fn next(&mut self) -> Option<Self::Item> {
        let entity = *self.rows.next()?;
        let slots = self.slots.next()?;
        Some((Q::fetch(self.stores, slots), entity))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<Q: ComponentSet> ExactSizeIterator for Matches<'_, Q> {}

impl<Q: ComponentSet> FusedIterator for Matches<'_, Q> {}

impl<Q: ComponentSet> fmt::Debug for Matches<'_, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matches")
            .field("remaining", &self.rows.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::storage::ComponentStore;

    #[derive(Debug, Default, PartialEq)]
    struct Position {
        x: f32,
    }
    impl Component for Position {}

    #[derive(Debug, Default, PartialEq)]
    struct Velocity {
        x: f32,
    }
    impl Component for Velocity {}

    fn entity(id: u64) -> Entity {
        Entity::from_raw(id).unwrap()
    }

    fn bit(index: usize) -> ComponentBit {
        ComponentBit::new(index).unwrap()
    }

    fn stores() -> Vec<Box<dyn ErasedStore>> {
        let mut positions = ComponentStore::<Position>::new();
        let mut velocities = ComponentStore::<Velocity>::new();
        for id in 1..=3 {
            positions.insert(entity(id), Position { x: id as f32 }).unwrap();
        }
        // Inserted in reverse so dense indices differ between the stores.
        for id in (2..=3).rev() {
            velocities
                .insert(entity(id), Velocity { x: 10.0 * id as f32 })
                .unwrap();
        }
        vec![Box::new(positions), Box::new(velocities)]
    }

    fn moving_query() -> QueryIndex {
        QueryIndex::new(
            QueryId::from_index(0),
            <(Position, Velocity)>::component_types(),
            vec![bit(0), bit(1)],
        )
    }

    #[test]
    fn test_signature_is_union_of_bits() {
        let query = moving_query();
        assert!(query.signature().test(bit(0)));
        assert!(query.signature().test(bit(1)));
        assert_eq!(query.signature().count(), 2);
        assert!(query.accepts(&query.signature()));
        assert!(!query.accepts(&Signature::from_bit(bit(0))));
    }

    #[test]
    fn test_materialize_resolves_each_store() {
        let stores = stores();
        let mut query = moving_query();
        query.insert(entity(3));
        query.insert(entity(2));
        query.materialize(&stores).unwrap();

        assert_eq!(query.entities(), &[entity(2), entity(3)]);
        let rows: Vec<(f32, f32, u64)> = query
            .view::<(Position, Velocity)>(&stores)
            .unwrap()
            .map(|((p, v), e)| (p.x, v.x, e.to_raw()))
            .collect();
        assert_eq!(rows, vec![(2.0, 20.0, 2), (3.0, 30.0, 3)]);
    }

    #[test]
    fn test_materialize_reports_missing_value() {
        let stores = stores();
        let mut query = moving_query();
        // Entity 1 has no velocity.
        query.insert(entity(1));
        let err = query.materialize(&stores).unwrap_err();
        assert!(matches!(err, WorldError::MissingComponent { .. }));
    }

    #[test]
    fn test_view_rejects_mismatched_set() {
        let stores = stores();
        let query = moving_query();
        assert!(query.view::<(Velocity, Position)>(&stores).is_none());
        assert!(query.view::<(Position,)>(&stores).is_none());
        assert!(query.view::<(Position, Velocity)>(&stores).is_some());
    }

    #[test]
    fn test_matches_is_exact_size() {
        let stores = stores();
        let mut query = moving_query();
        query.insert(entity(2));
        query.insert(entity(3));
        query.materialize(&stores).unwrap();
        let mut matches = query.view::<(Position, Velocity)>(&stores).unwrap();
        assert_eq!(matches.len(), 2);
        matches.next();
        assert_eq!(matches.len(), 1);
    }
}
