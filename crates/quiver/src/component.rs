//! Core [`Component`] trait and runtime type tokens.
//!
//! Every piece of data stored in a [`World`](crate::World) implements
//! [`Component`]. At runtime a component type is named by a
//! [`ComponentType`] token, which is what the signature registry assigns a
//! bit to and what a query is declared from. [`ComponentSet`] is the typed
//! counterpart for tuples of component types and gives queries their typed
//! read view.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::storage::{ComponentStore, ErasedStore, StoreView};

/// The component trait.
///
/// Components are plain data. The trait only requires `'static` so the type
/// can be identified by [`TypeId`].
///
/// # Examples
///
/// ```rust
/// use quiver::Component;
///
/// #[derive(Debug, Default)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {}
/// ```
pub trait Component: Sized + 'static {
    /// A human-readable name for this component type, used in errors and
    /// log output. Defaults to the Rust type path.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A runtime token naming one component type.
///
/// Two tokens are equal when they name the same Rust type. The token also
/// knows how to build an empty store for its type, which lets the world
/// register types from a runtime list.
#[derive(Clone, Copy)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
    new_store: fn(usize) -> Box<dyn ErasedStore>,
}

impl ComponentType {
    /// Returns the token for `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::type_name(),
            new_store: new_store_of::<T>,
        }
    }

    /// Returns the underlying [`TypeId`].
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Returns the component's name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn new_store(&self, capacity: usize) -> Box<dyn ErasedStore> {
        (self.new_store)(capacity)
    }
}

fn new_store_of<T: Component>(capacity: usize) -> Box<dyn ErasedStore> {
    Box::new(ComponentStore::<T>::with_capacity(capacity))
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentType {}

impl Hash for ComponentType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentType").field(&self.name).finish()
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// An ordered tuple of component types, `(A,)` through
/// `(A, B, C, D, E, F, G, H)`.
///
/// Used to register several component types at once and to declare a
/// query whose matches are read as `(&A, &B, ..)` tuples.
pub trait ComponentSet: 'static {
    /// Number of component types in the set.
    const ARITY: usize;

    /// One shared reference per component type, in declaration order.
    type Refs<'w>;

    /// The resolved typed stores a [`Matches`](crate::Matches) iterator
    /// reads from.
    #[doc(hidden)]
    type Stores<'w>: Copy;

    /// Returns the runtime tokens, in declaration order.
    fn component_types() -> Vec<ComponentType>;

    /// Resolve the typed stores for a query's bits. `None` when a store's
    /// type does not line up with the set.
    #[doc(hidden)]
    fn stores<'w>(view: &StoreView<'w>) -> Option<Self::Stores<'w>>;

    /// Read one materialized row. `slots[i]` is the dense index of the
    /// row's entity in the store for component `i`.
    #[doc(hidden)]
    fn fetch<'w>(stores: Self::Stores<'w>, slots: &[usize]) -> Self::Refs<'w>;
}

macro_rules! impl_component_set {
    ($arity:literal; $(($ty:ident, $idx:tt)),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            const ARITY: usize = $arity;

            type Refs<'w> = ($(&'w $ty,)+);
            type Stores<'w> = ($(&'w ComponentStore<$ty>,)+);

            fn component_types() -> Vec<ComponentType> {
                vec![$(ComponentType::of::<$ty>()),+]
            }

            fn stores<'w>(view: &StoreView<'w>) -> Option<Self::Stores<'w>> {
                Some(($(view.typed::<$ty>($idx)?,)+))
            }

            fn fetch<'w>(stores: Self::Stores<'w>, slots: &[usize]) -> Self::Refs<'w> {
                ($(&stores.$idx.values()[slots[$idx]],)+)
            }
        }
    };
}

impl_component_set!(1; (A, 0));
impl_component_set!(2; (A, 0), (B, 1));
impl_component_set!(3; (A, 0), (B, 1), (C, 2));
impl_component_set!(4; (A, 0), (B, 1), (C, 2), (D, 3));
impl_component_set!(5; (A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_component_set!(6; (A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));
impl_component_set!(7; (A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6));
impl_component_set!(8; (A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7));
