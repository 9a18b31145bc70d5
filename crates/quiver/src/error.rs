//! Registry error types.

use crate::entity::Entity;
use crate::query::QueryId;

/// Registration-time errors: capacity and declaration mistakes.
///
/// These describe a misconfigured world. They leave the world unchanged but
/// are not expected to be recovered from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Every available signature bit is already assigned.
    #[error("cannot register `{name}`: all {limit} component bits are assigned")]
    TooManyComponentTypes {
        /// The type that did not fit.
        name: &'static str,
        /// The configured maximum number of component types.
        limit: usize,
    },

    /// The component type already owns a bit.
    #[error("component type `{name}` is already registered")]
    AlreadyRegistered {
        /// The duplicated type.
        name: &'static str,
    },

    /// The component type was never registered with this world.
    #[error("component type `{name}` is not registered")]
    UnregisteredComponent {
        /// The unknown type.
        name: &'static str,
    },

    /// A query was declared with no component types.
    #[error("a query must require at least one component type")]
    EmptyQuery,

    /// A query listed the same component type twice.
    #[error("query lists component type `{name}` more than once")]
    DuplicateQueryType {
        /// The repeated type.
        name: &'static str,
    },

    /// The configured type limit is wider than the compiled signature.
    #[error("{requested} component types requested but signatures hold {width} bits")]
    CapacityExceedsSignature {
        /// The requested limit.
        requested: usize,
        /// [`SIGNATURE_BITS`](crate::SIGNATURE_BITS).
        width: usize,
    },
}

/// Errors returned by [`World`](crate::World) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// A registration or declaration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The entity already has a component of this type.
    #[error("{entity} already has a `{component}` component")]
    DuplicateComponent {
        /// The entity.
        entity: Entity,
        /// The component type's name.
        component: &'static str,
    },

    /// The entity has no component of this type.
    #[error("{entity} has no `{component}` component")]
    MissingComponent {
        /// The entity.
        entity: Entity,
        /// The component type's name.
        component: &'static str,
    },

    /// The handle does not name a live entity of this world.
    #[error("{0} does not exist")]
    EntityNotFound(Entity),

    /// The query id was not issued by this world.
    #[error("{0} is not registered with this world")]
    QueryNotFound(QueryId),

    /// A typed query handle does not match the component types its id was
    /// registered with.
    #[error("{0} was registered with different component types")]
    QueryTypeMismatch(QueryId),
}
