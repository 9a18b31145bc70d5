//! Signature registry: the permanent mapping from component type to bit.
//!
//! Bits are handed out in registration order starting at 0 and are never
//! reassigned, so a signature stays meaningful for the world's whole
//! lifetime.

use std::collections::HashMap;

use crate::component::{Component, ComponentType};
use crate::error::ConfigError;
use crate::signature::{ComponentBit, SIGNATURE_BITS, Signature};

/// Assigns every registered component type a unique signature bit.
#[derive(Debug)]
pub struct SignatureRegistry {
    /// Bit of each registered type.
    bits: HashMap<ComponentType, ComponentBit>,
    /// Registered types in bit order: `types[b]` owns bit `b`.
    types: Vec<ComponentType>,
    /// Maximum number of types this registry accepts.
    limit: usize,
}

impl SignatureRegistry {
    /// Create a registry accepting up to `limit` component types.
    ///
    /// # Errors
    ///
    /// [`ConfigError::CapacityExceedsSignature`] if `limit` is larger than
    /// [`SIGNATURE_BITS`].
    pub fn new(limit: usize) -> Result<Self, ConfigError> {
        if limit > SIGNATURE_BITS {
            return Err(ConfigError::CapacityExceedsSignature {
                requested: limit,
                width: SIGNATURE_BITS,
            });
        }
        Ok(Self {
            limit,
            ..Self::with_full_width()
        })
    }

    /// Create a registry accepting one type per signature bit.
    #[must_use]
    pub fn with_full_width() -> Self {
        Self {
            bits: HashMap::new(),
            types: Vec::new(),
            limit: SIGNATURE_BITS,
        }
    }

    /// Assign `ty` the next unused bit.
    ///
    /// # Errors
    ///
    /// [`ConfigError::AlreadyRegistered`] if `ty` already owns a bit, or
    /// [`ConfigError::TooManyComponentTypes`] if every bit is taken. Either
    /// way the existing assignments are untouched.
    pub fn register(&mut self, ty: ComponentType) -> Result<ComponentBit, ConfigError> {
        if self.bits.contains_key(&ty) {
            return Err(ConfigError::AlreadyRegistered { name: ty.name() });
        }
        let overflow = ConfigError::TooManyComponentTypes {
            name: ty.name(),
            limit: self.limit,
        };
        if self.types.len() >= self.limit {
            return Err(overflow);
        }
        let bit = ComponentBit::new(self.types.len()).ok_or(overflow)?;
        self.bits.insert(ty, bit);
        self.types.push(ty);
        Ok(bit)
    }

    /// Returns the bit assigned to `ty`.
    #[must_use]
    pub fn bit_of(&self, ty: ComponentType) -> Option<ComponentBit> {
        self.bits.get(&ty).copied()
    }

    /// Returns the bit assigned to `T`.
    #[must_use]
    pub fn bit_of_type<T: Component>(&self) -> Option<ComponentBit> {
        self.bit_of(ComponentType::of::<T>())
    }

    /// Like [`bit_of`](Self::bit_of), but an unknown type is an error.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnregisteredComponent`] if `ty` has no bit.
    pub fn require(&self, ty: ComponentType) -> Result<ComponentBit, ConfigError> {
        self.bit_of(ty)
            .ok_or(ConfigError::UnregisteredComponent { name: ty.name() })
    }

    /// Returns the union of the bits of `types`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnregisteredComponent`] for the first unknown type.
    pub fn signature_of(&self, types: &[ComponentType]) -> Result<Signature, ConfigError> {
        types.iter().map(|&ty| self.require(ty)).collect()
    }

    /// Returns the type that owns `bit`.
    #[must_use]
    pub fn type_at(&self, bit: ComponentBit) -> Option<ComponentType> {
        self.types.get(bit.index()).copied()
    }

    /// Iterate over registered types and their bits, in bit order.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentType, ComponentBit)> + '_ {
        self.types
            .iter()
            .enumerate()
            .filter_map(|(index, &ty)| Some((ty, ComponentBit::new(index)?)))
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns the maximum number of types.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.limit
    }
}
