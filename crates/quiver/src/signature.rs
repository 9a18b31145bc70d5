//! Component signatures.
//!
//! A [`Signature`] is a fixed-width bitset. Bit *i* stands for the component
//! type that was assigned [`ComponentBit`] *i* at registration. The same type
//! describes both what an entity owns and what a query requires; an entity
//! satisfies a query when its signature [`contains`](Signature::contains) the
//! query's.
//!
//! The width is fixed at build time. It is 64 bits unless the
//! `signature-128` or `signature-256` feature is enabled.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

#[cfg(feature = "signature-256")]
const WORDS: usize = 4;
#[cfg(all(feature = "signature-128", not(feature = "signature-256")))]
const WORDS: usize = 2;
#[cfg(not(any(feature = "signature-128", feature = "signature-256")))]
const WORDS: usize = 1;

/// Number of bits in a [`Signature`], i.e. the maximum number of distinct
/// component types a world can register.
pub const SIGNATURE_BITS: usize = WORDS * 64;

/// The bit position permanently assigned to one registered component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentBit(u16);

impl ComponentBit {
    /// Create a bit from its index, or `None` if it does not fit in a
    /// [`Signature`].
    #[must_use]
    pub const fn new(index: usize) -> Option<Self> {
        if index < SIGNATURE_BITS {
            Some(Self(index as u16))
        } else {
            None
        }
    }

    /// Returns the bit index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    const fn word(self) -> usize {
        self.index() / 64
    }

    const fn mask(self) -> u64 {
        1 << (self.index() % 64)
    }
}

impl fmt::Display for ComponentBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bit {}", self.0)
    }
}

/// A fixed-width set of component types.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature([u64; WORDS]);

impl Signature {
    /// The signature with no bits set.
    pub const EMPTY: Signature = Signature([0; WORDS]);

    /// Create an empty signature.
    #[must_use]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Create a signature with exactly one bit set.
    #[must_use]
    pub fn from_bit(bit: ComponentBit) -> Self {
        let mut signature = Self::EMPTY;
        signature.set(bit);
        signature
    }

    /// Set `bit`.
    pub fn set(&mut self, bit: ComponentBit) {
        self.0[bit.word()] |= bit.mask();
    }

    /// Clear `bit`.
    pub fn clear(&mut self, bit: ComponentBit) {
        self.0[bit.word()] &= !bit.mask();
    }

    /// Returns `true` if `bit` is set.
    #[must_use]
    pub fn test(&self, bit: ComponentBit) -> bool {
        self.0[bit.word()] & bit.mask() != 0
    }

    /// Returns `true` if every bit of `required` is also set in `self`:
    /// `(self & required) == required`.
    #[must_use]
    pub fn contains(&self, required: &Signature) -> bool {
        self.0
            .iter()
            .zip(required.0.iter())
            .all(|(have, need)| have & need == *need)
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&word| word == 0)
    }

    /// Returns the number of set bits.
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Iterate over the set bits in ascending order.
    #[must_use]
    pub fn bits(&self) -> Bits {
        Bits {
            words: self.0,
            word: 0,
        }
    }
}

impl BitOr for Signature {
    type Output = Signature;

    fn bitor(mut self, rhs: Signature) -> Signature {
        self |= rhs;
        self
    }
}

impl BitOrAssign for Signature {
    fn bitor_assign(&mut self, rhs: Signature) {
        for (lhs, rhs) in self.0.iter_mut().zip(rhs.0) {
            *lhs |= rhs;
        }
    }
}

impl BitAnd for Signature {
    type Output = Signature;

    fn bitand(mut self, rhs: Signature) -> Signature {
        for (lhs, rhs) in self.0.iter_mut().zip(rhs.0) {
            *lhs &= rhs;
        }
        self
    }
}

impl FromIterator<ComponentBit> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentBit>>(iter: I) -> Self {
        let mut signature = Signature::EMPTY;
        for bit in iter {
            signature.set(bit);
        }
        signature
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.bits().map(ComponentBit::index))
            .finish()
    }
}

/// Iterator over the set bits of a [`Signature`], lowest first.
#[derive(Debug, Clone)]
pub struct Bits {
    words: [u64; WORDS],
    word: usize,
}

impl Iterator for Bits {
    type Item = ComponentBit;

    fn next(&mut self) -> Option<ComponentBit> {
        while self.word < WORDS {
            let bits = self.words[self.word];
            if bits != 0 {
                let offset = bits.trailing_zeros() as usize;
                // Clear the lowest set bit.
                self.words[self.word] = bits & (bits - 1);
                return ComponentBit::new(self.word * 64 + offset);
            }
            self.word += 1;
        }
        None
    }
}
