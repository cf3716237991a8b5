use core::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// A contributing party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    /// The first party.
    Alice,
    /// The second party.
    Bob,
}

impl Party {
    /// Returns the index of the party, `0` for Alice and `1` for Bob.
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Party::Alice => 0,
            Party::Bob => 1,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Alice => write!(f, "Alice"),
            Party::Bob => write!(f, "Bob"),
        }
    }
}

/// Pointer to a value in the computation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ptr(usize);

impl Ptr {
    /// Creates a new pointer.
    ///
    /// Do not use this unless you are implementing a provider, a pointer which
    /// was not handed out by the provider is meaningless.
    #[inline]
    pub fn new(ptr: usize) -> Self {
        Self(ptr)
    }

    /// Returns the pointer as a `usize`.
    #[inline]
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Ptr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Value kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KindTag {
    /// Integer.
    Int,
    /// Fixed-point number.
    Fixed,
}

/// A plaintext value crossing the provider boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Plain {
    /// Integer value.
    Int(i64),
    /// Fixed-point value.
    Fixed(f64),
}

impl Plain {
    /// Returns the kind of the value.
    pub fn kind(&self) -> KindTag {
        match self {
            Plain::Int(_) => KindTag::Int,
            Plain::Fixed(_) => KindTag::Fixed,
        }
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Int {}
    impl Sealed for super::Fixed {}
}

/// Kind of a secret value.
pub trait Kind: sealed::Sealed + Copy + fmt::Debug + 'static {
    /// Clear type.
    type Clear: Copy + PartialOrd + fmt::Debug + Send + 'static;

    /// Kind tag.
    const TAG: KindTag;

    /// Additive identity.
    const ZERO: Self::Clear;

    /// Converts a clear value into a plain value.
    fn into_plain(value: Self::Clear) -> Plain;

    /// Converts a plain value into a clear value.
    fn from_plain(value: Plain) -> Self::Clear;
}

/// Integer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Int;

impl Kind for Int {
    type Clear = i64;

    const TAG: KindTag = KindTag::Int;
    const ZERO: i64 = 0;

    fn into_plain(value: i64) -> Plain {
        Plain::Int(value)
    }

    fn from_plain(value: Plain) -> i64 {
        match value {
            Plain::Int(value) => value,
            Plain::Fixed(value) => value.round() as i64,
        }
    }
}

/// Fixed-point kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixed;

impl Kind for Fixed {
    type Clear = f64;

    const TAG: KindTag = KindTag::Fixed;
    const ZERO: f64 = 0.0;

    fn into_plain(value: f64) -> Plain {
        Plain::Fixed(value)
    }

    fn from_plain(value: Plain) -> f64 {
        match value {
            Plain::Int(value) => value as f64,
            Plain::Fixed(value) => value,
        }
    }
}

/// A handle to a secret-shared value of kind `K`.
///
/// The handle is a deferred result: the value it refers to is materialized
/// only when the provider executes.
pub struct Secret<K> {
    ptr: Ptr,
    _pd: PhantomData<K>,
}

impl<K> Secret<K> {
    /// Creates a new handle from a raw pointer.
    #[inline]
    pub fn from_raw(ptr: Ptr) -> Self {
        Self {
            ptr,
            _pd: PhantomData,
        }
    }

    /// Returns the raw pointer.
    #[inline]
    pub fn to_raw(&self) -> Ptr {
        self.ptr
    }
}

impl<K> Clone for Secret<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Secret<K> {}

impl<K> PartialEq for Secret<K> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<K> Eq for Secret<K> {}

impl<K: Kind> fmt::Debug for Secret<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret<{:?}>({})", K::TAG, self.ptr)
    }
}

/// A secret integer.
pub type SInt = Secret<Int>;
/// A secret fixed-point number.
pub type SFixed = Secret<Fixed>;
