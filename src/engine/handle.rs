//! Generation-tagged handles.
//!
//! A handle packs `(generation, id)` into a single `u64`: the id occupies the
//! low `ID_BITS`, the generation the `GENERATION_BITS` above it. The all-zero
//! value is the null handle. Live slots always carry a generation of at least
//! 1, so a successful creation never produces it.
//!
//! Each handle is typed by a [`HandleKind`] marker, which fixes the bit
//! layout and keeps e.g. animation handles from being passed to a text layer.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

// =============================================================================
// Kinds
// =============================================================================

/// Bit layout of one family of handles.
///
/// Both widths must be in `1..=31`.
pub trait HandleKind: 'static {
    /// Width of the id field.
    const ID_BITS: u32;
    /// Width of the generation field.
    const GENERATION_BITS: u32;
    /// Name used in `Debug` output.
    const NAME: &'static str;

    /// Number of distinct ids.
    const ID_CAPACITY: u32 = 1 << Self::ID_BITS;
    /// Largest generation a slot can reach before it is retired.
    const GENERATION_MAX: u32 = (1 << Self::GENERATION_BITS) - 1;
}

/// Kind of handles referencing nodes owned by the external node tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {}

impl HandleKind for NodeKind {
    const ID_BITS: u32 = 20;
    const GENERATION_BITS: u32 = 12;
    const NAME: &'static str = "NodeHandle";
}

/// Kind of handles referencing data items of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {}

impl HandleKind for DataKind {
    const ID_BITS: u32 = 20;
    const GENERATION_BITS: u32 = 12;
    const NAME: &'static str = "DataHandle";
}

/// Kind of handles referencing animations of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationKind {}

impl HandleKind for AnimationKind {
    const ID_BITS: u32 = 20;
    const GENERATION_BITS: u32 = 12;
    const NAME: &'static str = "AnimationHandle";
}

pub type NodeHandle = Handle<NodeKind>;
pub type DataHandle = Handle<DataKind>;
pub type AnimationHandle = Handle<AnimationKind>;

// =============================================================================
// Handle
// =============================================================================

/// Opaque `(id, generation)` pair.
pub struct Handle<K> {
    raw: u64,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind> Handle<K> {
    /// The null handle. Never valid in any pool.
    pub const NULL: Self = Self {
        raw: 0,
        _kind: PhantomData,
    };

    const LAYOUT_OK: () = assert!(
        K::ID_BITS >= 1 && K::ID_BITS <= 31 && K::GENERATION_BITS >= 1 && K::GENERATION_BITS <= 31,
        "handle id and generation widths must be in 1..=31"
    );

    /// Pack an id and generation.
    pub fn new(id: u32, generation: u32) -> Self {
        let () = Self::LAYOUT_OK;
        assert!(
            id < K::ID_CAPACITY && generation <= K::GENERATION_MAX,
            "Handle::new(): {{{id:#x}, {generation:#x}}} doesn't fit into {} id and {} generation bits",
            K::ID_BITS,
            K::GENERATION_BITS
        );
        Self {
            raw: (u64::from(generation) << K::ID_BITS) | u64::from(id),
            _kind: PhantomData,
        }
    }

    /// Reinterpret a packed value, e.g. one stored by external code.
    pub fn from_raw(raw: u64) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    /// The packed value.
    pub fn raw(self) -> u64 {
        self.raw
    }

    pub fn id(self) -> u32 {
        (self.raw & u64::from(K::ID_CAPACITY - 1)) as u32
    }

    pub fn generation(self) -> u32 {
        ((self.raw >> K::ID_BITS) & u64::from(K::GENERATION_MAX)) as u32
    }

    pub fn is_null(self) -> bool {
        self.raw == 0
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K> Eq for Handle<K> {}

impl<K> PartialOrd for Handle<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Handle<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K: HandleKind> Default for Handle<K> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "{}::Null", K::NAME);
        }
        write!(f, "{}({:#x}, {:#x})", K::NAME, self.id(), self.generation())
    }
}

impl<K: HandleKind> fmt::Display for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("Null");
        }
        write!(f, "{{{:#x}, {:#x}}}", self.id(), self.generation())
    }
}
