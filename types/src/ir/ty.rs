use super::TypeManager;
use alloc::{string::String, vec::Vec};
use core::fmt;

use bitflags::bitflags;

/// Handle to a type node owned by a [`TypeManager`].
///
/// Ids are stamped in construction order and never reused, so they double as
/// the identity of a type for the type table and for recursion tracking.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// Position of the node in its manager's arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

bitflags! {
    /// Flags indicating various properties of a type.
    ///
    /// These flags are computed once when a type is interned and cached
    /// for efficient queries. This avoids repeated recursive traversals.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct TypeFlags: u16 {
        /// A recursive placeholder is reachable from this type.
        const HAS_KNOT = 1;
        /// A principal, function or service reference is reachable.
        const HAS_REFERENCE = 1 << 1;
    }
}

bitflags! {
    /// Function annotations.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct FuncModes: u8 {
        const QUERY = 1;
        const ONEWAY = 1 << 1;
    }
}

/// Bit width of a fixed-size integer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
}

impl Width {
    pub const ALL: [Width; 4] = [Width::W8, Width::W16, Width::W32, Width::W64];

    pub fn bits(self) -> u32 {
        match self {
            Width::W8 => 8,
            Width::W16 => 16,
            Width::W32 => 32,
            Width::W64 => 64,
        }
    }

    pub fn bytes(self) -> usize {
        (self.bits() / 8) as usize
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.bits() == bits)
    }
}

/// A named member of a record or variant.
///
/// `hash` is the wire label of the field; see [`crate::label_hash`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub hash: u32,
    pub ty: TypeId,
}

/// A named method of a service. `ty` always resolves to a function type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Method {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FuncType {
    pub args: Vec<TypeId>,
    pub rets: Vec<TypeId>,
    pub modes: FuncModes,
}

impl FuncType {
    pub fn is_query(&self) -> bool {
        self.modes.contains(FuncModes::QUERY)
    }

    pub fn is_oneway(&self) -> bool {
        self.modes.contains(FuncModes::ONEWAY)
    }
}

/// Data for a type: kind + cached flags.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TyData {
    /// The actual type structure
    pub kind: TypeKind,

    /// Cached properties for efficient queries
    pub flags: TypeFlags,
}

/// Logical structure of a type.
///
/// Children are referenced by [`TypeId`], so recursive types are expressed
/// with a [`TypeKind::Knot`] node that is filled after its target exists.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    // Primitives.
    Null,
    Bool,
    Text,
    Principal,
    Float64,
    /// Uninhabited type.
    Empty,

    // Numbers.
    Int,
    Nat,
    FixedInt(Width),
    FixedNat(Width),

    // Constructors.
    Opt(TypeId),
    Vec(TypeId),
    Record(Vec<Field>),  // Sorted by (hash, name).
    Variant(Vec<Field>), // Sorted by (hash, name).

    // References.
    Func(FuncType),
    Service(Vec<Method>), // Sorted by name.

    /// Recursive placeholder, `None` until filled.
    Knot(Option<TypeId>),
}

impl TypeKind {
    /// Compute type flags for this type kind.
    ///
    /// Called when the node is allocated; children must already exist.
    pub fn compute_flags(&self, mgr: &TypeManager) -> TypeFlags {
        match self {
            TypeKind::Null
            | TypeKind::Bool
            | TypeKind::Text
            | TypeKind::Float64
            | TypeKind::Empty
            | TypeKind::Int
            | TypeKind::Nat
            | TypeKind::FixedInt(_)
            | TypeKind::FixedNat(_) => TypeFlags::empty(),

            TypeKind::Principal => TypeFlags::HAS_REFERENCE,

            TypeKind::Opt(inner) | TypeKind::Vec(inner) => mgr.flags(*inner),

            TypeKind::Record(fields) | TypeKind::Variant(fields) => fields
                .iter()
                .fold(TypeFlags::empty(), |acc, f| acc | mgr.flags(f.ty)),

            TypeKind::Func(func) => func
                .args
                .iter()
                .chain(func.rets.iter())
                .fold(TypeFlags::HAS_REFERENCE, |acc, t| acc | mgr.flags(*t)),

            TypeKind::Service(methods) => methods
                .iter()
                .fold(TypeFlags::HAS_REFERENCE, |acc, m| acc | mgr.flags(m.ty)),

            TypeKind::Knot(_) => TypeFlags::HAS_KNOT,
        }
    }

    /// Returns true for kinds that never reference other types.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeKind::Null
                | TypeKind::Bool
                | TypeKind::Text
                | TypeKind::Principal
                | TypeKind::Float64
                | TypeKind::Empty
                | TypeKind::Int
                | TypeKind::Nat
                | TypeKind::FixedInt(_)
                | TypeKind::FixedNat(_)
        )
    }

    pub fn is_knot(&self) -> bool {
        matches!(self, TypeKind::Knot(_))
    }
}

impl TypeFlags {
    pub fn has_knot(self) -> bool {
        self.contains(TypeFlags::HAS_KNOT)
    }

    pub fn has_reference(self) -> bool {
        self.contains(TypeFlags::HAS_REFERENCE)
    }
}
