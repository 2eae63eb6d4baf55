use crate::TypeId;
use alloc::string::String;

/// Errors raised while building or traversing a type graph.
///
/// These indicate a malformed interface rather than bad user input, so
/// callers generally surface them as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("duplicate field `{name}`")]
    DuplicateField { name: String },

    #[error("method `{name}` is not a function type")]
    NotAFunction { name: String },

    #[error("recursive type {knot} was used before being filled")]
    UnresolvedRecursion { knot: TypeId },

    #[error("recursive type {knot} is already filled")]
    KnotAlreadyFilled { knot: TypeId },

    #[error("{ty} is not a recursive placeholder")]
    NotAKnot { ty: TypeId },

    #[error("recursive type {knot} has no finite values")]
    NonProductiveRecursion { knot: TypeId },

    #[error("type {ty} has no values")]
    Uninhabited { ty: TypeId },
}
