//! Type algebra for interface descriptions.
//!
//! Types live in a [`TypeManager`] arena and are addressed by [`TypeId`].
//! Recursive types are tied with knots: a placeholder reserved by
//! [`TypeManager::rec`] and filled once its target exists.
//!
//! # Example
//!
//! ```
//! use knot_types::{FuncModes, TypeManager};
//!
//! let mut mgr = TypeManager::new();
//! let text = mgr.text();
//! let nat = mgr.nat();
//! let opt = mgr.opt(nat);
//! let greet = mgr.func([text, opt], [text], FuncModes::QUERY);
//!
//! assert_eq!(mgr.display(greet), "func (text, opt nat) → (text) query");
//! ```

#![no_std]
extern crate alloc;

mod error;

// Intermediate Representation - type graph and algorithms over it
pub mod ir;

pub use error::TypeError;

// Re-export IR types for convenience
pub use ir::{
    Field, FuncModes, FuncType, Method, Ranks, TyData, TypeFlags, TypeFormatter, TypeId, TypeKind,
    TypeManager, TypeVisitor, Width, label_hash,
};
