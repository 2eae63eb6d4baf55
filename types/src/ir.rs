//! Intermediate Representation (IR) for interface types.
//!
//! ## Structure
//!
//! - **Core types**: `TypeKind`, `TypeId`, `TyData` - the logical structure of types
//! - **TypeManager**: arena that owns, interns and links type nodes
//! - **Visitor**: single-dispatch `TypeVisitor` with fallback chains
//! - **Display**: canonical signatures through the `TypeFormatter` visitor
//! - **Analysis**: productivity ranks and closedness checks

pub mod analysis;
pub mod display;
pub mod label;
pub mod manager;
pub mod ty;
pub mod visit;

pub use analysis::Ranks;
pub use display::TypeFormatter;
pub use label::label_hash;
pub use manager::TypeManager;
pub use ty::{Field, FuncModes, FuncType, Method, TyData, TypeFlags, TypeId, TypeKind, Width};
pub use visit::TypeVisitor;
