//! Type table: the serialized index of compound types.
//!
//! Compound types (option, vector, record, variant, function, service) get a
//! slot in insertion order; primitives are referenced inline by negative
//! opcodes. Slots hold symbolic shapes whose children are [`TypeRef`]s, and
//! those references only become slot indices in [`TypeTable::encode`], so
//! merging a knot never has to rewrite earlier shapes.

use crate::leb128::{BufferType, write_bytes, write_sleb, write_uleb};
use hashbrown::HashMap;
use knot_types::{
    Field, FuncModes, FuncType, Method, TypeError, TypeId, TypeKind, TypeManager, TypeVisitor,
    Width,
};
use tracing::{debug, trace};

/// Wire opcodes.
pub mod opcode {
    pub const NULL: i64 = -1;
    pub const BOOL: i64 = -2;
    pub const NAT: i64 = -3;
    pub const INT: i64 = -4;
    pub const NAT8: i64 = -5;
    pub const NAT16: i64 = -6;
    pub const NAT32: i64 = -7;
    pub const NAT64: i64 = -8;
    pub const INT8: i64 = -9;
    pub const INT16: i64 = -10;
    pub const INT32: i64 = -11;
    pub const INT64: i64 = -12;
    pub const FLOAT64: i64 = -14;
    pub const TEXT: i64 = -15;
    pub const EMPTY: i64 = -17;
    pub const OPT: i64 = -18;
    pub const VEC: i64 = -19;
    pub const RECORD: i64 = -20;
    pub const VARIANT: i64 = -21;
    pub const FUNC: i64 = -22;
    pub const SERVICE: i64 = -23;
    pub const PRINCIPAL: i64 = -24;

    /// Annotation bytes of a function type.
    pub const QUERY: u8 = 1;
    pub const ONEWAY: u8 = 2;
}

/// Opcode of a primitive kind, `None` for compound kinds and knots.
pub fn primitive_opcode(kind: &TypeKind) -> Option<i64> {
    let op = match kind {
        TypeKind::Null => opcode::NULL,
        TypeKind::Bool => opcode::BOOL,
        TypeKind::Nat => opcode::NAT,
        TypeKind::Int => opcode::INT,
        TypeKind::FixedNat(width) => match width {
            Width::W8 => opcode::NAT8,
            Width::W16 => opcode::NAT16,
            Width::W32 => opcode::NAT32,
            Width::W64 => opcode::NAT64,
        },
        TypeKind::FixedInt(width) => match width {
            Width::W8 => opcode::INT8,
            Width::W16 => opcode::INT16,
            Width::W32 => opcode::INT32,
            Width::W64 => opcode::INT64,
        },
        TypeKind::Float64 => opcode::FLOAT64,
        TypeKind::Text => opcode::TEXT,
        TypeKind::Empty => opcode::EMPTY,
        TypeKind::Principal => opcode::PRINCIPAL,
        _ => return None,
    };
    Some(op)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("type {ty} is already registered in the type table")]
    DuplicateType { ty: TypeId },

    #[error("type {ty} is not registered in the type table")]
    UnknownType { ty: TypeId },

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Reference to a type from inside a shape or an argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Inline primitive, by opcode.
    Prim(i64),
    /// Compound type, resolved to its slot when encoding.
    Type(TypeId),
}

/// Symbolic content of a table slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Reserved for a knot until its target is merged in.
    Placeholder,
    Opt(TypeRef),
    Vec(TypeRef),
    Record(Vec<(u32, TypeRef)>),
    Variant(Vec<(u32, TypeRef)>),
    Func {
        args: Vec<TypeRef>,
        rets: Vec<TypeRef>,
        modes: FuncModes,
    },
    Service(Vec<(String, TypeRef)>),
}

#[derive(Debug, Clone)]
struct Slot {
    owner: TypeId,
    shape: Shape,
}

#[derive(Debug, Default)]
pub struct TypeTable {
    slots: Vec<Slot>,
    index: HashMap<TypeId, usize>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn has(&self, ty: TypeId) -> bool {
        self.index.contains_key(&ty)
    }

    /// Register `ty` in a new slot at the end of the table.
    pub fn add(&mut self, ty: TypeId, shape: Shape) -> Result<(), TableError> {
        if self.has(ty) {
            return Err(TableError::DuplicateType { ty });
        }
        trace!(%ty, slot = self.slots.len(), "add type");
        self.index.insert(ty, self.slots.len());
        self.slots.push(Slot { owner: ty, shape });
        Ok(())
    }

    /// Move the shape of `resolved` into the slot of `placeholder`.
    ///
    /// The slot of `resolved` is removed and later slots shift down by one.
    /// Every type that pointed at the removed slot now points at the
    /// placeholder's slot.
    pub fn merge(&mut self, placeholder: TypeId, resolved: TypeId) -> Result<(), TableError> {
        let &target = self
            .index
            .get(&placeholder)
            .ok_or(TableError::UnknownType { ty: placeholder })?;
        let &removed = self
            .index
            .get(&resolved)
            .ok_or(TableError::UnknownType { ty: resolved })?;
        if target == removed {
            return Ok(());
        }

        let slot = self.slots.remove(removed);
        let target = if target > removed { target - 1 } else { target };
        self.slots[target].shape = slot.shape;
        for idx in self.index.values_mut() {
            if *idx == removed {
                *idx = target;
            } else if *idx > removed {
                *idx -= 1;
            }
        }
        debug!(%placeholder, %resolved, slot = target, "merged knot");
        Ok(())
    }

    /// Slot index of `ty`.
    pub fn index_of(&self, ty: TypeId) -> Result<i64, TableError> {
        self.index
            .get(&ty)
            .map(|&idx| idx as i64)
            .ok_or(TableError::UnknownType { ty })
    }

    /// Shape currently stored for `ty`.
    pub fn shape_of(&self, ty: TypeId) -> Result<&Shape, TableError> {
        let idx = self.index_of(ty)? as usize;
        Ok(&self.slots[idx].shape)
    }

    /// Write a reference as SLEB128: an opcode or a slot index.
    pub fn encode_ref(&self, buf: &mut BufferType, r: TypeRef) -> Result<(), TableError> {
        let n = match r {
            TypeRef::Prim(op) => op,
            TypeRef::Type(ty) => self.index_of(ty)?,
        };
        write_sleb(buf, n);
        Ok(())
    }

    /// Write the slot count followed by every shape in slot order.
    pub fn encode(&self, buf: &mut BufferType) -> Result<(), TableError> {
        write_uleb(buf, self.slots.len() as u64);
        for slot in &self.slots {
            match &slot.shape {
                Shape::Placeholder => return Err(TableError::UnknownType { ty: slot.owner }),
                Shape::Opt(inner) => {
                    write_sleb(buf, opcode::OPT);
                    self.encode_ref(buf, *inner)?;
                }
                Shape::Vec(inner) => {
                    write_sleb(buf, opcode::VEC);
                    self.encode_ref(buf, *inner)?;
                }
                Shape::Record(fields) | Shape::Variant(fields) => {
                    let op = if matches!(slot.shape, Shape::Record(_)) {
                        opcode::RECORD
                    } else {
                        opcode::VARIANT
                    };
                    write_sleb(buf, op);
                    write_uleb(buf, fields.len() as u64);
                    for (hash, r) in fields {
                        write_uleb(buf, *hash as u64);
                        self.encode_ref(buf, *r)?;
                    }
                }
                Shape::Func { args, rets, modes } => {
                    write_sleb(buf, opcode::FUNC);
                    for list in [args, rets] {
                        write_uleb(buf, list.len() as u64);
                        for r in list {
                            self.encode_ref(buf, *r)?;
                        }
                    }
                    let mut annotations = BufferType::new();
                    if modes.contains(FuncModes::QUERY) {
                        annotations.push(opcode::QUERY);
                    }
                    if modes.contains(FuncModes::ONEWAY) {
                        annotations.push(opcode::ONEWAY);
                    }
                    write_bytes(buf, &annotations);
                }
                Shape::Service(methods) => {
                    write_sleb(buf, opcode::SERVICE);
                    write_uleb(buf, methods.len() as u64);
                    for (name, r) in methods {
                        write_bytes(buf, name.as_bytes());
                        self.encode_ref(buf, *r)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Visitor that registers every compound type reachable from a root.
///
/// Children are registered before their parent, depth first in field
/// order. A knot reserves a placeholder slot, builds its target and then
/// merges the target into the placeholder.
pub struct TableBuilder<'t> {
    table: &'t mut TypeTable,
}

impl<'t> TableBuilder<'t> {
    pub fn new(table: &'t mut TypeTable) -> Self {
        TableBuilder { table }
    }

    /// Register `ty` and everything it references, returning its reference.
    pub fn build(&mut self, mgr: &TypeManager, ty: TypeId) -> Result<TypeRef, TableError> {
        mgr.accept(ty, self, ())
    }

    fn build_fields(
        &mut self,
        mgr: &TypeManager,
        fields: &[Field],
    ) -> Result<Vec<(u32, TypeRef)>, TableError> {
        fields
            .iter()
            .map(|f| Ok((f.hash, self.build(mgr, f.ty)?)))
            .collect()
    }

    fn build_list(
        &mut self,
        mgr: &TypeManager,
        types: &[TypeId],
    ) -> Result<Vec<TypeRef>, TableError> {
        types.iter().map(|t| self.build(mgr, *t)).collect()
    }

    fn finish(&mut self, ty: TypeId, shape: Shape) -> Result<TypeRef, TableError> {
        // A type reachable twice through siblings is registered once.
        if !self.table.has(ty) {
            self.table.add(ty, shape)?;
        }
        Ok(TypeRef::Type(ty))
    }
}

impl TypeVisitor for TableBuilder<'_> {
    type Data = ();
    type Value = TypeRef;
    type Error = TableError;

    fn visit_type(&mut self, mgr: &TypeManager, ty: TypeId, _: ()) -> Result<TypeRef, TableError> {
        // Only primitives reach the fallback.
        match primitive_opcode(mgr.kind(ty)) {
            Some(op) => Ok(TypeRef::Prim(op)),
            None => Err(TableError::UnknownType { ty }),
        }
    }

    fn visit_opt(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        inner: TypeId,
        _: (),
    ) -> Result<TypeRef, TableError> {
        if self.table.has(ty) {
            return Ok(TypeRef::Type(ty));
        }
        let inner = self.build(mgr, inner)?;
        self.finish(ty, Shape::Opt(inner))
    }

    fn visit_vec(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        inner: TypeId,
        _: (),
    ) -> Result<TypeRef, TableError> {
        if self.table.has(ty) {
            return Ok(TypeRef::Type(ty));
        }
        let inner = self.build(mgr, inner)?;
        self.finish(ty, Shape::Vec(inner))
    }

    fn visit_record(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        fields: &[Field],
        _: (),
    ) -> Result<TypeRef, TableError> {
        if self.table.has(ty) {
            return Ok(TypeRef::Type(ty));
        }
        let fields = self.build_fields(mgr, fields)?;
        self.finish(ty, Shape::Record(fields))
    }

    fn visit_variant(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        fields: &[Field],
        _: (),
    ) -> Result<TypeRef, TableError> {
        if self.table.has(ty) {
            return Ok(TypeRef::Type(ty));
        }
        let fields = self.build_fields(mgr, fields)?;
        self.finish(ty, Shape::Variant(fields))
    }

    fn visit_func(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        func: &FuncType,
        _: (),
    ) -> Result<TypeRef, TableError> {
        if self.table.has(ty) {
            return Ok(TypeRef::Type(ty));
        }
        let args = self.build_list(mgr, &func.args)?;
        let rets = self.build_list(mgr, &func.rets)?;
        self.finish(
            ty,
            Shape::Func {
                args,
                rets,
                modes: func.modes,
            },
        )
    }

    fn visit_service(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        methods: &[Method],
        _: (),
    ) -> Result<TypeRef, TableError> {
        if self.table.has(ty) {
            return Ok(TypeRef::Type(ty));
        }
        let methods = methods
            .iter()
            .map(|m| Ok((m.name.clone(), self.build(mgr, m.ty)?)))
            .collect::<Result<Vec<_>, TableError>>()?;
        self.finish(ty, Shape::Service(methods))
    }

    fn visit_rec(
        &mut self,
        mgr: &TypeManager,
        knot: TypeId,
        target: TypeId,
        _: (),
    ) -> Result<TypeRef, TableError> {
        if self.table.has(knot) {
            return Ok(TypeRef::Type(knot));
        }
        // A knot aliasing a primitive needs no slot.
        if let Some(op) = primitive_opcode(mgr.kind(mgr.resolve(knot)?)) {
            return Ok(TypeRef::Prim(op));
        }
        self.table.add(knot, Shape::Placeholder)?;
        match self.build(mgr, target)? {
            TypeRef::Type(resolved) => self.table.merge(knot, resolved)?,
            TypeRef::Prim(_) => unreachable!("primitive targets are handled above"),
        }
        Ok(TypeRef::Type(knot))
    }
}
