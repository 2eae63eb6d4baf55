//! Type arena with structural interning.

use super::{Field, FuncModes, FuncType, Method, TyData, TypeFlags, TypeId, TypeKind, Width};
use crate::{TypeError, label_hash};
use alloc::{format, string::String, vec::Vec};
use hashbrown::HashMap;

/// Owns every type node of an interface.
///
/// Constructors intern structurally identical types so that building the
/// same shape twice yields the same [`TypeId`]. Recursive placeholders
/// created by [`TypeManager::rec`] are never interned: each one is a fresh
/// identity that is filled later with [`TypeManager::fill`].
///
/// # Example
///
/// ```
/// use knot_types::TypeManager;
///
/// let mut mgr = TypeManager::new();
/// let list = mgr.rec();
/// let nat = mgr.nat();
/// let tail = mgr.opt(list);
/// let node = mgr.record([("head", nat), ("tail", tail)]).unwrap();
/// mgr.fill(list, node).unwrap();
///
/// assert_eq!(mgr.display(list), "μrec_0.record {head:nat; tail:opt rec_0}");
/// ```
#[derive(Debug, Default)]
pub struct TypeManager {
    nodes: Vec<TyData>,
    interned: HashMap<TypeKind, TypeId>,
}

impl TypeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over every id in construction order.
    pub fn ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.nodes.len() as u32).map(TypeId)
    }

    /// Get the full type data (kind + flags).
    ///
    /// Panics if `ty` was not produced by this manager.
    pub fn data(&self, ty: TypeId) -> &TyData {
        &self.nodes[ty.index()]
    }

    pub fn kind(&self, ty: TypeId) -> &TypeKind {
        &self.data(ty).kind
    }

    pub fn flags(&self, ty: TypeId) -> TypeFlags {
        self.data(ty).flags
    }

    /// Follow filled knots until a non-knot type is reached.
    pub fn resolve(&self, ty: TypeId) -> Result<TypeId, TypeError> {
        let mut current = ty;
        // `fill` rejects knot chains that loop, so this walk is bounded.
        loop {
            match self.kind(current) {
                TypeKind::Knot(Some(target)) => current = *target,
                TypeKind::Knot(None) => {
                    return Err(TypeError::UnresolvedRecursion { knot: current });
                }
                _ => return Ok(current),
            }
        }
    }

    /// Name used for a knot in signatures and error messages.
    pub fn knot_name(&self, knot: TypeId) -> String {
        format!("rec_{}", knot.0)
    }

    fn alloc(&mut self, kind: TypeKind) -> TypeId {
        let flags = kind.compute_flags(self);
        let id = TypeId(
            u32::try_from(self.nodes.len()).unwrap_or_else(|_| panic!("type arena overflowed")),
        );
        self.nodes.push(TyData { kind, flags });
        id
    }

    fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.interned.get(&kind) {
            return id;
        }
        let id = self.alloc(kind.clone());
        self.interned.insert(kind, id);
        id
    }

    // Factory methods for types.
    pub fn null(&mut self) -> TypeId {
        self.intern(TypeKind::Null)
    }
    pub fn bool(&mut self) -> TypeId {
        self.intern(TypeKind::Bool)
    }
    pub fn text(&mut self) -> TypeId {
        self.intern(TypeKind::Text)
    }
    pub fn principal(&mut self) -> TypeId {
        self.intern(TypeKind::Principal)
    }
    pub fn float64(&mut self) -> TypeId {
        self.intern(TypeKind::Float64)
    }
    pub fn empty(&mut self) -> TypeId {
        self.intern(TypeKind::Empty)
    }
    pub fn int(&mut self) -> TypeId {
        self.intern(TypeKind::Int)
    }
    pub fn nat(&mut self) -> TypeId {
        self.intern(TypeKind::Nat)
    }
    pub fn fixed_int(&mut self, width: Width) -> TypeId {
        self.intern(TypeKind::FixedInt(width))
    }
    pub fn fixed_nat(&mut self, width: Width) -> TypeId {
        self.intern(TypeKind::FixedNat(width))
    }

    pub fn opt(&mut self, inner: TypeId) -> TypeId {
        self.intern(TypeKind::Opt(inner))
    }

    pub fn vec(&mut self, inner: TypeId) -> TypeId {
        self.intern(TypeKind::Vec(inner))
    }

    /// Construct a record. Fields are sorted by label hash, then by name.
    pub fn record<I, S>(&mut self, fields: I) -> Result<TypeId, TypeError>
    where
        I: IntoIterator<Item = (S, TypeId)>,
        S: Into<String>,
    {
        let fields = sorted_fields(fields)?;
        Ok(self.intern(TypeKind::Record(fields)))
    }

    /// Construct a variant. Fields are sorted like record fields.
    pub fn variant<I, S>(&mut self, fields: I) -> Result<TypeId, TypeError>
    where
        I: IntoIterator<Item = (S, TypeId)>,
        S: Into<String>,
    {
        let fields = sorted_fields(fields)?;
        Ok(self.intern(TypeKind::Variant(fields)))
    }

    /// Record whose fields are labelled `_0_`, `_1_`, ... in argument order.
    pub fn tuple(&mut self, components: impl IntoIterator<Item = TypeId>) -> TypeId {
        let fields: Vec<(String, TypeId)> = components
            .into_iter()
            .enumerate()
            .map(|(i, ty)| (format!("_{}_", i), ty))
            .collect();
        // Positional labels are unique by construction.
        match sorted_fields(fields) {
            Ok(fields) => self.intern(TypeKind::Record(fields)),
            Err(_) => unreachable!("tuple labels are distinct"),
        }
    }

    pub fn func(
        &mut self,
        args: impl IntoIterator<Item = TypeId>,
        rets: impl IntoIterator<Item = TypeId>,
        modes: FuncModes,
    ) -> TypeId {
        self.intern(TypeKind::Func(FuncType {
            args: args.into_iter().collect(),
            rets: rets.into_iter().collect(),
            modes,
        }))
    }

    /// Construct a service. Every method must resolve to a function type.
    ///
    /// A method may also be a knot that is not filled yet; its target is
    /// checked by [`TypeManager::check_closed`] instead.
    pub fn service<I, S>(&mut self, methods: I) -> Result<TypeId, TypeError>
    where
        I: IntoIterator<Item = (S, TypeId)>,
        S: Into<String>,
    {
        let mut out: Vec<Method> = Vec::new();
        for (name, ty) in methods {
            let name = name.into();
            if out.iter().any(|m| m.name == name) {
                return Err(TypeError::DuplicateField { name });
            }
            let is_func = match self.resolve(ty) {
                Ok(resolved) => matches!(self.kind(resolved), TypeKind::Func(_)),
                // Unfilled knot, checked by `check_closed`.
                Err(_) => true,
            };
            if !is_func {
                return Err(TypeError::NotAFunction { name });
            }
            out.push(Method { name, ty });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(self.intern(TypeKind::Service(out)))
    }

    /// Reserve a recursive placeholder.
    pub fn rec(&mut self) -> TypeId {
        self.alloc(TypeKind::Knot(None))
    }

    /// Fill a placeholder created by [`TypeManager::rec`]. Allowed once.
    pub fn fill(&mut self, knot: TypeId, target: TypeId) -> Result<(), TypeError> {
        match self.kind(knot) {
            TypeKind::Knot(None) => {}
            TypeKind::Knot(Some(_)) => return Err(TypeError::KnotAlreadyFilled { knot }),
            _ => return Err(TypeError::NotAKnot { ty: knot }),
        }

        // A knot that (transitively) aliases itself has no structure at all.
        let mut current = target;
        while let TypeKind::Knot(Some(next)) = self.kind(current) {
            if current == knot {
                break;
            }
            current = *next;
        }
        if current == knot {
            return Err(TypeError::NonProductiveRecursion { knot });
        }

        self.nodes[knot.index()].kind = TypeKind::Knot(Some(target));
        Ok(())
    }
}

fn sorted_fields<I, S>(fields: I) -> Result<Vec<Field>, TypeError>
where
    I: IntoIterator<Item = (S, TypeId)>,
    S: Into<String>,
{
    let mut out: Vec<Field> = Vec::new();
    for (name, ty) in fields {
        let name = name.into();
        if out.iter().any(|f| f.name == name) {
            return Err(TypeError::DuplicateField { name });
        }
        out.push(Field {
            hash: label_hash(&name),
            name,
            ty,
        });
    }
    out.sort_by(|a, b| a.hash.cmp(&b.hash).then_with(|| a.name.cmp(&b.name)));
    Ok(out)
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod manager_test;
