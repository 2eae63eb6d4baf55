//! Productivity analysis over the type graph.
//!
//! A type's *rank* is the nesting depth of its smallest finite value, or
//! `None` when no finite value exists. Ranks are a least fixpoint over the
//! whole arena, which makes cycles through `opt`, `vec` or a variant with a
//! non-recursive arm productive, while `μx.record {a:x}` is not.

use super::{TypeId, TypeKind, TypeManager};
use crate::TypeError;
use alloc::{vec, vec::Vec};

/// Ranks of every node of a [`TypeManager`], indexed by [`TypeId::index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranks(Vec<Option<u32>>);

impl Ranks {
    pub fn get(&self, ty: TypeId) -> Option<u32> {
        self.0.get(ty.index()).copied().flatten()
    }

    pub fn is_inhabited(&self, ty: TypeId) -> bool {
        self.get(ty).is_some()
    }
}

impl TypeManager {
    /// Compute the rank of every type in the arena.
    pub fn ranks(&self) -> Ranks {
        let mut ranks: Vec<Option<u32>> = vec![None; self.len()];
        loop {
            let mut changed = false;
            for ty in self.ids() {
                let next = self.step_rank(ty, &ranks);
                if next != ranks[ty.index()] {
                    ranks[ty.index()] = next;
                    changed = true;
                }
            }
            if !changed {
                return Ranks(ranks);
            }
        }
    }

    fn step_rank(&self, ty: TypeId, ranks: &[Option<u32>]) -> Option<u32> {
        let rank = |t: TypeId| ranks[t.index()];
        match self.kind(ty) {
            TypeKind::Empty => None,
            TypeKind::Null
            | TypeKind::Bool
            | TypeKind::Text
            | TypeKind::Principal
            | TypeKind::Float64
            | TypeKind::Int
            | TypeKind::Nat
            | TypeKind::FixedInt(_)
            | TypeKind::FixedNat(_)
            | TypeKind::Func(_)
            | TypeKind::Service(_) => Some(0),
            // `none` and `vec {}` are always available.
            TypeKind::Opt(_) | TypeKind::Vec(_) => Some(1),
            TypeKind::Record(fields) => fields
                .iter()
                .try_fold(0u32, |acc, f| rank(f.ty).map(|r| acc.max(r)))
                .map(|r| r + 1),
            TypeKind::Variant(fields) => fields.iter().filter_map(|f| rank(f.ty)).min().map(|r| r + 1),
            TypeKind::Knot(Some(target)) => rank(*target),
            TypeKind::Knot(None) => None,
        }
    }

    /// Depth of the smallest value of `ty`, `None` if it has no finite value.
    pub fn min_depth(&self, ty: TypeId) -> Option<u32> {
        self.ranks().get(ty)
    }

    /// Check that every knot reachable from `root` is filled and productive,
    /// and that every service method resolves to a function.
    pub fn check_closed(&self, root: TypeId) -> Result<(), TypeError> {
        let ranks = self.ranks();
        let mut seen = vec![false; self.len()];
        let mut stack = vec![root];
        while let Some(ty) = stack.pop() {
            if core::mem::replace(&mut seen[ty.index()], true) {
                continue;
            }
            match self.kind(ty) {
                TypeKind::Knot(None) => return Err(TypeError::UnresolvedRecursion { knot: ty }),
                TypeKind::Knot(Some(target)) => {
                    if !ranks.is_inhabited(ty) {
                        return Err(TypeError::NonProductiveRecursion { knot: ty });
                    }
                    stack.push(*target);
                }
                TypeKind::Opt(inner) | TypeKind::Vec(inner) => stack.push(*inner),
                TypeKind::Record(fields) | TypeKind::Variant(fields) => {
                    stack.extend(fields.iter().map(|f| f.ty));
                }
                TypeKind::Func(func) => {
                    stack.extend(func.args.iter().chain(func.rets.iter()).copied());
                }
                TypeKind::Service(methods) => {
                    for method in methods {
                        let resolved = self.resolve(method.ty)?;
                        if !matches!(self.kind(resolved), TypeKind::Func(_)) {
                            return Err(TypeError::NotAFunction {
                                name: method.name.clone(),
                            });
                        }
                        stack.push(method.ty);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Width;

    #[test]
    fn test_primitive_ranks() {
        let mut mgr = TypeManager::new();
        let nat = mgr.nat();
        let empty = mgr.empty();
        let opt_empty = mgr.opt(empty);
        let vec_empty = mgr.vec(empty);
        assert_eq!(mgr.min_depth(nat), Some(0));
        assert_eq!(mgr.min_depth(empty), None);
        assert_eq!(mgr.min_depth(opt_empty), Some(1));
        assert_eq!(mgr.min_depth(vec_empty), Some(1));
    }

    #[test]
    fn test_record_needs_every_field() {
        let mut mgr = TypeManager::new();
        let nat8 = mgr.fixed_nat(Width::W8);
        let empty = mgr.empty();
        let ok = mgr.record([("a", nat8)]).unwrap();
        let nested = mgr.record([("inner", ok)]).unwrap();
        let bad = mgr.record([("a", nat8), ("b", empty)]).unwrap();
        assert_eq!(mgr.min_depth(ok), Some(1));
        assert_eq!(mgr.min_depth(nested), Some(2));
        assert_eq!(mgr.min_depth(bad), None);
    }

    #[test]
    fn test_variant_needs_one_arm() {
        let mut mgr = TypeManager::new();
        let empty = mgr.empty();
        let null = mgr.null();
        let variant = mgr.variant([("never", empty), ("leaf", null)]).unwrap();
        assert_eq!(mgr.min_depth(variant), Some(1));
    }

    #[test]
    fn test_recursion_through_variant_is_productive() {
        // tree = variant {leaf: null; node: record {left: tree; right: tree}}
        let mut mgr = TypeManager::new();
        let tree = mgr.rec();
        let null = mgr.null();
        let node = mgr.record([("left", tree), ("right", tree)]).unwrap();
        let body = mgr.variant([("leaf", null), ("node", node)]).unwrap();
        mgr.fill(tree, body).unwrap();
        assert_eq!(mgr.min_depth(tree), Some(1));
        assert_eq!(mgr.min_depth(node), Some(2));
        assert_eq!(mgr.check_closed(tree), Ok(()));
    }

    #[test]
    fn test_direct_self_reference_is_rejected() {
        let mut mgr = TypeManager::new();
        let knot = mgr.rec();
        let body = mgr.record([("again", knot)]).unwrap();
        mgr.fill(knot, body).unwrap();
        assert_eq!(mgr.min_depth(knot), None);
        assert_eq!(
            mgr.check_closed(body),
            Err(TypeError::NonProductiveRecursion { knot })
        );
    }

    #[test]
    fn test_unfilled_knot_is_reported() {
        let mut mgr = TypeManager::new();
        let knot = mgr.rec();
        let list = mgr.vec(knot);
        let int = mgr.int();
        let root = mgr.record([("xs", list), ("n", int)]).unwrap();
        assert_eq!(
            mgr.check_closed(root),
            Err(TypeError::UnresolvedRecursion { knot })
        );
    }

    #[test]
    fn test_service_method_checked_once_filled() {
        let mut mgr = TypeManager::new();
        let callback = mgr.rec();
        let service = mgr.service([("notify", callback)]).unwrap();
        assert_eq!(
            mgr.check_closed(service),
            Err(TypeError::UnresolvedRecursion { knot: callback })
        );

        let nat = mgr.nat();
        let func = mgr.func([nat], [], crate::FuncModes::empty());
        mgr.fill(callback, func).unwrap();
        assert_eq!(mgr.check_closed(service), Ok(()));

        let record = mgr.rec();
        let bad = mgr.service([("get", record)]).unwrap();
        let body = mgr.record([("n", nat)]).unwrap();
        mgr.fill(record, body).unwrap();
        assert_eq!(
            mgr.check_closed(bad),
            Err(TypeError::NotAFunction {
                name: "get".into()
            })
        );
    }

    #[test]
    fn test_self_alias_cannot_be_filled() {
        let mut mgr = TypeManager::new();
        let a = mgr.rec();
        let b = mgr.rec();
        mgr.fill(b, a).unwrap();
        assert_eq!(mgr.fill(a, b), Err(TypeError::NonProductiveRecursion { knot: a }));
    }
}
