//! Value/type conformance.

use crate::values::Value;
use knot_types::{Field, FuncType, Method, TypeError, TypeId, TypeManager, TypeVisitor, Width};
use num_bigint::BigInt;
use num_traits::Signed;
use std::marker::PhantomData;

/// Report whether `value` conforms to `ty`.
///
/// Records tolerate extra fields, variants need exactly one tag that names a
/// declared arm. Fails only when the type graph itself is broken.
pub fn covariant(mgr: &TypeManager, ty: TypeId, value: &Value) -> Result<bool, TypeError> {
    mgr.accept(ty, &mut Covariant::default(), value)
}

pub(crate) fn fixed_nat_fits(width: Width, n: &BigInt) -> bool {
    !n.is_negative() && *n < (BigInt::from(1) << width.bits())
}

pub(crate) fn fixed_int_fits(width: Width, n: &BigInt) -> bool {
    let half = BigInt::from(1) << (width.bits() - 1);
    *n >= -&half && *n < half
}

#[derive(Default)]
struct Covariant<'v> {
    _value: PhantomData<&'v Value>,
}

impl<'v> TypeVisitor for Covariant<'v> {
    type Data = &'v Value;
    type Value = bool;
    type Error = TypeError;

    fn visit_type(&mut self, _: &TypeManager, _: TypeId, _: &'v Value) -> Result<bool, TypeError> {
        Ok(false)
    }

    fn visit_null(&mut self, _: &TypeManager, _: TypeId, v: &'v Value) -> Result<bool, TypeError> {
        Ok(matches!(v, Value::Null))
    }

    fn visit_bool(&mut self, _: &TypeManager, _: TypeId, v: &'v Value) -> Result<bool, TypeError> {
        Ok(matches!(v, Value::Bool(_)))
    }

    fn visit_text(&mut self, _: &TypeManager, _: TypeId, v: &'v Value) -> Result<bool, TypeError> {
        Ok(matches!(v, Value::Text(_)))
    }

    fn visit_float(&mut self, _: &TypeManager, _: TypeId, v: &'v Value) -> Result<bool, TypeError> {
        Ok(matches!(v, Value::Float(_)))
    }

    fn visit_principal(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        v: &'v Value,
    ) -> Result<bool, TypeError> {
        Ok(matches!(v, Value::Principal(_)))
    }

    fn visit_empty(&mut self, _: &TypeManager, _: TypeId, _: &'v Value) -> Result<bool, TypeError> {
        Ok(false)
    }

    fn visit_int(&mut self, _: &TypeManager, _: TypeId, v: &'v Value) -> Result<bool, TypeError> {
        Ok(matches!(v, Value::Int(_)))
    }

    fn visit_nat(&mut self, _: &TypeManager, _: TypeId, v: &'v Value) -> Result<bool, TypeError> {
        Ok(matches!(v, Value::Int(n) if !n.is_negative()))
    }

    fn visit_fixed_int(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        width: Width,
        v: &'v Value,
    ) -> Result<bool, TypeError> {
        Ok(matches!(v, Value::Int(n) if fixed_int_fits(width, n)))
    }

    fn visit_fixed_nat(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        width: Width,
        v: &'v Value,
    ) -> Result<bool, TypeError> {
        Ok(matches!(v, Value::Int(n) if fixed_nat_fits(width, n)))
    }

    fn visit_opt(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        inner: TypeId,
        v: &'v Value,
    ) -> Result<bool, TypeError> {
        match v {
            Value::Opt(None) => Ok(true),
            Value::Opt(Some(x)) => mgr.accept(inner, self, &**x),
            _ => Ok(false),
        }
    }

    fn visit_vec(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        inner: TypeId,
        v: &'v Value,
    ) -> Result<bool, TypeError> {
        let Value::Vec(items) = v else {
            return Ok(false);
        };
        for item in items {
            if !mgr.accept(inner, self, item)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn visit_record(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        fields: &[Field],
        v: &'v Value,
    ) -> Result<bool, TypeError> {
        let Value::Record(map) = v else {
            return Ok(false);
        };
        for field in fields {
            match map.get(&field.name) {
                Some(x) if mgr.accept(field.ty, self, x)? => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    fn visit_variant(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        fields: &[Field],
        v: &'v Value,
    ) -> Result<bool, TypeError> {
        let Some((tag, x)) = v.variant_tag() else {
            return Ok(false);
        };
        match fields.iter().find(|f| f.name == tag) {
            Some(field) => mgr.accept(field.ty, self, x),
            None => Ok(false),
        }
    }

    fn visit_func(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        _: &FuncType,
        v: &'v Value,
    ) -> Result<bool, TypeError> {
        Ok(matches!(v, Value::Func(..)))
    }

    fn visit_service(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        _: &[Method],
        v: &'v Value,
    ) -> Result<bool, TypeError> {
        Ok(matches!(v, Value::Service(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::Principal;
    use std::collections::BTreeMap;

    #[test]
    fn test_fixed_ranges() {
        let mut mgr = TypeManager::new();
        let nat8 = mgr.fixed_nat(Width::W8);
        let int8 = mgr.fixed_int(Width::W8);
        let nat64 = mgr.fixed_nat(Width::W64);

        let check = |ty, n: i128| covariant(&mgr, ty, &Value::int(n)).unwrap();
        assert!(check(nat8, 0));
        assert!(check(nat8, 255));
        assert!(!check(nat8, 256));
        assert!(!check(nat8, -1));
        assert!(check(int8, -128));
        assert!(check(int8, 127));
        assert!(!check(int8, 128));
        assert!(!check(int8, -129));
        assert!(check(nat64, u64::MAX as i128));
        assert!(!check(nat64, u64::MAX as i128 + 1));
    }

    #[test]
    fn test_nat_rejects_negative() {
        let mut mgr = TypeManager::new();
        let nat = mgr.nat();
        let int = mgr.int();
        assert!(!covariant(&mgr, nat, &Value::int(-1)).unwrap());
        assert!(covariant(&mgr, int, &Value::int(-1)).unwrap());
        assert!(!covariant(&mgr, nat, &Value::text("1")).unwrap());
    }

    #[test]
    fn test_variant_exclusivity() {
        let mut mgr = TypeManager::new();
        let null = mgr.null();
        let nat = mgr.nat();
        let ty = mgr.variant([("ok", nat), ("err", null)]).unwrap();

        assert!(covariant(&mgr, ty, &Value::variant("ok", Value::int(3))).unwrap());
        assert!(covariant(&mgr, ty, &Value::variant("err", Value::Null)).unwrap());
        assert!(!covariant(&mgr, ty, &Value::variant("other", Value::Null)).unwrap());
        assert!(!covariant(&mgr, ty, &Value::Variant(BTreeMap::new())).unwrap());

        let both = Value::Variant(BTreeMap::from([
            ("ok".to_string(), Value::int(3)),
            ("err".to_string(), Value::Null),
        ]));
        assert!(!covariant(&mgr, ty, &both).unwrap());
    }

    #[test]
    fn test_record_tolerates_extra_fields() {
        let mut mgr = TypeManager::new();
        let text = mgr.text();
        let ty = mgr.record([("name", text)]).unwrap();
        let extra = Value::record([("name", Value::text("x")), ("age", Value::int(3))]);
        assert!(covariant(&mgr, ty, &extra).unwrap());

        let missing = Value::record([("age", Value::int(3))]);
        assert!(!covariant(&mgr, ty, &missing).unwrap());
    }

    #[test]
    fn test_references_and_empty() {
        let mut mgr = TypeManager::new();
        let func = mgr.func([], [], Default::default());
        let empty = mgr.empty();
        let p = Principal::from_slice(&[1, 2]);
        assert!(covariant(&mgr, func, &Value::Func(p.clone(), "go".into())).unwrap());
        assert!(!covariant(&mgr, func, &Value::Principal(p)).unwrap());
        assert!(!covariant(&mgr, empty, &Value::Null).unwrap());
    }

    #[test]
    fn test_recursive_list() {
        let mut mgr = TypeManager::new();
        let list = mgr.rec();
        let int = mgr.int();
        let node = mgr.record([("head", int), ("tail", list)]).unwrap();
        let body = mgr.opt(node);
        mgr.fill(list, body).unwrap();

        let value = Value::some(Value::record([
            ("head", Value::int(1)),
            (
                "tail",
                Value::some(Value::record([("head", Value::int(2)), ("tail", Value::none())])),
            ),
        ]));
        assert!(covariant(&mgr, list, &value).unwrap());

        let bad = Value::some(Value::record([("head", Value::int(1)), ("tail", Value::Null)]));
        assert!(!covariant(&mgr, list, &bad).unwrap());
    }

    #[test]
    fn test_unfilled_knot() {
        let mut mgr = TypeManager::new();
        let knot = mgr.rec();
        assert_eq!(
            covariant(&mgr, knot, &Value::Null),
            Err(TypeError::UnresolvedRecursion { knot })
        );
    }
}
