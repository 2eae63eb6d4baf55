use super::{Field, FuncType, Method, TypeId, TypeKind, TypeManager, Width};
use crate::TypeError;

/// Trait for visiting types.
///
/// [`TypeManager::accept`] looks at the kind of a type and calls exactly one
/// `visit_*` method, handing over the structural children of composites.
/// Every method has a default that forwards to a more general one, so an
/// implementation only overrides what it cares about:
///
/// - `visit_null`, `visit_bool`, `visit_text`, `visit_float`,
///   `visit_principal`, `visit_empty` forward to `visit_primitive`;
/// - `visit_int`, `visit_nat`, `visit_fixed_int`, `visit_fixed_nat` forward to
///   `visit_number`, which forwards to `visit_primitive`;
/// - `visit_opt`, `visit_vec`, `visit_record`, `visit_variant`, `visit_func`,
///   `visit_service` forward to `visit_construct`;
/// - `visit_primitive` and `visit_construct` forward to `visit_type`;
/// - `visit_rec` dispatches again on the knot's target.
///
/// # Example
///
/// ```
/// use knot_types::{TypeError, TypeId, TypeManager, TypeVisitor};
///
/// struct IsPrimitive;
///
/// impl TypeVisitor for IsPrimitive {
///     type Data = ();
///     type Value = bool;
///     type Error = TypeError;
///
///     fn visit_type(&mut self, _: &TypeManager, _: TypeId, _: ()) -> Result<bool, TypeError> {
///         Ok(false)
///     }
///
///     fn visit_primitive(&mut self, _: &TypeManager, _: TypeId, _: ()) -> Result<bool, TypeError> {
///         Ok(true)
///     }
/// }
///
/// let mut mgr = TypeManager::new();
/// let nat = mgr.nat();
/// let list = mgr.vec(nat);
/// assert_eq!(mgr.accept(nat, &mut IsPrimitive, ()), Ok(true));
/// assert_eq!(mgr.accept(list, &mut IsPrimitive, ()), Ok(false));
/// ```
pub trait TypeVisitor {
    /// Context passed down with each visit.
    type Data;
    /// Result of a visit.
    type Value;
    type Error: From<TypeError>;

    /// Fallback for every kind.
    fn visit_type(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error>;

    fn visit_primitive(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_type(mgr, ty, data)
    }

    fn visit_null(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_primitive(mgr, ty, data)
    }

    fn visit_bool(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_primitive(mgr, ty, data)
    }

    fn visit_text(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_primitive(mgr, ty, data)
    }

    fn visit_float(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_primitive(mgr, ty, data)
    }

    fn visit_principal(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_primitive(mgr, ty, data)
    }

    fn visit_empty(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_primitive(mgr, ty, data)
    }

    fn visit_number(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_primitive(mgr, ty, data)
    }

    fn visit_int(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_number(mgr, ty, data)
    }

    fn visit_nat(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_number(mgr, ty, data)
    }

    fn visit_fixed_int(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        _width: Width,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_number(mgr, ty, data)
    }

    fn visit_fixed_nat(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        _width: Width,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_number(mgr, ty, data)
    }

    fn visit_construct(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_type(mgr, ty, data)
    }

    fn visit_opt(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        _inner: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_construct(mgr, ty, data)
    }

    fn visit_vec(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        _inner: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_construct(mgr, ty, data)
    }

    fn visit_record(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        _fields: &[Field],
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_construct(mgr, ty, data)
    }

    fn visit_variant(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        _fields: &[Field],
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_construct(mgr, ty, data)
    }

    fn visit_func(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        _func: &FuncType,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_construct(mgr, ty, data)
    }

    fn visit_service(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        _methods: &[Method],
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        self.visit_construct(mgr, ty, data)
    }

    /// Visit a filled knot. `target` is what the knot was filled with.
    fn visit_rec(
        &mut self,
        mgr: &TypeManager,
        _knot: TypeId,
        target: TypeId,
        data: Self::Data,
    ) -> Result<Self::Value, Self::Error> {
        mgr.accept(target, self, data)
    }
}

impl TypeManager {
    /// Dispatch `ty` to the matching method of `visitor`.
    ///
    /// Fails with [`TypeError::UnresolvedRecursion`] when `ty` is a knot that
    /// was never filled.
    pub fn accept<V: TypeVisitor + ?Sized>(
        &self,
        ty: TypeId,
        visitor: &mut V,
        data: V::Data,
    ) -> Result<V::Value, V::Error> {
        match self.kind(ty) {
            TypeKind::Null => visitor.visit_null(self, ty, data),
            TypeKind::Bool => visitor.visit_bool(self, ty, data),
            TypeKind::Text => visitor.visit_text(self, ty, data),
            TypeKind::Float64 => visitor.visit_float(self, ty, data),
            TypeKind::Principal => visitor.visit_principal(self, ty, data),
            TypeKind::Empty => visitor.visit_empty(self, ty, data),
            TypeKind::Int => visitor.visit_int(self, ty, data),
            TypeKind::Nat => visitor.visit_nat(self, ty, data),
            TypeKind::FixedInt(width) => visitor.visit_fixed_int(self, ty, *width, data),
            TypeKind::FixedNat(width) => visitor.visit_fixed_nat(self, ty, *width, data),
            TypeKind::Opt(inner) => visitor.visit_opt(self, ty, *inner, data),
            TypeKind::Vec(inner) => visitor.visit_vec(self, ty, *inner, data),
            TypeKind::Record(fields) => visitor.visit_record(self, ty, fields, data),
            TypeKind::Variant(fields) => visitor.visit_variant(self, ty, fields, data),
            TypeKind::Func(func) => visitor.visit_func(self, ty, func, data),
            TypeKind::Service(methods) => visitor.visit_service(self, ty, methods, data),
            TypeKind::Knot(Some(target)) => visitor.visit_rec(self, ty, *target, data),
            TypeKind::Knot(None) => Err(TypeError::UnresolvedRecursion { knot: ty }.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{string::String, vec, vec::Vec};
    use pretty_assertions::assert_eq;

    /// Records which fallback each kind ends up in.
    struct Trace;

    impl TypeVisitor for Trace {
        type Data = ();
        type Value = &'static str;
        type Error = TypeError;

        fn visit_type(&mut self, _: &TypeManager, _: TypeId, _: ()) -> Result<&'static str, TypeError> {
            Ok("type")
        }

        fn visit_number(
            &mut self,
            _: &TypeManager,
            _: TypeId,
            _: (),
        ) -> Result<&'static str, TypeError> {
            Ok("number")
        }

        fn visit_construct(
            &mut self,
            _: &TypeManager,
            _: TypeId,
            _: (),
        ) -> Result<&'static str, TypeError> {
            Ok("construct")
        }
    }

    #[test]
    fn test_fallback_chain() {
        let mut mgr = TypeManager::new();
        let text = mgr.text();
        let nat8 = mgr.fixed_nat(Width::W8);
        let int = mgr.int();
        let opt = mgr.opt(int);
        let record = mgr.record([("a", text)]).unwrap();

        let got: Vec<&str> = [text, nat8, int, opt, record]
            .into_iter()
            .map(|ty| mgr.accept(ty, &mut Trace, ()).unwrap())
            .collect();
        assert_eq!(got, vec!["type", "number", "number", "construct", "construct"]);
    }

    #[test]
    fn test_rec_redispatches_on_target() {
        let mut mgr = TypeManager::new();
        let knot = mgr.rec();
        let inner = mgr.opt(knot);
        mgr.fill(knot, inner).unwrap();
        assert_eq!(mgr.accept(knot, &mut Trace, ()), Ok("construct"));
    }

    #[test]
    fn test_unfilled_knot_is_an_error() {
        let mut mgr = TypeManager::new();
        let knot = mgr.rec();
        assert_eq!(
            mgr.accept(knot, &mut Trace, ()),
            Err(TypeError::UnresolvedRecursion { knot })
        );
    }

    struct FieldNames;

    impl TypeVisitor for FieldNames {
        type Data = ();
        type Value = Vec<String>;
        type Error = TypeError;

        fn visit_type(&mut self, _: &TypeManager, _: TypeId, _: ()) -> Result<Vec<String>, TypeError> {
            Ok(Vec::new())
        }

        fn visit_record(
            &mut self,
            _: &TypeManager,
            _: TypeId,
            fields: &[Field],
            _: (),
        ) -> Result<Vec<String>, TypeError> {
            Ok(fields.iter().map(|f| f.name.clone()).collect())
        }
    }

    #[test]
    fn test_record_children_in_hash_order() {
        let mut mgr = TypeManager::new();
        let nat = mgr.nat();
        let record = mgr
            .record([("short_name", nat), ("id", nat), ("description", nat)])
            .unwrap();
        assert_eq!(
            mgr.accept(record, &mut FieldNames, ()).unwrap(),
            vec!["id", "description", "short_name"]
        );
    }
}
