use super::{Field, FuncType, Method, TypeId, TypeKind, TypeManager, TypeVisitor, Width};
use crate::TypeError;
use alloc::{collections::BTreeSet, string::String};
use core::fmt::Write;

/// Visitor that formats types into their canonical signature.
///
/// A knot prints as `μrec_N.T` where it is first entered and as `rec_N`
/// inside its own body, so cyclic graphs print in finite space. Unfilled
/// knots print as their bare name.
pub struct TypeFormatter {
    output: String,
    active: BTreeSet<TypeId>,
}

impl TypeFormatter {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            active: BTreeSet::new(),
        }
    }

    pub fn format(mgr: &TypeManager, ty: TypeId) -> String {
        let mut formatter = Self::new();
        formatter.write_ty(mgr, ty);
        formatter.output
    }

    fn write_ty(&mut self, mgr: &TypeManager, ty: TypeId) {
        if let TypeKind::Knot(None) = mgr.kind(ty) {
            self.output.push_str(&mgr.knot_name(ty));
            return;
        }
        // Unfilled knots are handled above, the visitor itself never fails.
        let _ = mgr.accept(ty, self, ());
    }

    fn write_list(&mut self, mgr: &TypeManager, types: &[TypeId]) {
        for (i, ty) in types.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.write_ty(mgr, *ty);
        }
    }

    fn write_fields(&mut self, mgr: &TypeManager, keyword: &str, fields: &[Field]) {
        let _ = write!(self.output, "{} {{", keyword);
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.output.push_str("; ");
            }
            let _ = write!(self.output, "{}:", field.name);
            self.write_ty(mgr, field.ty);
        }
        self.output.push('}');
    }

    fn write_func(&mut self, mgr: &TypeManager, func: &FuncType) {
        self.output.push_str("func (");
        self.write_list(mgr, &func.args);
        self.output.push_str(") → (");
        self.write_list(mgr, &func.rets);
        self.output.push(')');
        if func.is_query() {
            self.output.push_str(" query");
        }
        if func.is_oneway() {
            self.output.push_str(" oneway");
        }
    }
}

impl Default for TypeFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn width_name(prefix: &str, width: Width) -> String {
    let mut name = String::from(prefix);
    let _ = write!(name, "{}", width.bits());
    name
}

impl TypeVisitor for TypeFormatter {
    type Data = ();
    type Value = ();
    type Error = TypeError;

    fn visit_type(&mut self, mgr: &TypeManager, ty: TypeId, _: ()) -> Result<(), TypeError> {
        let name = match mgr.kind(ty) {
            TypeKind::Null => "null",
            TypeKind::Bool => "bool",
            TypeKind::Text => "text",
            TypeKind::Principal => "principal",
            TypeKind::Float64 => "float64",
            TypeKind::Empty => "empty",
            TypeKind::Int => "int",
            TypeKind::Nat => "nat",
            TypeKind::FixedInt(width) => {
                self.output.push_str(&width_name("int", *width));
                return Ok(());
            }
            TypeKind::FixedNat(width) => {
                self.output.push_str(&width_name("nat", *width));
                return Ok(());
            }
            // Composites and knots are dispatched to their own methods.
            _ => "",
        };
        self.output.push_str(name);
        Ok(())
    }

    fn visit_opt(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        inner: TypeId,
        _: (),
    ) -> Result<(), TypeError> {
        self.output.push_str("opt ");
        self.write_ty(mgr, inner);
        Ok(())
    }

    fn visit_vec(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        inner: TypeId,
        _: (),
    ) -> Result<(), TypeError> {
        self.output.push_str("vec ");
        self.write_ty(mgr, inner);
        Ok(())
    }

    fn visit_record(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        fields: &[Field],
        _: (),
    ) -> Result<(), TypeError> {
        self.write_fields(mgr, "record", fields);
        Ok(())
    }

    fn visit_variant(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        fields: &[Field],
        _: (),
    ) -> Result<(), TypeError> {
        self.write_fields(mgr, "variant", fields);
        Ok(())
    }

    fn visit_func(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        func: &FuncType,
        _: (),
    ) -> Result<(), TypeError> {
        self.write_func(mgr, func);
        Ok(())
    }

    fn visit_service(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        methods: &[Method],
        _: (),
    ) -> Result<(), TypeError> {
        self.output.push_str("service {");
        for (i, method) in methods.iter().enumerate() {
            if i > 0 {
                self.output.push_str("; ");
            }
            let _ = write!(self.output, "{}:", method.name);
            self.write_ty(mgr, method.ty);
        }
        self.output.push('}');
        Ok(())
    }

    fn visit_rec(
        &mut self,
        mgr: &TypeManager,
        knot: TypeId,
        target: TypeId,
        _: (),
    ) -> Result<(), TypeError> {
        let name = mgr.knot_name(knot);
        if self.active.contains(&knot) {
            self.output.push_str(&name);
            return Ok(());
        }
        self.active.insert(knot);
        let _ = write!(self.output, "μ{}.", name);
        self.write_ty(mgr, target);
        self.active.remove(&knot);
        Ok(())
    }
}

impl TypeManager {
    /// Canonical signature of `ty`, used for placeholders and error messages.
    pub fn display(&self, ty: TypeId) -> String {
        TypeFormatter::format(self, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FuncModes;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_primitives() {
        let mut mgr = TypeManager::new();
        let cases = [
            (mgr.null(), "null"),
            (mgr.bool(), "bool"),
            (mgr.text(), "text"),
            (mgr.principal(), "principal"),
            (mgr.int(), "int"),
            (mgr.nat(), "nat"),
            (mgr.fixed_int(Width::W16), "int16"),
            (mgr.fixed_nat(Width::W64), "nat64"),
            (mgr.float64(), "float64"),
            (mgr.empty(), "empty"),
        ];
        for (ty, expected) in cases {
            assert_eq!(mgr.display(ty), expected);
        }
    }

    #[test]
    fn test_format_composites() {
        let mut mgr = TypeManager::new();
        let nat = mgr.nat();
        let text = mgr.text();
        let opt = mgr.opt(text);
        let vec = mgr.vec(opt);
        assert_eq!(mgr.display(vec), "vec opt text");

        let record = mgr.record([("name", text), ("id", nat)]).unwrap();
        assert_eq!(mgr.display(record), "record {id:nat; name:text}");

        let variant = mgr.variant([("ok", nat), ("err", text)]).unwrap();
        assert_eq!(mgr.display(variant), "variant {ok:nat; err:text}");
    }

    #[test]
    fn test_format_func_and_service() {
        let mut mgr = TypeManager::new();
        let nat = mgr.nat();
        let text = mgr.text();
        let get = mgr.func([nat, text], [text], FuncModes::QUERY);
        assert_eq!(mgr.display(get), "func (nat, text) → (text) query");

        let put = mgr.func([], [], FuncModes::empty());
        let service = mgr.service([("put", put), ("get", get)]).unwrap();
        assert_eq!(
            mgr.display(service),
            "service {get:func (nat, text) → (text) query; put:func () → ()}"
        );
    }

    #[test]
    fn test_format_knots() {
        let mut mgr = TypeManager::new();
        let knot = mgr.rec();
        assert_eq!(mgr.display(knot), "rec_0");

        let tail = mgr.vec(knot);
        let int = mgr.int();
        let node = mgr.record([("value", int), ("children", tail)]).unwrap();
        mgr.fill(knot, node).unwrap();
        assert_eq!(
            mgr.display(knot),
            "μrec_0.record {value:int; children:vec rec_0}"
        );
        assert_eq!(
            mgr.display(node),
            "record {value:int; children:vec μrec_0.record {value:int; children:vec rec_0}}"
        );
    }
}
