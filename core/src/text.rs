//! Human-readable rendering of values.
//!
//! The output is the syntax read back by [`crate::syntax`].

use crate::syntax::{is_plain_label, quote};
use crate::values::{Value, ValueError};
use knot_types::{Field, FuncType, Method, TypeId, TypeManager, TypeVisitor};
use std::marker::PhantomData;

/// Render `value` as text, following the shape of `ty`.
///
/// # Example
///
/// ```
/// use knot_core::text::value_to_text;
/// use knot_core::types::TypeManager;
/// use knot_core::values::Value;
///
/// let mut mgr = TypeManager::new();
/// let text = mgr.text();
/// let nat = mgr.nat();
/// let ty = mgr.record([("name", text), ("age", nat)]).unwrap();
/// let value = Value::record([("name", Value::text("Ada")), ("age", Value::int(36))]);
/// assert_eq!(value_to_text(&mgr, ty, &value).unwrap(), r#"record {age=36; name="Ada"}"#);
/// ```
pub fn value_to_text(mgr: &TypeManager, ty: TypeId, value: &Value) -> Result<String, ValueError> {
    mgr.accept(ty, &mut TextWriter::default(), value)
}

/// Render an argument list as `(a, b, ...)`.
pub fn args_to_text(
    mgr: &TypeManager,
    types: &[TypeId],
    values: &[Value],
) -> Result<String, ValueError> {
    let parts = types
        .iter()
        .zip(values)
        .map(|(&ty, v)| value_to_text(mgr, ty, v))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("({})", parts.join(", ")))
}

#[derive(Default)]
struct TextWriter<'v> {
    _value: PhantomData<&'v Value>,
}

fn label(name: &str) -> String {
    if is_plain_label(name) {
        name.to_string()
    } else {
        quote(name)
    }
}

impl TextWriter<'_> {
    fn mismatch(mgr: &TypeManager, ty: TypeId, v: &Value) -> ValueError {
        ValueError::Mismatch {
            kind: v.kind_name(),
            signature: mgr.display(ty),
        }
    }
}

impl<'v> TypeVisitor for TextWriter<'v> {
    type Data = &'v Value;
    type Value = String;
    type Error = ValueError;

    fn visit_type(&mut self, mgr: &TypeManager, ty: TypeId, v: &'v Value) -> Result<String, ValueError> {
        Err(Self::mismatch(mgr, ty, v))
    }

    fn visit_primitive(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        v: &'v Value,
    ) -> Result<String, ValueError> {
        match v {
            Value::Null => Ok("null".into()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Text(s) => Ok(quote(s)),
            Value::Int(n) => Ok(n.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Principal(p) => Ok(p.to_text()),
            _ => Err(Self::mismatch(mgr, ty, v)),
        }
    }

    fn visit_opt(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        inner: TypeId,
        v: &'v Value,
    ) -> Result<String, ValueError> {
        match v {
            Value::Opt(None) => Ok("null".into()),
            Value::Opt(Some(x)) => Ok(format!("opt {}", mgr.accept(inner, self, &**x)?)),
            _ => Err(Self::mismatch(mgr, ty, v)),
        }
    }

    fn visit_vec(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        inner: TypeId,
        v: &'v Value,
    ) -> Result<String, ValueError> {
        let Value::Vec(items) = v else {
            return Err(Self::mismatch(mgr, ty, v));
        };
        let items = items
            .iter()
            .map(|x| mgr.accept(inner, self, x))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("vec {{{}}}", items.join("; ")))
    }

    fn visit_record(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        fields: &[Field],
        v: &'v Value,
    ) -> Result<String, ValueError> {
        let Value::Record(map) = v else {
            return Err(Self::mismatch(mgr, ty, v));
        };
        let mut parts = Vec::with_capacity(fields.len());
        for field in fields {
            let x = map
                .get(&field.name)
                .ok_or_else(|| Self::mismatch(mgr, ty, v))?;
            parts.push(format!("{}={}", label(&field.name), mgr.accept(field.ty, self, x)?));
        }
        Ok(format!("record {{{}}}", parts.join("; ")))
    }

    fn visit_variant(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        fields: &[Field],
        v: &'v Value,
    ) -> Result<String, ValueError> {
        let field = v
            .variant_tag()
            .and_then(|(tag, x)| fields.iter().find(|f| f.name == tag).map(|f| (f, x)));
        let Some((field, x)) = field else {
            return Err(Self::mismatch(mgr, ty, v));
        };
        Ok(format!(
            "variant {{{}={}}}",
            label(&field.name),
            mgr.accept(field.ty, self, x)?
        ))
    }

    fn visit_func(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        _: &FuncType,
        v: &'v Value,
    ) -> Result<String, ValueError> {
        match v {
            Value::Func(p, method) => Ok(format!("{}.{}", p.to_text(), method)),
            _ => Err(Self::mismatch(mgr, ty, v)),
        }
    }

    fn visit_service(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        _: &[Method],
        v: &'v Value,
    ) -> Result<String, ValueError> {
        match v {
            Value::Service(p) => Ok(p.to_text()),
            _ => Err(Self::mismatch(mgr, ty, v)),
        }
    }
}
