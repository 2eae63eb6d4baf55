use super::EncodeError;
use crate::leb128::{BufferType, write_bytes, write_sleb_big, write_uleb, write_uleb_big};
use crate::principal::Principal;
use crate::values::Value;
use knot_types::{Field, FuncType, Method, TypeId, TypeManager, TypeVisitor, Width};
use num_traits::ToPrimitive;
use std::marker::PhantomData;

/// Writes values into a message body, following the declared type.
///
/// Values are expected to be covariant already; a shape mismatch is still
/// reported instead of producing a corrupt buffer.
pub(super) struct ValueEncoder<'b, 'v> {
    buf: &'b mut BufferType,
    _value: PhantomData<&'v Value>,
}

impl<'b, 'v> ValueEncoder<'b, 'v> {
    pub(super) fn new(buf: &'b mut BufferType) -> Self {
        ValueEncoder {
            buf,
            _value: PhantomData,
        }
    }

    fn mismatch(mgr: &TypeManager, ty: TypeId) -> EncodeError {
        EncodeError::NotCovariant {
            signature: mgr.display(ty),
        }
    }

    fn write_principal(&mut self, p: &Principal) {
        self.buf.push(1);
        write_bytes(self.buf, p.as_slice());
    }
}

impl<'v> TypeVisitor for ValueEncoder<'_, 'v> {
    type Data = &'v Value;
    type Value = ();
    type Error = EncodeError;

    fn visit_type(&mut self, mgr: &TypeManager, ty: TypeId, _: &'v Value) -> Result<(), EncodeError> {
        Err(Self::mismatch(mgr, ty))
    }

    fn visit_null(&mut self, mgr: &TypeManager, ty: TypeId, v: &'v Value) -> Result<(), EncodeError> {
        match v {
            Value::Null => Ok(()),
            _ => Err(Self::mismatch(mgr, ty)),
        }
    }

    fn visit_bool(&mut self, mgr: &TypeManager, ty: TypeId, v: &'v Value) -> Result<(), EncodeError> {
        match v {
            Value::Bool(b) => {
                self.buf.push(*b as u8);
                Ok(())
            }
            _ => Err(Self::mismatch(mgr, ty)),
        }
    }

    fn visit_text(&mut self, mgr: &TypeManager, ty: TypeId, v: &'v Value) -> Result<(), EncodeError> {
        match v {
            Value::Text(s) => {
                write_bytes(self.buf, s.as_bytes());
                Ok(())
            }
            _ => Err(Self::mismatch(mgr, ty)),
        }
    }

    fn visit_float(&mut self, mgr: &TypeManager, ty: TypeId, v: &'v Value) -> Result<(), EncodeError> {
        match v {
            Value::Float(f) => {
                self.buf.extend_from_slice(&f.to_le_bytes());
                Ok(())
            }
            _ => Err(Self::mismatch(mgr, ty)),
        }
    }

    fn visit_principal(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        v: &'v Value,
    ) -> Result<(), EncodeError> {
        match v {
            Value::Principal(p) => {
                self.write_principal(p);
                Ok(())
            }
            _ => Err(Self::mismatch(mgr, ty)),
        }
    }

    fn visit_empty(&mut self, _: &TypeManager, _: TypeId, _: &'v Value) -> Result<(), EncodeError> {
        Err(EncodeError::EmptyValue)
    }

    fn visit_int(&mut self, mgr: &TypeManager, ty: TypeId, v: &'v Value) -> Result<(), EncodeError> {
        match v {
            Value::Int(n) => {
                write_sleb_big(self.buf, n);
                Ok(())
            }
            _ => Err(Self::mismatch(mgr, ty)),
        }
    }

    fn visit_nat(&mut self, mgr: &TypeManager, ty: TypeId, v: &'v Value) -> Result<(), EncodeError> {
        match v {
            Value::Int(n) => {
                let n = n.to_biguint().ok_or_else(|| Self::mismatch(mgr, ty))?;
                write_uleb_big(self.buf, &n);
                Ok(())
            }
            _ => Err(Self::mismatch(mgr, ty)),
        }
    }

    fn visit_fixed_int(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        width: Width,
        v: &'v Value,
    ) -> Result<(), EncodeError> {
        let n = match v {
            Value::Int(n) if crate::covariant::fixed_int_fits(width, n) => n.to_i64(),
            _ => None,
        };
        let n = n.ok_or_else(|| Self::mismatch(mgr, ty))?;
        // Truncating the two's complement form keeps the sign bits.
        self.buf.extend_from_slice(&n.to_le_bytes()[..width.bytes()]);
        Ok(())
    }

    fn visit_fixed_nat(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        width: Width,
        v: &'v Value,
    ) -> Result<(), EncodeError> {
        let n = match v {
            Value::Int(n) if crate::covariant::fixed_nat_fits(width, n) => n.to_u64(),
            _ => None,
        };
        let n = n.ok_or_else(|| Self::mismatch(mgr, ty))?;
        self.buf.extend_from_slice(&n.to_le_bytes()[..width.bytes()]);
        Ok(())
    }

    fn visit_opt(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        inner: TypeId,
        v: &'v Value,
    ) -> Result<(), EncodeError> {
        match v {
            Value::Opt(None) => {
                self.buf.push(0);
                Ok(())
            }
            Value::Opt(Some(x)) => {
                self.buf.push(1);
                mgr.accept(inner, self, &**x)
            }
            _ => Err(Self::mismatch(mgr, ty)),
        }
    }

    fn visit_vec(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        inner: TypeId,
        v: &'v Value,
    ) -> Result<(), EncodeError> {
        let Value::Vec(items) = v else {
            return Err(Self::mismatch(mgr, ty));
        };
        write_uleb(self.buf, items.len() as u64);
        for item in items {
            mgr.accept(inner, self, item)?;
        }
        Ok(())
    }

    fn visit_record(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        fields: &[Field],
        v: &'v Value,
    ) -> Result<(), EncodeError> {
        let Value::Record(map) = v else {
            return Err(Self::mismatch(mgr, ty));
        };
        for field in fields {
            let x = map.get(&field.name).ok_or_else(|| Self::mismatch(mgr, ty))?;
            mgr.accept(field.ty, self, x)?;
        }
        Ok(())
    }

    fn visit_variant(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        fields: &[Field],
        v: &'v Value,
    ) -> Result<(), EncodeError> {
        let (tag, x) = v.variant_tag().ok_or_else(|| Self::mismatch(mgr, ty))?;
        let idx = fields
            .iter()
            .position(|f| f.name == tag)
            .ok_or_else(|| Self::mismatch(mgr, ty))?;
        write_uleb(self.buf, idx as u64);
        mgr.accept(fields[idx].ty, self, x)
    }

    fn visit_func(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        _: &FuncType,
        v: &'v Value,
    ) -> Result<(), EncodeError> {
        let Value::Func(p, method) = v else {
            return Err(Self::mismatch(mgr, ty));
        };
        self.buf.push(1);
        self.write_principal(p);
        write_bytes(self.buf, method.as_bytes());
        Ok(())
    }

    fn visit_service(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        _: &[Method],
        v: &'v Value,
    ) -> Result<(), EncodeError> {
        let Value::Service(p) = v else {
            return Err(Self::mismatch(mgr, ty));
        };
        self.write_principal(p);
        Ok(())
    }
}
