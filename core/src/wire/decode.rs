use super::DecodeError;
use super::check::read_text;
use crate::leb128::Reader;
use crate::options::DecodeOptions;
use crate::principal::Principal;
use crate::values::Value;
use knot_types::{Field, FuncType, Method, TypeId, TypeKind, TypeManager, TypeVisitor, Width};
use num_bigint::BigInt;
use std::collections::BTreeMap;

/// Reads values of the declared types. The wire types must already have
/// been checked against them.
pub(super) struct ValueDecoder<'r, 'a> {
    reader: &'r mut Reader<'a>,
    options: &'r DecodeOptions,
    depth: usize,
    /// Vector elements read so far that took no bytes.
    zero_sized: usize,
}

/// Whether values of `ty` are encoded with no bytes at all.
///
/// Closed types have no cycle made of records alone, so this terminates.
fn is_zero_sized(mgr: &TypeManager, ty: TypeId) -> bool {
    match mgr.kind(ty) {
        TypeKind::Null => true,
        TypeKind::Record(fields) => fields.iter().all(|f| is_zero_sized(mgr, f.ty)),
        TypeKind::Knot(Some(target)) => is_zero_sized(mgr, *target),
        _ => false,
    }
}

impl<'r, 'a> ValueDecoder<'r, 'a> {
    pub(super) fn new(reader: &'r mut Reader<'a>, options: &'r DecodeOptions) -> Self {
        ValueDecoder {
            reader,
            options,
            depth: 0,
            zero_sized: 0,
        }
    }

    fn nested(&mut self, mgr: &TypeManager, ty: TypeId) -> Result<Value, DecodeError> {
        if self.depth >= self.options.max_depth {
            return Err(DecodeError::TooDeep {
                depth: self.options.max_depth,
            });
        }
        self.depth += 1;
        let value = mgr.accept(ty, self, ());
        self.depth -= 1;
        value
    }

    fn read_principal(&mut self) -> Result<Principal, DecodeError> {
        let byte = self.reader.read_byte()?;
        if byte != 1 {
            return Err(DecodeError::InvalidReference { byte });
        }
        let len = self.reader.read_len()?;
        Ok(Principal::from_slice(self.reader.read_bytes(len)?))
    }

    fn read_fixed(&mut self, width: Width) -> Result<[u8; 8], DecodeError> {
        let bytes = self.reader.read_bytes(width.bytes())?;
        let mut out = [0u8; 8];
        out[..bytes.len()].copy_from_slice(bytes);
        Ok(out)
    }
}

impl TypeVisitor for ValueDecoder<'_, '_> {
    type Data = ();
    type Value = Value;
    type Error = DecodeError;

    fn visit_type(&mut self, mgr: &TypeManager, ty: TypeId, _: ()) -> Result<Value, DecodeError> {
        Err(DecodeError::TypeMismatch {
            expected: mgr.display(ty),
            found: "unsupported type".into(),
        })
    }

    fn visit_null(&mut self, _: &TypeManager, _: TypeId, _: ()) -> Result<Value, DecodeError> {
        Ok(Value::Null)
    }

    fn visit_bool(&mut self, _: &TypeManager, _: TypeId, _: ()) -> Result<Value, DecodeError> {
        match self.reader.read_byte()? {
            0 => Ok(Value::Bool(false)),
            1 => Ok(Value::Bool(true)),
            byte => Err(DecodeError::InvalidBool { byte }),
        }
    }

    fn visit_text(&mut self, _: &TypeManager, _: TypeId, _: ()) -> Result<Value, DecodeError> {
        Ok(Value::Text(read_text(self.reader)?))
    }

    fn visit_float(&mut self, _: &TypeManager, _: TypeId, _: ()) -> Result<Value, DecodeError> {
        let bytes = self.read_fixed(Width::W64)?;
        Ok(Value::Float(f64::from_le_bytes(bytes)))
    }

    fn visit_principal(&mut self, _: &TypeManager, _: TypeId, _: ()) -> Result<Value, DecodeError> {
        Ok(Value::Principal(self.read_principal()?))
    }

    fn visit_empty(&mut self, _: &TypeManager, _: TypeId, _: ()) -> Result<Value, DecodeError> {
        Err(DecodeError::EmptyValue)
    }

    fn visit_int(&mut self, _: &TypeManager, _: TypeId, _: ()) -> Result<Value, DecodeError> {
        Ok(Value::Int(self.reader.read_sleb_big()?))
    }

    fn visit_nat(&mut self, _: &TypeManager, _: TypeId, _: ()) -> Result<Value, DecodeError> {
        Ok(Value::Int(BigInt::from(self.reader.read_uleb_big()?)))
    }

    fn visit_fixed_int(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        width: Width,
        _: (),
    ) -> Result<Value, DecodeError> {
        let mut bytes = self.read_fixed(width)?;
        let len = width.bytes();
        if bytes[len - 1] & 0x80 != 0 {
            bytes[len..].fill(0xff);
        }
        Ok(Value::int(i64::from_le_bytes(bytes)))
    }

    fn visit_fixed_nat(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        width: Width,
        _: (),
    ) -> Result<Value, DecodeError> {
        let bytes = self.read_fixed(width)?;
        Ok(Value::int(u64::from_le_bytes(bytes)))
    }

    fn visit_opt(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        inner: TypeId,
        _: (),
    ) -> Result<Value, DecodeError> {
        match self.reader.read_byte()? {
            0 => Ok(Value::none()),
            1 => Ok(Value::some(self.nested(mgr, inner)?)),
            byte => Err(DecodeError::InvalidOptTag { byte }),
        }
    }

    fn visit_vec(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        inner: TypeId,
        _: (),
    ) -> Result<Value, DecodeError> {
        let offset = self.reader.offset();
        let len = self.reader.read_len()?;
        let out_of_range = || DecodeError::OutOfRange {
            offset,
            ty: mgr.display(ty),
        };
        if len > self.options.max_vec_len {
            return Err(out_of_range());
        }
        if is_zero_sized(mgr, inner) {
            self.zero_sized = self.zero_sized.saturating_add(len);
            if self.zero_sized > self.options.max_zero_sized {
                return Err(out_of_range());
            }
        } else if len > self.reader.remaining() {
            // Every element takes at least one byte.
            return Err(DecodeError::Truncated {
                needed: len - self.reader.remaining(),
            });
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.nested(mgr, inner)?);
        }
        Ok(Value::Vec(items))
    }

    fn visit_record(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        fields: &[Field],
        _: (),
    ) -> Result<Value, DecodeError> {
        let mut map = BTreeMap::new();
        for field in fields {
            map.insert(field.name.clone(), self.nested(mgr, field.ty)?);
        }
        Ok(Value::Record(map))
    }

    fn visit_variant(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        fields: &[Field],
        _: (),
    ) -> Result<Value, DecodeError> {
        let tag = self.reader.read_uleb()?;
        let field = usize::try_from(tag)
            .ok()
            .and_then(|i| fields.get(i))
            .ok_or(DecodeError::TagOutOfRange {
                tag,
                count: fields.len(),
            })?;
        let value = self.nested(mgr, field.ty)?;
        Ok(Value::variant(field.name.clone(), value))
    }

    fn visit_func(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        _: &FuncType,
        _: (),
    ) -> Result<Value, DecodeError> {
        let byte = self.reader.read_byte()?;
        if byte != 1 {
            return Err(DecodeError::InvalidReference { byte });
        }
        let principal = self.read_principal()?;
        let method = read_text(self.reader)?;
        Ok(Value::Func(principal, method))
    }

    fn visit_service(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        _: &[Method],
        _: (),
    ) -> Result<Value, DecodeError> {
        Ok(Value::Service(self.read_principal()?))
    }
}
