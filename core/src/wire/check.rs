//! The type table of a received message.
//!
//! Wire types are parsed into [`WireTable`], every reference is validated
//! up front, and each declared argument type is then matched against its
//! wire type before any value is read.

use super::DecodeError;
use crate::leb128::Reader;
use crate::options::DecodeOptions;
use crate::table::{opcode, primitive_opcode};
use hashbrown::HashSet;
use knot_types::{TypeId, TypeKind, TypeManager};
use tracing::trace;

/// A wire type reference: negative primitive opcode or table index.
pub(super) type WireRef = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum WireType {
    Opt(WireRef),
    Vec(WireRef),
    Record(Vec<(u32, WireRef)>),
    Variant(Vec<(u32, WireRef)>),
    Func {
        args: Vec<WireRef>,
        rets: Vec<WireRef>,
        annotations: Vec<u8>,
    },
    Service(Vec<(String, WireRef)>),
}

impl WireType {
    fn keyword(&self) -> &'static str {
        match self {
            WireType::Opt(_) => "opt",
            WireType::Vec(_) => "vec",
            WireType::Record(_) => "record",
            WireType::Variant(_) => "variant",
            WireType::Func { .. } => "func",
            WireType::Service(_) => "service",
        }
    }
}

fn primitive_name(op: i64) -> Option<&'static str> {
    let name = match op {
        opcode::NULL => "null",
        opcode::BOOL => "bool",
        opcode::NAT => "nat",
        opcode::INT => "int",
        opcode::NAT8 => "nat8",
        opcode::NAT16 => "nat16",
        opcode::NAT32 => "nat32",
        opcode::NAT64 => "nat64",
        opcode::INT8 => "int8",
        opcode::INT16 => "int16",
        opcode::INT32 => "int32",
        opcode::INT64 => "int64",
        opcode::FLOAT64 => "float64",
        opcode::TEXT => "text",
        opcode::EMPTY => "empty",
        opcode::PRINCIPAL => "principal",
        _ => return None,
    };
    Some(name)
}

#[derive(Debug, Default)]
pub(super) struct WireTable {
    types: Vec<WireType>,
}

impl WireTable {
    pub(super) fn parse(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let count = reader.read_len()?;
        let mut types = Vec::new();
        for _ in 0..count {
            let op = reader.read_sleb()?;
            let ty = match op {
                opcode::OPT => WireType::Opt(reader.read_sleb()?),
                opcode::VEC => WireType::Vec(reader.read_sleb()?),
                opcode::RECORD | opcode::VARIANT => {
                    let len = reader.read_len()?;
                    let mut fields = Vec::new();
                    for _ in 0..len {
                        let at = reader.offset();
                        let hash = u32::try_from(reader.read_uleb()?)
                            .map_err(|_| DecodeError::InvalidVarint { offset: at })?;
                        fields.push((hash, reader.read_sleb()?));
                    }
                    if op == opcode::RECORD {
                        WireType::Record(fields)
                    } else {
                        WireType::Variant(fields)
                    }
                }
                opcode::FUNC => {
                    let args = read_refs(reader)?;
                    let rets = read_refs(reader)?;
                    let len = reader.read_len()?;
                    let annotations = reader.read_bytes(len)?.to_vec();
                    for &a in &annotations {
                        if a != opcode::QUERY && a != opcode::ONEWAY {
                            return Err(DecodeError::InvalidOpcode { opcode: a as i64 });
                        }
                    }
                    WireType::Func {
                        args,
                        rets,
                        annotations,
                    }
                }
                opcode::SERVICE => {
                    let len = reader.read_len()?;
                    let mut methods = Vec::new();
                    for _ in 0..len {
                        let name = read_text(reader)?;
                        methods.push((name, reader.read_sleb()?));
                    }
                    WireType::Service(methods)
                }
                _ => return Err(DecodeError::InvalidOpcode { opcode: op }),
            };
            types.push(ty);
        }

        let table = WireTable { types };
        table.validate()?;
        trace!(types = table.len(), "parsed type table");
        Ok(table)
    }

    pub(super) fn len(&self) -> usize {
        self.types.len()
    }

    /// Read one argument type reference and validate it.
    pub(super) fn read_ref(&self, reader: &mut Reader<'_>) -> Result<WireRef, DecodeError> {
        let r = reader.read_sleb()?;
        self.check_ref(r)?;
        Ok(r)
    }

    fn check_ref(&self, r: WireRef) -> Result<(), DecodeError> {
        if r >= 0 {
            if r as u64 >= self.types.len() as u64 {
                return Err(DecodeError::TypeIndexOutOfRange {
                    index: r,
                    len: self.types.len(),
                });
            }
        } else if primitive_name(r).is_none() {
            return Err(DecodeError::InvalidOpcode { opcode: r });
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), DecodeError> {
        for ty in &self.types {
            match ty {
                WireType::Opt(r) | WireType::Vec(r) => self.check_ref(*r)?,
                WireType::Record(fields) | WireType::Variant(fields) => {
                    for (_, r) in fields {
                        self.check_ref(*r)?;
                    }
                }
                WireType::Func { args, rets, .. } => {
                    for r in args.iter().chain(rets) {
                        self.check_ref(*r)?;
                    }
                }
                WireType::Service(methods) => {
                    for (_, r) in methods {
                        self.check_ref(*r)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Table entry of a validated non-negative reference.
    fn entry(&self, r: WireRef) -> Option<&WireType> {
        usize::try_from(r).ok().and_then(|i| self.types.get(i))
    }

    pub(super) fn describe(&self, r: WireRef) -> String {
        match (primitive_name(r), self.entry(r)) {
            (Some(name), _) => name.to_string(),
            (None, Some(ty)) => format!("{} (type {})", ty.keyword(), r),
            (None, None) => format!("type {}", r),
        }
    }

    /// Consume one value of wire type `r` without building it.
    pub(super) fn skip(
        &self,
        reader: &mut Reader<'_>,
        r: WireRef,
        depth: usize,
        options: &DecodeOptions,
    ) -> Result<(), DecodeError> {
        if depth > options.max_depth {
            return Err(DecodeError::TooDeep {
                depth: options.max_depth,
            });
        }
        match r {
            opcode::NULL => {}
            opcode::BOOL => {
                let byte = reader.read_byte()?;
                if byte > 1 {
                    return Err(DecodeError::InvalidBool { byte });
                }
            }
            opcode::NAT => {
                reader.read_uleb_big()?;
            }
            opcode::INT => {
                reader.read_sleb_big()?;
            }
            opcode::NAT8 | opcode::INT8 => {
                reader.read_bytes(1)?;
            }
            opcode::NAT16 | opcode::INT16 => {
                reader.read_bytes(2)?;
            }
            opcode::NAT32 | opcode::INT32 => {
                reader.read_bytes(4)?;
            }
            opcode::NAT64 | opcode::INT64 | opcode::FLOAT64 => {
                reader.read_bytes(8)?;
            }
            opcode::TEXT => {
                read_text(reader)?;
            }
            opcode::EMPTY => return Err(DecodeError::EmptyValue),
            opcode::PRINCIPAL => skip_principal(reader)?,
            _ => match self.entry(r) {
                Some(WireType::Opt(inner)) => match reader.read_byte()? {
                    0 => {}
                    1 => self.skip(reader, *inner, depth + 1, options)?,
                    byte => return Err(DecodeError::InvalidOptTag { byte }),
                },
                Some(WireType::Vec(inner)) => {
                    let len = reader.read_len()?;
                    if len > options.max_vec_len {
                        return Err(DecodeError::OutOfRange {
                            offset: reader.offset(),
                            ty: self.describe(r),
                        });
                    }
                    for _ in 0..len {
                        self.skip(reader, *inner, depth + 1, options)?;
                    }
                }
                Some(WireType::Record(fields)) => {
                    for (_, field) in fields {
                        self.skip(reader, *field, depth + 1, options)?;
                    }
                }
                Some(WireType::Variant(fields)) => {
                    let tag = reader.read_uleb()?;
                    let (_, arm) = usize::try_from(tag)
                        .ok()
                        .and_then(|i| fields.get(i))
                        .ok_or(DecodeError::TagOutOfRange {
                            tag,
                            count: fields.len(),
                        })?;
                    self.skip(reader, *arm, depth + 1, options)?;
                }
                Some(WireType::Func { .. }) => {
                    let byte = reader.read_byte()?;
                    if byte != 1 {
                        return Err(DecodeError::InvalidReference { byte });
                    }
                    skip_principal(reader)?;
                    read_text(reader)?;
                }
                Some(WireType::Service(_)) => skip_principal(reader)?,
                None => {
                    return Err(DecodeError::TypeIndexOutOfRange {
                        index: r,
                        len: self.types.len(),
                    });
                }
            },
        }
        Ok(())
    }
}

fn read_refs(reader: &mut Reader<'_>) -> Result<Vec<WireRef>, DecodeError> {
    let len = reader.read_len()?;
    (0..len).map(|_| reader.read_sleb()).collect()
}

pub(super) fn read_text(reader: &mut Reader<'_>) -> Result<String, DecodeError> {
    let len = reader.read_len()?;
    let offset = reader.offset();
    let bytes = reader.read_bytes(len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8 { offset })
}

fn skip_principal(reader: &mut Reader<'_>) -> Result<(), DecodeError> {
    let byte = reader.read_byte()?;
    if byte != 1 {
        return Err(DecodeError::InvalidReference { byte });
    }
    let len = reader.read_len()?;
    reader.read_bytes(len)?;
    Ok(())
}

/// Structural match of declared types against wire types.
///
/// Recursive types are compared coinductively: a pair already under
/// comparison is assumed to match.
pub(super) struct Checker<'a> {
    mgr: &'a TypeManager,
    table: &'a WireTable,
    assumed: HashSet<(TypeId, WireRef)>,
}

impl<'a> Checker<'a> {
    pub(super) fn new(mgr: &'a TypeManager, table: &'a WireTable) -> Self {
        Checker {
            mgr,
            table,
            assumed: HashSet::new(),
        }
    }

    pub(super) fn check(&mut self, declared: TypeId, wire: WireRef) -> Result<(), DecodeError> {
        let ty = self.mgr.resolve(declared)?;
        if !self.assumed.insert((ty, wire)) {
            return Ok(());
        }

        let kind = self.mgr.kind(ty);
        if let Some(op) = primitive_opcode(kind) {
            return if op == wire {
                Ok(())
            } else {
                Err(self.mismatch(ty, wire))
            };
        }

        let Some(entry) = self.table.entry(wire) else {
            return Err(self.mismatch(ty, wire));
        };
        match (kind, entry) {
            (TypeKind::Opt(inner), WireType::Opt(w)) | (TypeKind::Vec(inner), WireType::Vec(w)) => {
                self.check(*inner, *w)
            }
            (TypeKind::Record(fields), WireType::Record(wire_fields))
            | (TypeKind::Variant(fields), WireType::Variant(wire_fields)) => {
                if fields.len() != wire_fields.len()
                    || fields.iter().zip(wire_fields).any(|(f, (h, _))| f.hash != *h)
                {
                    return Err(self.mismatch(ty, wire));
                }
                for (field, (_, w)) in fields.iter().zip(wire_fields) {
                    self.check(field.ty, *w)?;
                }
                Ok(())
            }
            (
                TypeKind::Func(func),
                WireType::Func {
                    args,
                    rets,
                    annotations,
                },
            ) => {
                let query = annotations.contains(&opcode::QUERY);
                let oneway = annotations.contains(&opcode::ONEWAY);
                if func.args.len() != args.len()
                    || func.rets.len() != rets.len()
                    || func.is_query() != query
                    || func.is_oneway() != oneway
                {
                    return Err(self.mismatch(ty, wire));
                }
                for (t, w) in func.args.iter().zip(args).chain(func.rets.iter().zip(rets)) {
                    self.check(*t, *w)?;
                }
                Ok(())
            }
            (TypeKind::Service(methods), WireType::Service(wire_methods)) => {
                if methods.len() != wire_methods.len()
                    || methods.iter().zip(wire_methods).any(|(m, (n, _))| m.name != *n)
                {
                    return Err(self.mismatch(ty, wire));
                }
                for (method, (_, w)) in methods.iter().zip(wire_methods) {
                    self.check(method.ty, *w)?;
                }
                Ok(())
            }
            _ => Err(self.mismatch(ty, wire)),
        }
    }

    fn mismatch(&self, ty: TypeId, wire: WireRef) -> DecodeError {
        DecodeError::TypeMismatch {
            expected: self.mgr.display(ty),
            found: self.table.describe(wire),
        }
    }
}
