//! Binary message format.
//!
//! A message is the magic `DIDL`, the type table, the argument count, one
//! type reference per argument and finally the argument values.
//!
//! Only the fields a record type declares are written. A value accepted by
//! [`covariant`] with extra record fields therefore decodes without them.
//!
//! # Example
//!
//! ```
//! use knot_core::types::TypeManager;
//! use knot_core::values::Value;
//! use knot_core::wire;
//!
//! let mut mgr = TypeManager::new();
//! let text = mgr.text();
//! let bytes = wire::encode(&mgr, &[text], &[Value::text("hi")]).unwrap();
//! assert_eq!(bytes, b"DIDL\x00\x01\x71\x02hi");
//! assert_eq!(wire::decode(&mgr, &[text], &bytes).unwrap(), [Value::text("hi")]);
//! ```

mod check;
mod decode;
mod encode;
mod error;

pub use error::{DecodeError, EncodeError};

use crate::covariant::covariant;
use crate::leb128::{BufferType, Reader, write_uleb};
use crate::options::DecodeOptions;
use crate::table::{TableBuilder, TypeTable};
use crate::values::Value;
use check::{Checker, WireTable};
use decode::ValueDecoder;
use encode::ValueEncoder;
use knot_types::{TypeId, TypeKind, TypeManager};
use tracing::{debug, trace};

pub const MAGIC: &[u8; 4] = b"DIDL";

/// Serialize `values` as arguments of types `arg_types`.
pub fn encode(
    mgr: &TypeManager,
    arg_types: &[TypeId],
    values: &[Value],
) -> Result<Vec<u8>, EncodeError> {
    if arg_types.len() != values.len() {
        return Err(EncodeError::ArityMismatch {
            expected: arg_types.len(),
            found: values.len(),
        });
    }
    for (&ty, value) in arg_types.iter().zip(values) {
        mgr.check_closed(ty)?;
        if matches!(mgr.kind(mgr.resolve(ty)?), TypeKind::Empty) {
            return Err(EncodeError::EmptyValue);
        }
        if !covariant(mgr, ty, value)? {
            return Err(EncodeError::NotCovariant {
                signature: mgr.display(ty),
            });
        }
    }

    let mut table = TypeTable::new();
    let mut refs = Vec::with_capacity(arg_types.len());
    for &ty in arg_types {
        refs.push(TableBuilder::new(&mut table).build(mgr, ty)?);
    }
    debug!(args = arg_types.len(), types = table.len(), "encoding message");

    let mut buf = BufferType::new();
    buf.extend_from_slice(MAGIC);
    table.encode(&mut buf)?;
    write_uleb(&mut buf, refs.len() as u64);
    for r in refs {
        table.encode_ref(&mut buf, r)?;
    }
    let mut encoder = ValueEncoder::new(&mut buf);
    for (&ty, value) in arg_types.iter().zip(values) {
        mgr.accept(ty, &mut encoder, value)?;
    }
    Ok(buf.into_vec())
}

/// Deserialize arguments of types `arg_types` with default limits.
pub fn decode(
    mgr: &TypeManager,
    arg_types: &[TypeId],
    bytes: &[u8],
) -> Result<Vec<Value>, DecodeError> {
    decode_with(&DecodeOptions::default(), mgr, arg_types, bytes)
}

/// Deserialize arguments of types `arg_types`.
///
/// The message may carry more arguments than declared; the extra ones are
/// read and dropped. Fewer arguments than declared is an error, as is any
/// byte left over after the last argument.
pub fn decode_with(
    options: &DecodeOptions,
    mgr: &TypeManager,
    arg_types: &[TypeId],
    bytes: &[u8],
) -> Result<Vec<Value>, DecodeError> {
    for &ty in arg_types {
        mgr.check_closed(ty)?;
    }

    let mut reader = Reader::new(bytes);
    if bytes.get(..MAGIC.len()) != Some(&MAGIC[..]) {
        return Err(DecodeError::BadMagic);
    }
    reader.read_bytes(MAGIC.len())?;

    let table = WireTable::parse(&mut reader)?;
    let count = reader.read_len()?;
    let mut wire_args = Vec::new();
    for _ in 0..count {
        wire_args.push(table.read_ref(&mut reader)?);
    }
    if wire_args.len() < arg_types.len() {
        return Err(DecodeError::ArityMismatch {
            expected: arg_types.len(),
            found: wire_args.len(),
        });
    }

    let mut checker = Checker::new(mgr, &table);
    for (&ty, &wire) in arg_types.iter().zip(&wire_args) {
        checker.check(ty, wire)?;
    }

    let mut values = Vec::with_capacity(arg_types.len());
    {
        let mut decoder = ValueDecoder::new(&mut reader, options);
        for &ty in arg_types {
            values.push(mgr.accept(ty, &mut decoder, ())?);
        }
    }
    for &wire in &wire_args[arg_types.len()..] {
        trace!(wire, "skipping extra argument");
        table.skip(&mut reader, wire, 0, options)?;
    }

    if reader.remaining() > 0 {
        return Err(DecodeError::TrailingBytes {
            offset: reader.offset(),
            remaining: reader.remaining(),
        });
    }
    debug!(
        args = values.len(),
        extra = wire_args.len() - arg_types.len(),
        types = table.len(),
        "decoded message"
    );
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::Principal;
    use knot_types::{FuncModes, Width};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arity_mismatch() {
        let mut mgr = TypeManager::new();
        let nat = mgr.nat();
        assert_eq!(
            encode(&mgr, &[nat, nat], &[Value::int(1)]),
            Err(EncodeError::ArityMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_not_covariant_names_the_type() {
        let mut mgr = TypeManager::new();
        let nat8 = mgr.fixed_nat(Width::W8);
        let opt = mgr.opt(nat8);
        let err = encode(&mgr, &[opt], &[Value::some(Value::int(256))]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid opt nat8 argument");
    }

    #[test]
    fn test_empty_cannot_be_encoded() {
        let mut mgr = TypeManager::new();
        let empty = mgr.empty();
        assert_eq!(
            encode(&mgr, &[empty], &[Value::Null]),
            Err(EncodeError::EmptyValue)
        );
    }

    #[test]
    fn test_extra_record_fields_are_dropped() {
        let mut mgr = TypeManager::new();
        let nat = mgr.nat();
        let ty = mgr.record([("a", nat)]).unwrap();
        let value = Value::record([("a", Value::int(1)), ("b", Value::text("x"))]);

        let bytes = encode(&mgr, &[ty], &[value]).unwrap();
        assert_eq!(
            decode(&mgr, &[ty], &bytes).unwrap(),
            [Value::record([("a", Value::int(1))])]
        );
    }

    #[test]
    fn test_fixed_width_layout() {
        let mut mgr = TypeManager::new();
        let int16 = mgr.fixed_int(Width::W16);
        let nat32 = mgr.fixed_nat(Width::W32);
        let bytes = encode(&mgr, &[int16, nat32], &[Value::int(-2), Value::int(258)]).unwrap();
        assert_eq!(
            bytes,
            [b'D', b'I', b'D', b'L', 0, 2, 0x76, 0x79, 0xfe, 0xff, 0x02, 0x01, 0, 0]
        );
        assert_eq!(
            decode(&mgr, &[int16, nat32], &bytes).unwrap(),
            [Value::int(-2), Value::int(258)]
        );
    }

    #[test]
    fn test_references() {
        let mut mgr = TypeManager::new();
        let nat = mgr.nat();
        let func = mgr.func([nat], [nat], FuncModes::QUERY);
        let service = mgr.service([("get", func)]).unwrap();
        let principal = mgr.principal();

        let p = Principal::from_slice(&[0xca, 0xfe]);
        let values = [
            Value::Principal(p.clone()),
            Value::Func(p.clone(), "get".into()),
            Value::Service(p.clone()),
        ];
        let types = [principal, func, service];
        let bytes = encode(&mgr, &types, &values).unwrap();
        // values: principal, func, service
        assert!(bytes.ends_with(&[
            1, 2, 0xca, 0xfe, // principal
            1, 1, 2, 0xca, 0xfe, 3, b'g', b'e', b't', // func
            1, 2, 0xca, 0xfe, // service
        ]));
        assert_eq!(decode(&mgr, &types, &bytes).unwrap(), values);
    }

    #[test]
    fn test_invalid_reference_tag() {
        let mut mgr = TypeManager::new();
        let principal = mgr.principal();
        assert_eq!(
            decode(&mgr, &[principal], b"DIDL\x00\x01\x68\x00\x00"),
            Err(DecodeError::InvalidReference { byte: 0 })
        );
    }

    #[test]
    fn test_extra_arguments_are_skipped() {
        let mut mgr = TypeManager::new();
        let nat = mgr.nat();
        let text = mgr.text();
        let opt = mgr.opt(text);
        let bytes = encode(
            &mgr,
            &[nat, opt, text],
            &[Value::int(5), Value::some(Value::text("x")), Value::text("yz")],
        )
        .unwrap();
        assert_eq!(decode(&mgr, &[nat], &bytes).unwrap(), [Value::int(5)]);
        assert!(decode(&mgr, &[], &bytes).unwrap().is_empty());
    }

    #[test]
    fn test_declared_type_must_match_wire_type() {
        let mut mgr = TypeManager::new();
        let nat = mgr.nat();
        let text = mgr.text();
        let bytes = encode(&mgr, &[nat], &[Value::int(5)]).unwrap();
        assert_eq!(
            decode(&mgr, &[text], &bytes),
            Err(DecodeError::TypeMismatch {
                expected: "text".into(),
                found: "nat".into(),
            })
        );
    }

    #[test]
    fn test_vec_limit() {
        let mut mgr = TypeManager::new();
        let null = mgr.null();
        let vec = mgr.vec(null);
        let bytes = encode(&mgr, &[vec], &[Value::Vec(vec![Value::Null; 4])]).unwrap();
        let options = DecodeOptions {
            max_vec_len: 3,
            ..Default::default()
        };
        assert!(matches!(
            decode_with(&options, &mgr, &[vec], &bytes),
            Err(DecodeError::OutOfRange { .. })
        ));
        assert!(decode(&mgr, &[vec], &bytes).is_ok());
    }

    #[test]
    fn test_zero_sized_elements_are_budgeted() {
        let mut mgr = TypeManager::new();
        let null = mgr.null();
        let vec = mgr.vec(null);

        // vec null claiming 1 << 24 elements in a 13 byte message
        let hostile = hex::decode("4449444c016d7f010080808008").unwrap();
        assert!(matches!(
            decode(&mgr, &[vec], &hostile),
            Err(DecodeError::OutOfRange { .. })
        ));

        // The budget covers every vector of the message.
        let unit = mgr.record::<_, &str>([]).unwrap();
        let units = mgr.vec(unit);
        let values = [
            Value::Vec(vec![Value::Null; 2]),
            Value::Vec(vec![Value::record::<_, &str>([]); 2]),
        ];
        let bytes = encode(&mgr, &[vec, units], &values).unwrap();
        let options = DecodeOptions {
            max_zero_sized: 3,
            ..Default::default()
        };
        assert!(matches!(
            decode_with(&options, &mgr, &[vec, units], &bytes),
            Err(DecodeError::OutOfRange { .. })
        ));
        assert_eq!(decode(&mgr, &[vec, units], &bytes).unwrap(), values);
    }

    #[test]
    fn test_vec_len_bounded_by_buffer() {
        let mut mgr = TypeManager::new();
        let nat8 = mgr.fixed_nat(Width::W8);
        let vec = mgr.vec(nat8);
        // vec nat8 claiming 1000 elements followed by two bytes
        let bytes = hex::decode("4449444c016d7b0100e8070102").unwrap();
        assert_eq!(
            decode(&mgr, &[vec], &bytes),
            Err(DecodeError::Truncated { needed: 998 })
        );
    }

    #[test]
    fn test_depth_limit() {
        // μx.opt x, nested five deep
        let mut mgr = TypeManager::new();
        let knot = mgr.rec();
        let body = mgr.opt(knot);
        mgr.fill(knot, body).unwrap();

        let mut value = Value::none();
        for _ in 0..5 {
            value = Value::some(value);
        }
        let bytes = encode(&mgr, &[knot], &[value.clone()]).unwrap();
        let options = DecodeOptions {
            max_depth: 3,
            ..Default::default()
        };
        assert_eq!(
            decode_with(&options, &mgr, &[knot], &bytes),
            Err(DecodeError::TooDeep { depth: 3 })
        );
        assert_eq!(decode(&mgr, &[knot], &bytes).unwrap(), [value]);
    }
}
