//! Decoding of hand-written messages, including malformed ones.

use knot_core::types::{TypeId, TypeManager, Width};
use knot_core::values::Value;
use knot_core::wire::{self, DecodeError};
use pretty_assertions::assert_eq;

fn decode_hex(mgr: &TypeManager, types: &[TypeId], input: &str) -> Result<Vec<Value>, DecodeError> {
    let bytes = hex::decode(input).unwrap();
    wire::decode(mgr, types, &bytes)
}

/// Decode a single argument of `ty` given its value bytes, e.g. `("7e", "01")`.
fn decode_one(mgr: &TypeManager, ty: TypeId, opcode: &str, value: &str) -> Result<Value, DecodeError> {
    let input = format!("4449444c0001{}{}", opcode, value);
    decode_hex(mgr, &[ty], &input).map(|mut values| values.remove(0))
}

#[test]
fn test_magic() {
    let mgr = TypeManager::new();
    for input in ["", "00", "0000", "4441444c", "4441444c0000", "4449444c"] {
        let result = decode_hex(&mgr, &[], input);
        assert!(result.is_err(), "{} should not decode", input);
    }
    assert_eq!(decode_hex(&mgr, &[], ""), Err(DecodeError::BadMagic));
    assert_eq!(decode_hex(&mgr, &[], "4441444c0000"), Err(DecodeError::BadMagic));
}

#[test]
fn test_nullary() {
    let mut mgr = TypeManager::new();
    assert_eq!(decode_hex(&mgr, &[], "4449444c0000"), Ok(vec![]));
    // Overlong table length and argument count.
    assert_eq!(decode_hex(&mgr, &[], "4449444c800000"), Ok(vec![]));
    assert_eq!(decode_hex(&mgr, &[], "4449444c008000"), Ok(vec![]));
    assert_eq!(
        decode_hex(&mgr, &[], "4449444c000000"),
        Err(DecodeError::TrailingBytes {
            offset: 6,
            remaining: 1
        })
    );
    // Extra arguments are ignored.
    assert_eq!(decode_hex(&mgr, &[], "4449444c00017f"), Ok(vec![]));

    let null = mgr.null();
    assert_eq!(decode_hex(&mgr, &[null], "4449444c00017f"), Ok(vec![Value::Null]));
    assert!(matches!(
        decode_hex(&mgr, &[null], "4449444c00017f00"),
        Err(DecodeError::TrailingBytes { .. })
    ));
    assert_eq!(
        decode_hex(&mgr, &[null], "4449444c0000"),
        Err(DecodeError::ArityMismatch {
            expected: 1,
            found: 0
        })
    );
}

#[test]
fn test_bool() {
    let mut mgr = TypeManager::new();
    let bool = mgr.bool();
    assert_eq!(decode_one(&mgr, bool, "7e", "00"), Ok(Value::Bool(false)));
    assert_eq!(decode_one(&mgr, bool, "7e", "01"), Ok(Value::Bool(true)));
    assert_eq!(
        decode_one(&mgr, bool, "7e", "02"),
        Err(DecodeError::InvalidBool { byte: 2 })
    );
    assert_eq!(
        decode_one(&mgr, bool, "7e", "ff"),
        Err(DecodeError::InvalidBool { byte: 0xff })
    );
    assert!(matches!(
        decode_one(&mgr, bool, "7e", ""),
        Err(DecodeError::Truncated { .. })
    ));
}

#[test]
fn test_nat() {
    let mut mgr = TypeManager::new();
    let nat = mgr.nat();
    for (bytes, expected) in [
        ("00", 0),
        ("01", 1),
        ("7f", 127),
        ("8001", 128),
        ("ff7f", 16383),
        // Overlong encodings are accepted.
        ("8000", 0),
        ("ff00", 127),
    ] {
        assert_eq!(
            decode_one(&mgr, nat, "7d", bytes),
            Ok(Value::int(expected)),
            "nat {}",
            bytes
        );
    }
    assert!(decode_one(&mgr, nat, "7d", "80").is_err());
}

#[test]
fn test_int() {
    let mut mgr = TypeManager::new();
    let int = mgr.int();
    for (bytes, expected) in [
        ("00", 0),
        ("01", 1),
        ("7f", -1),
        ("40", -64),
        ("8001", 128),
        ("ff00", 127),
        ("807f", -128),
    ] {
        assert_eq!(
            decode_one(&mgr, int, "7c", bytes),
            Ok(Value::int(expected)),
            "int {}",
            bytes
        );
    }
    assert!(decode_one(&mgr, int, "7c", "80").is_err());
}

#[test]
fn test_fixed_width() {
    let mut mgr = TypeManager::new();
    let nat8 = mgr.fixed_nat(Width::W8);
    let nat16 = mgr.fixed_nat(Width::W16);
    let int32 = mgr.fixed_int(Width::W32);
    let int64 = mgr.fixed_int(Width::W64);

    assert_eq!(decode_one(&mgr, nat8, "7b", "ff"), Ok(Value::int(255)));
    assert!(decode_one(&mgr, nat8, "7b", "").is_err());
    assert_eq!(decode_one(&mgr, nat16, "7a", "3412"), Ok(Value::int(0x1234)));
    assert!(decode_one(&mgr, nat16, "7a", "34").is_err());
    assert_eq!(decode_one(&mgr, int32, "75", "feffffff"), Ok(Value::int(-2)));
    assert!(decode_one(&mgr, int32, "75", "feffff").is_err());
    assert_eq!(
        decode_one(&mgr, int64, "74", "0000000000000080"),
        Ok(Value::int(i64::MIN))
    );
    assert!(decode_one(&mgr, int64, "74", "00000000000000").is_err());
}

#[test]
fn test_text() {
    let mut mgr = TypeManager::new();
    let text = mgr.text();
    assert_eq!(
        decode_one(&mgr, text, "71", "064d6f746f6b6f"),
        Ok(Value::text("Motoko"))
    );
    assert_eq!(
        decode_one(&mgr, text, "71", "86004d6f746f6b6f"),
        Ok(Value::text("Motoko"))
    );
    assert_eq!(decode_one(&mgr, text, "71", "03e29883"), Ok(Value::text("☃")));

    // Declared length shorter than the payload leaves bytes behind.
    assert!(matches!(
        decode_one(&mgr, text, "71", "054d6f746f6b6f"),
        Err(DecodeError::TrailingBytes { .. })
    ));
    assert!(matches!(
        decode_one(&mgr, text, "71", "074d6f746f6b6f"),
        Err(DecodeError::Truncated { .. })
    ));
    assert!(matches!(
        decode_one(&mgr, text, "71", "03e228a1"),
        Err(DecodeError::InvalidUtf8 { .. })
    ));
    assert!(decode_one(&mgr, text, "71", "02e29883").is_err());
}

#[test]
fn test_empty_has_no_value() {
    let mut mgr = TypeManager::new();
    let empty = mgr.empty();
    assert!(decode_hex(&mgr, &[empty], "4449444c00016f").is_err());
}

#[test]
fn test_bad_table() {
    let mut mgr = TypeManager::new();
    let nat = mgr.nat();
    // Reference to a table entry that does not exist.
    assert!(matches!(
        decode_hex(&mgr, &[nat], "4449444c000101"),
        Err(DecodeError::TypeIndexOutOfRange { .. })
    ));
    // Unknown opcode in the table.
    assert!(matches!(
        decode_hex(&mgr, &[], "4449444c01400000"),
        Err(DecodeError::InvalidOpcode { .. })
    ));
}

#[test]
fn test_record_from_table() {
    let mut mgr = TypeManager::new();
    let nat = mgr.nat();
    let ty = mgr.record([("id", nat)]).unwrap();

    // table: record {23515: nat}, one argument of type 0 with value 5
    assert_eq!(
        decode_hex(&mgr, &[ty], "4449444c016c01dbb7017d010005"),
        Ok(vec![Value::record([("id", Value::int(5))])])
    );
    assert!(matches!(
        decode_hex(&mgr, &[ty], "4449444c016c01dbb7017e010001"),
        Err(DecodeError::TypeMismatch { .. })
    ));
}
