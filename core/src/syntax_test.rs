use super::*;
use crate::lucky::lucky;
use crate::options::LuckyOptions;
use crate::principal::Principal;
use crate::text::{args_to_text, value_to_text};
use knot_types::{FuncModes, Width, label_hash};
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn test_literals() {
    let mut mgr = TypeManager::new();
    let null = mgr.null();
    let bool = mgr.bool();
    let text = mgr.text();
    let int = mgr.int();
    let nat = mgr.nat();
    let float = mgr.float64();
    let types = [bool, null, nat, text, text, int, int, bool, float];

    let values = parse_args(
        &mgr,
        &types,
        r#" (true, null , 42, "random", "string with whitespace", +42, -42, false, 2.5) "#,
    )
    .unwrap();
    assert_eq!(
        values,
        vec![
            Value::Bool(true),
            Value::Null,
            Value::int(42),
            Value::text("random"),
            Value::text("string with whitespace"),
            Value::int(42),
            Value::int(-42),
            Value::Bool(false),
            Value::Float(2.5),
        ]
    );
    assert_eq!(
        args_to_text(&mgr, &types, &values).unwrap(),
        r#"(true, null, 42, "random", "string with whitespace", 42, -42, false, 2.5)"#
    );
}

#[test]
fn test_composites() {
    let mut mgr = TypeManager::new();
    let nat = mgr.nat();
    let text = mgr.text();
    let bool = mgr.bool();
    let null = mgr.null();
    let empty_record = mgr.record::<_, &str>([]).unwrap();
    let opt_record = mgr.opt(empty_record);
    let vec = mgr.vec(nat);
    let record = mgr.record([("id", nat), ("name", text), ("ok", bool)]).unwrap();
    let variant = mgr.variant([("none", null), ("some", nat)]).unwrap();

    let values = parse_args(
        &mgr,
        &[opt_record, vec, record, variant],
        r#"(opt record {}, vec{1;2;3;}, record { name="test"; id=42; ok=false }, variant { some=5 })"#,
    )
    .unwrap();
    assert_eq!(
        values,
        vec![
            Value::some(Value::record::<_, &str>([])),
            Value::Vec(vec![Value::int(1), Value::int(2), Value::int(3)]),
            Value::record([
                ("id", Value::int(42)),
                ("name", Value::text("test")),
                ("ok", Value::Bool(false)),
            ]),
            Value::variant("some", Value::int(5)),
        ]
    );
}

#[test]
fn test_null_and_none_are_absent_options() {
    let mut mgr = TypeManager::new();
    let nat = mgr.nat();
    let opt = mgr.opt(nat);
    let nested = mgr.opt(opt);
    assert_eq!(parse_value(&mgr, opt, "null").unwrap(), Value::none());
    assert_eq!(parse_value(&mgr, opt, "none").unwrap(), Value::none());
    assert_eq!(
        parse_value(&mgr, nested, "opt null").unwrap(),
        Value::some(Value::none())
    );
    assert_eq!(
        parse_value(&mgr, nested, "opt opt 3").unwrap(),
        Value::some(Value::some(Value::int(3)))
    );
}

#[test]
fn test_fields_by_label_hash() {
    let mut mgr = TypeManager::new();
    let nat = mgr.nat();
    let ty = mgr.record([("label", nat)]).unwrap();
    let input = format!("record {{{}=42}}", label_hash("label"));
    assert_eq!(
        parse_value(&mgr, ty, &input).unwrap(),
        Value::record([("label", Value::int(42))])
    );
    assert_eq!(
        parse_value(&mgr, ty, r#"record {"label"=7}"#).unwrap(),
        Value::record([("label", Value::int(7))])
    );
}

#[test]
fn test_escapes() {
    let mut mgr = TypeManager::new();
    let text = mgr.text();
    assert_eq!(
        parse_value(&mgr, text, r#""tab\there \"quoted\" \\ \u{1F600}""#).unwrap(),
        Value::text("tab\there \"quoted\" \\ \u{1F600}")
    );
    assert_eq!(parse_value(&mgr, text, r#""\n""#).unwrap(), Value::text("\n"));

    let err = parse_value(&mgr, text, r#""\q""#).unwrap_err();
    assert_eq!(err.kind, SyntaxErrorKind::UnknownEscape { escape: 'q' });
    assert_eq!(err.to_string(), "unknown escape `\\q`");
    assert!(matches!(
        parse_value(&mgr, text, r#""\u{110000}""#).map_err(|e| e.kind),
        Err(SyntaxErrorKind::UnknownEscape { escape: 'u' })
    ));
}

#[test]
fn test_references() {
    let mut mgr = TypeManager::new();
    let principal = mgr.principal();
    let func = mgr.func([], [], FuncModes::QUERY);
    let service = mgr.service([("get", func)]).unwrap();
    let p = Principal::from_text("ic:000000000000000107").unwrap();

    let values = parse_args(
        &mgr,
        &[principal, func, service],
        "(ic:000000000000000107, ic:000000000000000107.get, ic:000000000000000107)",
    )
    .unwrap();
    assert_eq!(
        values,
        vec![
            Value::Principal(p.clone()),
            Value::Func(p.clone(), "get".into()),
            Value::Service(p),
        ]
    );
}

#[test]
fn test_shape_errors() {
    let mut mgr = TypeManager::new();
    let nat = mgr.nat();
    let text = mgr.text();
    let record = mgr.record([("a", nat), ("b", text)]).unwrap();
    let variant = mgr.variant([("x", nat)]).unwrap();

    let err = parse_value(&mgr, nat, r#""5""#).unwrap_err();
    assert_eq!(
        err.kind,
        SyntaxErrorKind::Unexpected {
            expected: "a value of type nat".into(),
            found: r#""5""#.into(),
        }
    );
    assert_eq!(err.span, 0..3);

    let err = parse_value(&mgr, record, r#"record {a=1; c="x"}"#).unwrap_err();
    assert_eq!(
        err.kind,
        SyntaxErrorKind::UnknownField {
            label: "c".into(),
            signature: "record {a:nat; b:text}".into(),
        }
    );
    assert_eq!(err.span, 13..14);

    assert!(matches!(
        parse_value(&mgr, record, r#"record {a=1}"#).map_err(|e| e.kind),
        Err(SyntaxErrorKind::MissingField { label, .. }) if label == "b"
    ));
    assert!(matches!(
        parse_value(&mgr, record, r#"record {a=1; a=2; b="x"}"#).map_err(|e| e.kind),
        Err(SyntaxErrorKind::DuplicateField { label }) if label == "a"
    ));
    assert!(matches!(
        parse_value(&mgr, variant, "variant {y=1}").map_err(|e| e.kind),
        Err(SyntaxErrorKind::UnknownField { .. })
    ));
    assert!(matches!(
        parse_value(&mgr, nat, "1.5").map_err(|e| e.kind),
        Err(SyntaxErrorKind::Literal(ParseError::InvalidNumber { .. }))
    ));
}

#[test]
fn test_grammar_errors() {
    let mut mgr = TypeManager::new();
    let nat = mgr.nat();
    let vec = mgr.vec(nat);

    let err = parse_value(&mgr, vec, "vec {1; 2").unwrap_err();
    assert!(matches!(err.kind, SyntaxErrorKind::Grammar { .. }));

    assert!(parse_value(&mgr, nat, "1 2").is_err());
    assert!(parse_value(&mgr, nat, "").is_err());
    assert!(parse_args(&mgr, &[nat], "1").is_err());
}

#[test]
fn test_arity() {
    let mut mgr = TypeManager::new();
    let nat = mgr.nat();
    assert_eq!(parse_args(&mgr, &[], "()").unwrap(), vec![]);
    assert_eq!(
        parse_args(&mgr, &[nat], "(1, 2)").map_err(|e| e.kind),
        Err(SyntaxErrorKind::ArityMismatch {
            expected: 1,
            found: 2
        })
    );
    assert_eq!(
        parse_args(&mgr, &[nat, nat], "(1,)").map_err(|e| e.kind),
        Err(SyntaxErrorKind::ArityMismatch {
            expected: 2,
            found: 1
        })
    );
}

#[test]
fn test_printed_values_parse_back() {
    // μtree.variant {leaf: text; node: record {"child nodes": vec tree; weight: float64}}
    let mut mgr = TypeManager::new();
    let tree = mgr.rec();
    let text = mgr.text();
    let float = mgr.float64();
    let children = mgr.vec(tree);
    let node = mgr
        .record([("child nodes", children), ("weight", float)])
        .unwrap();
    let body = mgr.variant([("leaf", text), ("node", node)]).unwrap();
    mgr.fill(tree, body).unwrap();

    let int8 = mgr.fixed_int(Width::W8);
    let principal = mgr.principal();
    let opt = mgr.opt(principal);
    let func = mgr.func([int8], [], FuncModes::ONEWAY);
    let pair = mgr.tuple([opt, func]);

    let mut rng = StdRng::seed_from_u64(42);
    let options = LuckyOptions {
        text_len: 12,
        ..Default::default()
    };
    for ty in [tree, pair, int8] {
        for _ in 0..200 {
            let value = lucky(&mgr, ty, &mut rng, &options).unwrap();
            let printed = value_to_text(&mgr, ty, &value).unwrap();
            let parsed = parse_value(&mgr, ty, &printed)
                .unwrap_or_else(|e| panic!("{} does not parse back: {}", printed, e));
            assert_eq!(parsed, value, "{}", printed);
        }
    }
}
