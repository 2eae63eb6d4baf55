use super::TypeManager;
use crate::{FuncModes, TypeError, TypeKind, Width};
use alloc::{string::String, vec, vec::Vec};
use pretty_assertions::assert_eq;

#[test]
fn test_interning_primitives() {
    let mut manager = TypeManager::new();

    let nat = manager.nat();
    assert_eq!(nat, manager.nat());

    let int8 = manager.fixed_int(Width::W8);
    assert_eq!(int8, manager.fixed_int(Width::W8));
    assert_ne!(int8, manager.fixed_int(Width::W16));
    assert_ne!(int8, manager.fixed_nat(Width::W8));
}

#[test]
fn test_interning_record() {
    let mut manager = TypeManager::new();
    let int = manager.int();
    let text = manager.text();

    let record = manager.record([("x", int), ("y", text)]).unwrap();
    let same = manager.record([("x", int), ("y", text)]).unwrap();
    assert_eq!(record, same);

    let unordered = manager.record([("y", text), ("x", int)]).unwrap();
    assert_eq!(record, unordered);

    let different = manager.record([("x", text), ("y", int)]).unwrap();
    assert_ne!(record, different);
}

#[test]
fn test_record_and_variant_are_distinct() {
    let mut manager = TypeManager::new();
    let null = manager.null();
    let record = manager.record([("a", null)]).unwrap();
    let variant = manager.variant([("a", null)]).unwrap();
    assert_ne!(record, variant);
}

#[test]
fn test_duplicate_field() {
    let mut manager = TypeManager::new();
    let nat = manager.nat();
    assert_eq!(
        manager.record([("a", nat), ("a", nat)]),
        Err(TypeError::DuplicateField { name: "a".into() })
    );
    assert_eq!(
        manager.variant([("b", nat), ("b", nat)]),
        Err(TypeError::DuplicateField { name: "b".into() })
    );
}

#[test]
fn test_fields_sorted_by_hash() {
    let mut manager = TypeManager::new();
    let nat = manager.nat();
    let record = manager
        .record([("description", nat), ("short_name", nat), ("id", nat)])
        .unwrap();
    let TypeKind::Record(fields) = manager.kind(record) else {
        panic!("Expected record");
    };
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "description", "short_name"]);
    let hashes: Vec<u32> = fields.iter().map(|f| f.hash).collect();
    assert_eq!(hashes, vec![23515, 1595738364, 3261810734]);
}

#[test]
fn test_tuple_labels() {
    let mut manager = TypeManager::new();
    let nat = manager.nat();
    let text = manager.text();
    let tuple = manager.tuple([nat, text]);
    assert_eq!(manager.display(tuple), "record {_0_:nat; _1_:text}");

    let explicit = manager.record([("_1_", text), ("_0_", nat)]).unwrap();
    assert_eq!(tuple, explicit);
}

#[test]
fn test_service_requires_functions() {
    let mut manager = TypeManager::new();
    let nat = manager.nat();
    assert_eq!(
        manager.service([("count", nat)]),
        Err(TypeError::NotAFunction {
            name: String::from("count")
        })
    );

    let knot = manager.rec();
    let func = manager.func([knot], [], FuncModes::ONEWAY);
    let alias = manager.rec();
    manager.fill(alias, func).unwrap();
    // A knot that resolves to a function is accepted.
    assert!(manager.service([("notify", alias)]).is_ok());
}

#[test]
fn test_knots_are_not_interned() {
    let mut manager = TypeManager::new();
    let a = manager.rec();
    let b = manager.rec();
    assert_ne!(a, b);
    assert!(manager.flags(a).has_knot());

    let opt = manager.opt(a);
    assert!(manager.flags(opt).has_knot());
    assert!(!manager.flags(opt).has_reference());
}

#[test]
fn test_reference_flag() {
    let mut manager = TypeManager::new();
    let principal = manager.principal();
    let vec = manager.vec(principal);
    let func = manager.func([], [], FuncModes::empty());
    let nat = manager.nat();
    assert!(manager.flags(vec).has_reference());
    assert!(manager.flags(func).has_reference());
    assert!(!manager.flags(nat).has_reference());
}

#[test]
fn test_fill_rules() {
    let mut manager = TypeManager::new();
    let nat = manager.nat();
    let knot = manager.rec();

    assert_eq!(
        manager.resolve(knot),
        Err(TypeError::UnresolvedRecursion { knot })
    );
    assert_eq!(
        manager.fill(nat, knot),
        Err(TypeError::NotAKnot { ty: nat })
    );
    assert_eq!(
        manager.fill(knot, knot),
        Err(TypeError::NonProductiveRecursion { knot })
    );

    let list = manager.vec(knot);
    manager.fill(knot, list).unwrap();
    assert_eq!(manager.resolve(knot), Ok(list));
    assert_eq!(
        manager.fill(knot, nat),
        Err(TypeError::KnotAlreadyFilled { knot })
    );
}

#[test]
fn test_ids_are_construction_order() {
    let mut manager = TypeManager::new();
    let null = manager.null();
    let knot = manager.rec();
    let opt = manager.opt(null);
    assert_eq!(
        [null.index(), knot.index(), opt.index()],
        [0, 1, 2]
    );
    assert_eq!(manager.len(), 3);
    assert_eq!(manager.knot_name(knot), "rec_1");
}
