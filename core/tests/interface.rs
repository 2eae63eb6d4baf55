use knot_core::interface::{Interface, InterfaceError};
use knot_core::lucky::lucky;
use knot_core::options::LuckyOptions;
use knot_core::types::TypeKind;
use knot_core::values::Value;
use knot_core::wire;
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

const LIST: &str = r#"{
    "types": {
        "List": { "opt": "Cell" },
        "Cell": { "record": { "head": "int", "tail": "List" } }
    },
    "service": {
        "sum": { "args": ["List"], "rets": ["int"], "modes": ["query"] },
        "push": { "args": ["List", "int"], "rets": ["List"] },
        "reset": { "modes": ["oneway"] }
    }
}"#;

#[test]
fn test_recursive_list() {
    let iface = Interface::from_json(LIST).unwrap();
    let mgr = iface.manager();

    let names: Vec<&str> = iface.methods().map(|(name, _)| name).collect();
    assert_eq!(names, ["push", "reset", "sum"]);

    let (_, sum) = iface.method("sum").unwrap();
    assert!(sum.is_query());
    let (_, reset) = iface.method("reset").unwrap();
    assert!(reset.is_oneway());
    assert!(reset.args.is_empty());

    let list = iface.named("List").unwrap();
    assert!(matches!(mgr.kind(list), TypeKind::Knot(Some(_))));
    let TypeKind::Service(methods) = mgr.kind(iface.service()) else {
        panic!("Expected service type");
    };
    assert_eq!(methods.len(), 3);

    let value = Value::some(Value::record([
        ("head", Value::int(1)),
        (
            "tail",
            Value::some(Value::record([("head", Value::int(2)), ("tail", Value::none())])),
        ),
    ]));
    let (_, push) = iface.method("push").unwrap();
    let args = vec![value, Value::int(3)];
    let bytes = wire::encode(mgr, &push.args, &args).unwrap();
    assert_eq!(wire::decode(mgr, &push.args, &bytes).unwrap(), args);
}

#[test]
fn test_lucky_arguments() {
    let iface = Interface::from_json(LIST).unwrap();
    let mgr = iface.manager();
    let (_, push) = iface.method("push").unwrap();
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..100 {
        let args = push
            .args
            .iter()
            .map(|&ty| lucky(mgr, ty, &mut rng, &LuckyOptions::default()))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let bytes = wire::encode(mgr, &push.args, &args).unwrap();
        assert_eq!(wire::decode(mgr, &push.args, &bytes).unwrap(), args);
    }
}

#[test]
fn test_service_references_must_be_functions() {
    let result = Interface::from_json(
        r#"{ "types": { "Bad": { "service": { "m": "nat" } } } }"#,
    );
    assert!(matches!(result, Err(InterfaceError::Type(_))));
}
