//! Runtime values.
//!
//! Values are untyped trees; whether a value fits a type is decided by
//! [`crate::covariant`]. Every integer type shares [`Value::Int`].

use crate::principal::Principal;
use knot_types::TypeError;
use num_bigint::BigInt;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Text(String),
    Int(BigInt),
    Float(f64),
    Principal(Principal),
    Opt(Option<Box<Value>>),
    Vec(Vec<Value>),
    Record(BTreeMap<String, Value>),
    /// A well-formed variant value has exactly one entry.
    Variant(BTreeMap<String, Value>),
    /// A method of a service: principal and method name.
    Func(Principal, String),
    Service(Principal),
}

impl Value {
    pub fn int(n: impl Into<BigInt>) -> Self {
        Value::Int(n.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn some(v: Value) -> Self {
        Value::Opt(Some(Box::new(v)))
    }

    pub fn none() -> Self {
        Value::Opt(None)
    }

    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn variant(tag: impl Into<String>, v: Value) -> Self {
        Value::Variant(BTreeMap::from([(tag.into(), v)]))
    }

    /// The single active tag of a variant value, if well formed.
    pub fn variant_tag(&self) -> Option<(&str, &Value)> {
        match self {
            Value::Variant(map) if map.len() == 1 => {
                map.iter().next().map(|(k, v)| (k.as_str(), v))
            }
            _ => None,
        }
    }

    /// Short name of the value's shape, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Text(_) => "text",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Principal(_) => "principal",
            Value::Opt(_) => "option",
            Value::Vec(_) => "vector",
            Value::Record(_) => "record",
            Value::Variant(_) => "variant",
            Value::Func(..) => "function reference",
            Value::Service(_) => "service reference",
        }
    }
}

/// A value did not have the shape its type requires.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("{kind} value is not of type {signature}")]
    Mismatch {
        kind: &'static str,
        signature: String,
    },

    #[error(transparent)]
    Type(#[from] TypeError),
}
