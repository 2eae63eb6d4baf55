//! Text input of primitive values.
//!
//! Used by leaf inputs of a form. The result is only shaped like the
//! requested type; range checks are left to [`crate::covariant`].

use crate::principal::{Principal, PrincipalError};
use crate::values::Value;
use knot_types::{FuncType, Method, TypeError, TypeId, TypeManager, TypeVisitor};
use num_bigint::BigInt;
use std::marker::PhantomData;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("`{input}` is not a boolean, expected `true` or `false`")]
    InvalidBool { input: String },

    #[error("`{input}` is not an integer")]
    InvalidNumber { input: String },

    #[error("`{input}` is not a number")]
    InvalidFloat { input: String },

    #[error("`{input}` is not a method reference, expected `<principal>.<method>`")]
    InvalidMethod { input: String },

    #[error(transparent)]
    Principal(#[from] PrincipalError),

    #[error("{signature} cannot be entered as text")]
    NotAPrimitive { signature: String },

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Parse `text` as a value of the primitive type `ty`.
///
/// # Example
///
/// ```
/// use knot_core::parse::parse_text;
/// use knot_core::types::TypeManager;
/// use knot_core::values::Value;
///
/// let mut mgr = TypeManager::new();
/// let int = mgr.int();
/// assert_eq!(parse_text(&mgr, int, "-42").unwrap(), Value::int(-42));
/// ```
pub fn parse_text(mgr: &TypeManager, ty: TypeId, text: &str) -> Result<Value, ParseError> {
    mgr.accept(ty, &mut Parse::default(), text)
}

fn parse_int(input: &str) -> Result<BigInt, ParseError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    digits.parse::<BigInt>().map_err(|_| ParseError::InvalidNumber {
        input: input.into(),
    })
}

#[derive(Default)]
struct Parse<'t> {
    _text: PhantomData<&'t str>,
}

impl<'t> TypeVisitor for Parse<'t> {
    type Data = &'t str;
    type Value = Value;
    type Error = ParseError;

    fn visit_type(&mut self, mgr: &TypeManager, ty: TypeId, _: &'t str) -> Result<Value, ParseError> {
        Err(ParseError::NotAPrimitive {
            signature: mgr.display(ty),
        })
    }

    fn visit_null(&mut self, _: &TypeManager, _: TypeId, _: &'t str) -> Result<Value, ParseError> {
        Ok(Value::Null)
    }

    fn visit_bool(&mut self, _: &TypeManager, _: TypeId, s: &'t str) -> Result<Value, ParseError> {
        match s.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(ParseError::InvalidBool { input: s.into() }),
        }
    }

    fn visit_text(&mut self, _: &TypeManager, _: TypeId, s: &'t str) -> Result<Value, ParseError> {
        Ok(Value::text(s))
    }

    fn visit_float(&mut self, _: &TypeManager, _: TypeId, s: &'t str) -> Result<Value, ParseError> {
        s.trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ParseError::InvalidFloat { input: s.into() })
    }

    fn visit_principal(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        s: &'t str,
    ) -> Result<Value, ParseError> {
        Ok(Value::Principal(Principal::from_text(s.trim())?))
    }

    fn visit_number(&mut self, _: &TypeManager, _: TypeId, s: &'t str) -> Result<Value, ParseError> {
        Ok(Value::Int(parse_int(s)?))
    }

    fn visit_func(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        _: &FuncType,
        s: &'t str,
    ) -> Result<Value, ParseError> {
        let s = s.trim();
        match s.rsplit_once('.') {
            Some((principal, method)) if !method.is_empty() => Ok(Value::Func(
                Principal::from_text(principal)?,
                method.to_string(),
            )),
            _ => Err(ParseError::InvalidMethod { input: s.into() }),
        }
    }

    fn visit_service(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        _: &[Method],
        s: &'t str,
    ) -> Result<Value, ParseError> {
        Ok(Value::Service(Principal::from_text(s.trim())?))
    }
}
