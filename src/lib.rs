//! Knot - typed values, a binary wire format and forms for interface descriptions
//!
//! # Overview
//!
//! An interface description names a set of types and a service of methods.
//! Knot loads such descriptions and works with values of their types:
//!
//! - Encode and decode argument lists in the `DIDL` binary format
//! - Check values against types (covariance)
//! - Generate random values of any closed type
//! - Render typed forms, collect user input and parse it back into values
//!
//! # Quick Start
//!
//! ```
//! use knot::{Value, load_interface, wire};
//!
//! let iface = load_interface(r#"{
//!     "types": { "List": { "opt": { "record": { "head": "nat", "tail": "List" } } } },
//!     "service": { "sum": { "args": ["List"], "rets": ["nat"], "modes": ["query"] } }
//! }"#).unwrap();
//!
//! let (_, sum) = iface.method("sum").unwrap();
//! let list = Value::some(Value::record([("head", Value::int(1)), ("tail", Value::none())]));
//! let bytes = wire::encode(iface.manager(), &sum.args, &[list.clone()]).unwrap();
//! assert_eq!(wire::decode(iface.manager(), &sum.args, &bytes).unwrap(), [list]);
//! ```
//!
//! # Errors
//!
//! Every layer has its own error type. [`Error`] gathers them, keeping the
//! source text where there is one, so [`render_error`] can point into it.

mod error_renderer;

pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};

// Re-export public API from knot_core
pub use knot_core::form::{self, InputBox, ParseConfig, render, render_with};
pub use knot_core::interface::{Interface, InterfaceError};
pub use knot_core::options::{DecodeOptions, FormOptions, LuckyOptions};
pub use knot_core::principal::Principal;
pub use knot_core::types::{self, FuncModes, TypeId, TypeManager};
pub use knot_core::values::{self, Value};
pub use knot_core::wire;
pub use knot_core::{covariant::covariant, lucky::lucky, syntax, text};

use knot_core::form::FormError;
use knot_core::syntax::SyntaxError;
use knot_core::types::TypeError;
use knot_core::wire::{DecodeError, EncodeError};

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum Error {
    #[error("invalid interface description")]
    #[diagnostic(code(knot::interface))]
    Interface {
        #[source]
        error: InterfaceError,
        json: String,
    },

    #[error("invalid input for {signature}")]
    #[diagnostic(code(knot::input), help("enter a value of type {signature}"))]
    Input {
        #[source]
        error: SyntaxError,
        input: String,
        signature: String,
    },

    #[error(transparent)]
    #[diagnostic(code(knot::encode))]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    #[diagnostic(code(knot::decode))]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    #[diagnostic(code(knot::form))]
    Form(#[from] FormError),

    #[error(transparent)]
    #[diagnostic(code(knot::types))]
    Type(#[from] TypeError),
}

/// Load an interface description, keeping the JSON for error reports.
pub fn load_interface(json: &str) -> Result<Interface, Error> {
    Interface::from_json(json).map_err(|error| Error::Interface {
        error,
        json: json.to_string(),
    })
}

/// Parse a value written in the text syntax and check it against `ty`.
///
/// ```
/// use knot::{TypeManager, Value, parse_input};
///
/// let mut mgr = TypeManager::new();
/// let nat = mgr.nat();
/// let list = mgr.vec(nat);
/// assert_eq!(
///     parse_input(&mgr, list, "vec {1; 2}").unwrap(),
///     Value::Vec(vec![Value::int(1), Value::int(2)])
/// );
/// ```
pub fn parse_input(mgr: &TypeManager, ty: TypeId, input: &str) -> Result<Value, Error> {
    let value = syntax::parse_value(mgr, ty, input).map_err(|error| Error::Input {
        error,
        input: input.to_string(),
        signature: mgr.display(ty),
    })?;
    check_covariant(mgr, ty, &value)?;
    Ok(value)
}

/// Parse an argument list `(a, b, ...)` and check each value against its type.
pub fn parse_arguments(
    mgr: &TypeManager,
    types: &[TypeId],
    input: &str,
) -> Result<Vec<Value>, Error> {
    let values = syntax::parse_args(mgr, types, input).map_err(|error| Error::Input {
        error,
        input: input.to_string(),
        signature: signature(mgr, types),
    })?;
    for (&ty, value) in types.iter().zip(&values) {
        check_covariant(mgr, ty, value)?;
    }
    Ok(values)
}

fn signature(mgr: &TypeManager, types: &[TypeId]) -> String {
    let parts: Vec<String> = types.iter().map(|&ty| mgr.display(ty)).collect();
    format!("({})", parts.join(", "))
}

fn check_covariant(mgr: &TypeManager, ty: TypeId, value: &Value) -> Result<(), Error> {
    if covariant(mgr, ty, value)? {
        Ok(())
    } else {
        Err(Error::Encode(EncodeError::NotCovariant {
            signature: mgr.display(ty),
        }))
    }
}
