use crate::table::TableError;
use knot_types::TypeError;

/// Failure while reading a wire message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected end of input, {needed} more byte(s) needed")]
    Truncated { needed: usize },

    #[error("message does not start with the DIDL magic number")]
    BadMagic,

    #[error("invalid type opcode {opcode}")]
    InvalidOpcode { opcode: i64 },

    #[error("type index {index} is out of range for a table of {len} type(s)")]
    TypeIndexOutOfRange { index: i64, len: usize },

    #[error("variant tag {tag} is out of range for {count} arm(s)")]
    TagOutOfRange { tag: u64, count: usize },

    #[error("invalid boolean byte {byte:#04x}")]
    InvalidBool { byte: u8 },

    #[error("invalid option tag {byte:#04x}")]
    InvalidOptTag { byte: u8 },

    #[error("invalid UTF-8 in text at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("malformed LEB128 number at offset {offset}")]
    InvalidVarint { offset: usize },

    #[error("value at offset {offset} does not fit in {ty}")]
    OutOfRange { offset: usize, ty: String },

    #[error("expected at least {expected} argument(s), message has {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("wire type {found} does not match {expected}")]
    TypeMismatch { expected: String, found: String },

    #[error("value nesting exceeds depth {depth}")]
    TooDeep { depth: usize },

    #[error("{remaining} trailing byte(s) at offset {offset}")]
    TrailingBytes { offset: usize, remaining: usize },

    #[error("no value has type empty")]
    EmptyValue,

    #[error("invalid reference tag {byte:#04x}")]
    InvalidReference { byte: u8 },

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Failure while writing a wire message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("expected {expected} argument(s), got {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("Invalid {signature} argument")]
    NotCovariant { signature: String },

    #[error("no value has type empty")]
    EmptyValue,

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Table(#[from] TableError),
}
