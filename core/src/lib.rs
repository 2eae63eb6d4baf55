//! Values, wire codec and forms for interface descriptions.
//!
//! Types come from [`knot_types`] (re-exported as [`types`]). This crate
//! adds everything that works with values of those types: the binary wire
//! codec, text input and output in [`syntax`] and [`text`], random generation and the form engine.

pub mod covariant;
pub mod form;
pub mod interface;
pub mod leb128;
pub mod lucky;
pub mod options;
pub mod parse;
pub mod principal;
pub mod syntax;
pub mod table;
pub mod text;
pub mod values;
pub mod wire;

pub use knot_types as types;
