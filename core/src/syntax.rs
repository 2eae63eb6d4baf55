//! Text syntax of values: `(true, vec {1; 2}, record {name="Ada"; age=36})`.
//!
//! This is the syntax [`crate::text`] prints. Parsing is guided by the
//! expected type, so a record field may be given by name or by its numeric
//! label hash, and `null` means `none` where an option is expected. Like
//! [`crate::parse`], the result is only shaped like the type; range checks
//! are left to [`crate::covariant`].

use crate::parse::{ParseError, parse_text};
use crate::values::Value;
use knot_types::{Field, FuncType, Method, TypeError, TypeId, TypeManager, TypeVisitor};
use pest::Parser;
use pest::error::InputLocation;
use pest::iterators::Pair;
use pest_derive::Parser;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::ops::Range;

#[derive(Parser)]
#[grammar = "syntax.pest"]
struct ValueParser;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxErrorKind {
    #[error("{message}")]
    Grammar { message: String },

    #[error("expected {expected}, found `{found}`")]
    Unexpected { expected: String, found: String },

    #[error("unknown escape `\\{escape}`")]
    UnknownEscape { escape: char },

    #[error("{signature} has no field `{label}`")]
    UnknownField { label: String, signature: String },

    #[error("field `{label}` is given more than once")]
    DuplicateField { label: String },

    #[error("missing field `{label}` of {signature}")]
    MissingField { label: String, signature: String },

    #[error("expected {expected} argument(s), found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Literal(#[from] ParseError),
}

/// A parse failure and the byte range of the input it concerns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub span: Range<usize>,
}

impl SyntaxError {
    fn at(pair: &Pair<'_, Rule>, kind: impl Into<SyntaxErrorKind>) -> Self {
        let span = pair.as_span();
        SyntaxError {
            kind: kind.into(),
            span: span.start()..span.end(),
        }
    }
}

impl From<TypeError> for SyntaxError {
    fn from(error: TypeError) -> Self {
        SyntaxError {
            kind: ParseError::Type(error).into(),
            span: 0..0,
        }
    }
}

fn rule_name(rule: &Rule) -> String {
    match rule {
        Rule::null => "`null`",
        Rule::none => "`none`",
        Rule::boolean => "boolean",
        Rule::number => "number",
        Rule::text | Rule::chars => "text literal",
        Rule::reference | Rule::principal => "principal",
        Rule::method => "method name",
        Rule::opt_kw => "`opt`",
        Rule::vec_kw => "`vec`",
        Rule::record_kw => "`record`",
        Rule::variant_kw => "`variant`",
        Rule::name | Rule::id => "field label",
        Rule::EOI => "end of input",
        other => return format!("{:?}", other),
    }
    .to_string()
}

fn grammar_error(error: pest::error::Error<Rule>) -> SyntaxError {
    let error = error.renamed_rules(rule_name);
    let span = match error.location {
        InputLocation::Pos(pos) => pos..pos,
        InputLocation::Span((start, end)) => start..end,
    };
    SyntaxError {
        kind: SyntaxErrorKind::Grammar {
            message: error.variant.message().into_owned(),
        },
        span,
    }
}

/// Parse a single value of type `ty`.
///
/// # Example
///
/// ```
/// use knot_core::syntax::parse_value;
/// use knot_core::types::TypeManager;
/// use knot_core::values::Value;
///
/// let mut mgr = TypeManager::new();
/// let nat = mgr.nat();
/// let list = mgr.vec(nat);
/// assert_eq!(
///     parse_value(&mgr, list, "vec {1; 2}").unwrap(),
///     Value::Vec(vec![Value::int(1), Value::int(2)])
/// );
/// ```
pub fn parse_value(mgr: &TypeManager, ty: TypeId, input: &str) -> Result<Value, SyntaxError> {
    mgr.check_closed(ty)?;
    let mut pairs = ValueParser::parse(Rule::single, input).map_err(grammar_error)?;
    let value = pairs
        .next()
        .and_then(|single| single.into_inner().next())
        .ok_or_else(|| SyntaxError {
            kind: SyntaxErrorKind::Unexpected {
                expected: "a value".into(),
                found: input.into(),
            },
            span: 0..input.len(),
        })?;
    mgr.accept(ty, &mut ValueReader::default(), value)
}

/// Parse an argument list `(a, b, ...)` of the given types.
pub fn parse_args(
    mgr: &TypeManager,
    types: &[TypeId],
    input: &str,
) -> Result<Vec<Value>, SyntaxError> {
    for &ty in types {
        mgr.check_closed(ty)?;
    }
    let mut pairs = ValueParser::parse(Rule::args, input).map_err(grammar_error)?;
    let values: Vec<Pair<'_, Rule>> = pairs
        .next()
        .map(|args| {
            args.into_inner()
                .filter(|p| p.as_rule() != Rule::EOI)
                .collect()
        })
        .unwrap_or_default();
    if values.len() != types.len() {
        return Err(SyntaxError {
            kind: SyntaxErrorKind::ArityMismatch {
                expected: types.len(),
                found: values.len(),
            },
            span: 0..input.len(),
        });
    }
    types
        .iter()
        .zip(values)
        .map(|(&ty, pair)| mgr.accept(ty, &mut ValueReader::default(), pair))
        .collect()
}

/// Quote and escape `s` as a text literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Whether `name` can be written as a field label without quotes.
pub fn is_plain_label(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Content of a `text` pair with escapes resolved.
fn unquote(pair: &Pair<'_, Rule>) -> Result<String, SyntaxError> {
    let raw = pair
        .clone()
        .into_inner()
        .next()
        .map(|chars| chars.as_str())
        .unwrap_or_default();
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escape = chars.next().unwrap_or('\\');
        match escape {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' | '"' | '\'' => out.push(escape),
            'u' => {
                let rest = chars.as_str();
                let decoded = rest
                    .strip_prefix('{')
                    .and_then(|r| r.split_once('}'))
                    .and_then(|(hex, tail)| {
                        let c = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)?;
                        Some((c, tail))
                    });
                let Some((c, tail)) = decoded else {
                    return Err(SyntaxError::at(pair, SyntaxErrorKind::UnknownEscape { escape }));
                };
                out.push(c);
                chars = tail.chars();
            }
            escape => {
                return Err(SyntaxError::at(pair, SyntaxErrorKind::UnknownEscape { escape }));
            }
        }
    }
    Ok(out)
}

/// Builds a value of the visited type from a parse tree node.
#[derive(Default)]
struct ValueReader<'i> {
    _input: PhantomData<&'i str>,
}

impl ValueReader<'_> {
    fn mismatch(mgr: &TypeManager, ty: TypeId, pair: &Pair<'_, Rule>) -> SyntaxError {
        SyntaxError::at(
            pair,
            SyntaxErrorKind::Unexpected {
                expected: format!("a value of type {}", mgr.display(ty)),
                found: pair.as_str().into(),
            },
        )
    }

    fn expect(
        mgr: &TypeManager,
        ty: TypeId,
        pair: &Pair<'_, Rule>,
        rules: &[Rule],
    ) -> Result<(), SyntaxError> {
        if rules.contains(&pair.as_rule()) {
            Ok(())
        } else {
            Err(Self::mismatch(mgr, ty, pair))
        }
    }

    fn literal(mgr: &TypeManager, ty: TypeId, pair: &Pair<'_, Rule>) -> Result<Value, SyntaxError> {
        parse_text(mgr, ty, pair.as_str()).map_err(|e| SyntaxError::at(pair, e))
    }

    /// Skip the keyword of a composite and return its parts.
    fn parts<'i>(pair: Pair<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
        pair.into_inner().skip(1)
    }

    fn label(pair: &Pair<'_, Rule>) -> Result<String, SyntaxError> {
        match pair.as_rule() {
            Rule::text => unquote(pair),
            _ => Ok(pair.as_str().to_string()),
        }
    }

    /// Find the field a label refers to, by name or by label hash.
    fn field<'f>(
        mgr: &TypeManager,
        ty: TypeId,
        fields: &'f [Field],
        label: &Pair<'_, Rule>,
    ) -> Result<&'f Field, SyntaxError> {
        let text = Self::label(label)?;
        let found = match label.as_rule() {
            Rule::id => text
                .parse::<u32>()
                .ok()
                .and_then(|hash| fields.iter().find(|f| f.hash == hash)),
            _ => fields.iter().find(|f| f.name == text),
        };
        found.ok_or_else(|| {
            SyntaxError::at(
                label,
                SyntaxErrorKind::UnknownField {
                    label: text,
                    signature: mgr.display(ty),
                },
            )
        })
    }

    fn split_field(pair: Pair<'_, Rule>) -> Option<(Pair<'_, Rule>, Pair<'_, Rule>)> {
        let mut inner = pair.into_inner();
        Some((inner.next()?, inner.next()?))
    }
}

impl<'i> TypeVisitor for ValueReader<'i> {
    type Data = Pair<'i, Rule>;
    type Value = Value;
    type Error = SyntaxError;

    fn visit_type(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        pair: Pair<'i, Rule>,
    ) -> Result<Value, SyntaxError> {
        Err(Self::mismatch(mgr, ty, &pair))
    }

    fn visit_null(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        pair: Pair<'i, Rule>,
    ) -> Result<Value, SyntaxError> {
        Self::expect(mgr, ty, &pair, &[Rule::null])?;
        Ok(Value::Null)
    }

    fn visit_bool(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        pair: Pair<'i, Rule>,
    ) -> Result<Value, SyntaxError> {
        Self::expect(mgr, ty, &pair, &[Rule::boolean])?;
        Self::literal(mgr, ty, &pair)
    }

    fn visit_text(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        pair: Pair<'i, Rule>,
    ) -> Result<Value, SyntaxError> {
        Self::expect(mgr, ty, &pair, &[Rule::text])?;
        Ok(Value::Text(unquote(&pair)?))
    }

    fn visit_float(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        pair: Pair<'i, Rule>,
    ) -> Result<Value, SyntaxError> {
        Self::expect(mgr, ty, &pair, &[Rule::number])?;
        Self::literal(mgr, ty, &pair)
    }

    fn visit_number(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        pair: Pair<'i, Rule>,
    ) -> Result<Value, SyntaxError> {
        Self::expect(mgr, ty, &pair, &[Rule::number])?;
        Self::literal(mgr, ty, &pair)
    }

    fn visit_principal(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        pair: Pair<'i, Rule>,
    ) -> Result<Value, SyntaxError> {
        Self::expect(mgr, ty, &pair, &[Rule::reference])?;
        Self::literal(mgr, ty, &pair)
    }

    fn visit_opt(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        inner: TypeId,
        pair: Pair<'i, Rule>,
    ) -> Result<Value, SyntaxError> {
        Self::expect(mgr, ty, &pair, &[Rule::null, Rule::none, Rule::opt_value])?;
        if pair.as_rule() != Rule::opt_value {
            return Ok(Value::none());
        }
        match Self::parts(pair).next() {
            Some(value) => Ok(Value::some(mgr.accept(inner, self, value)?)),
            None => Ok(Value::none()),
        }
    }

    fn visit_vec(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        inner: TypeId,
        pair: Pair<'i, Rule>,
    ) -> Result<Value, SyntaxError> {
        Self::expect(mgr, ty, &pair, &[Rule::vec_value])?;
        let items = Self::parts(pair)
            .map(|item| mgr.accept(inner, self, item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Vec(items))
    }

    fn visit_record(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        fields: &[Field],
        pair: Pair<'i, Rule>,
    ) -> Result<Value, SyntaxError> {
        Self::expect(mgr, ty, &pair, &[Rule::record_value])?;
        let whole = pair.clone();
        let mut map = BTreeMap::new();
        for entry in Self::parts(pair) {
            let Some((label, value)) = Self::split_field(entry) else {
                continue;
            };
            let field = Self::field(mgr, ty, fields, &label)?;
            if map.contains_key(&field.name) {
                return Err(SyntaxError::at(
                    &label,
                    SyntaxErrorKind::DuplicateField {
                        label: field.name.clone(),
                    },
                ));
            }
            map.insert(field.name.clone(), mgr.accept(field.ty, self, value)?);
        }
        if let Some(missing) = fields.iter().find(|f| !map.contains_key(&f.name)) {
            return Err(SyntaxError::at(
                &whole,
                SyntaxErrorKind::MissingField {
                    label: missing.name.clone(),
                    signature: mgr.display(ty),
                },
            ));
        }
        Ok(Value::Record(map))
    }

    fn visit_variant(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        fields: &[Field],
        pair: Pair<'i, Rule>,
    ) -> Result<Value, SyntaxError> {
        Self::expect(mgr, ty, &pair, &[Rule::variant_value])?;
        let whole = pair.clone();
        let Some((label, value)) = Self::parts(pair).next().and_then(Self::split_field) else {
            return Err(SyntaxError::at(
                &whole,
                SyntaxErrorKind::Unexpected {
                    expected: "a variant arm".into(),
                    found: whole.as_str().into(),
                },
            ));
        };
        let field = Self::field(mgr, ty, fields, &label)?;
        let value = mgr.accept(field.ty, self, value)?;
        Ok(Value::variant(field.name.clone(), value))
    }

    fn visit_func(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        _: &FuncType,
        pair: Pair<'i, Rule>,
    ) -> Result<Value, SyntaxError> {
        Self::expect(mgr, ty, &pair, &[Rule::reference])?;
        Self::literal(mgr, ty, &pair)
    }

    fn visit_service(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        _: &[Method],
        pair: Pair<'i, Rule>,
    ) -> Result<Value, SyntaxError> {
        Self::expect(mgr, ty, &pair, &[Rule::reference])?;
        Self::literal(mgr, ty, &pair)
    }
}

#[cfg(test)]
#[path = "syntax_test.rs"]
mod syntax_test;
