//! Interactive forms as plain data.
//!
//! [`render`] turns a type into a tree of [`InputBox`]es. Leaves hold the
//! text a user typed; composites hold a control (a variant select, an
//! option checkbox, a vector length field) and the children generated for
//! the control's current state. Any frontend drives the tree through the
//! event methods and reads it back with [`InputBox::parse`].
//!
//! A composite is collapsed until it is expanded, which always generates
//! its children from scratch. Records have no control and are expanded
//! when rendered.

use crate::covariant::covariant;
use crate::lucky::lucky;
use crate::options::FormOptions;
use crate::parse::{ParseError, parse_text};
use crate::text::value_to_text;
use crate::values::{Value, ValueError};
use knot_types::{Field, TypeError, TypeId, TypeManager, TypeVisitor};
use rand::RngCore;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("input has no {expected} control")]
    NoSuchControl { expected: &'static str },

    #[error("option {index} does not exist, the select has {len} option(s)")]
    OptionOutOfRange { index: usize, len: usize },

    #[error("vector of {len} element(s) exceeds the form limit of {max}")]
    VecTooLong { len: usize, max: usize },

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Why a leaf input was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeafInput {
    pub text: String,
    /// Signature of the expected type.
    pub placeholder: String,
    /// Set by a failed parse, cleared on focus.
    pub rejected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ui {
    /// `null` needs no input.
    Empty,
    Leaf(LeafInput),
    Form(Form),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormKind {
    Record(Vec<Field>),
    Variant(Vec<Field>),
    Opt(TypeId),
    Vec(TypeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    None,
    /// Index of the selected variant arm.
    Select(Option<usize>),
    Checkbox(bool),
    /// Raw content of a vector length field.
    Length(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub kind: FormKind,
    pub control: Control,
    pub children: Vec<InputBox>,
}

/// A typed input: a leaf or a composite form, with its last parse result.
#[derive(Debug, Clone, PartialEq)]
pub struct InputBox {
    pub ty: TypeId,
    pub label: Option<String>,
    pub ui: Ui,
    /// Value of the last successful parse; `None` when rejected or unparsed.
    pub value: Option<Value>,
    pub rejection: Option<Rejection>,
}

/// How [`InputBox::parse_with`] treats empty leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseConfig {
    /// Fill empty leaves with random values instead of parsing them.
    pub random: bool,
}

/// Render `ty` as a form with default options.
pub fn render(mgr: &TypeManager, ty: TypeId) -> Result<InputBox, TypeError> {
    render_with(mgr, ty, &FormOptions::default())
}

/// Render `ty` as a form.
///
/// # Example
///
/// ```
/// use knot_core::form::{render, Ui};
/// use knot_core::types::TypeManager;
/// use knot_core::values::Value;
///
/// let mut mgr = TypeManager::new();
/// let nat = mgr.nat();
/// let mut input = render(&mgr, nat).unwrap();
/// let Ui::Leaf(leaf) = &input.ui else { unreachable!() };
/// assert_eq!(leaf.placeholder, "nat");
///
/// input.set_text("42").unwrap();
/// assert_eq!(input.parse(&mgr).unwrap(), Some(Value::int(42)));
/// ```
pub fn render_with(
    mgr: &TypeManager,
    ty: TypeId,
    options: &FormOptions,
) -> Result<InputBox, TypeError> {
    mgr.check_closed(ty)?;
    mgr.accept(ty, &mut Render { options }, ())
}

/// Write `value` into a form rendered for `ty`, expanding composites to
/// fit it. Leaf text is the value's text form, except for `text` leaves
/// which receive the raw string.
pub fn fill(
    mgr: &TypeManager,
    ty: TypeId,
    input: &mut InputBox,
    value: &Value,
    options: &FormOptions,
) -> Result<(), FormError> {
    let mut filler = Fill {
        options,
        _marker: PhantomData,
    };
    mgr.accept(ty, &mut filler, (input, value))
}

struct Render<'o> {
    options: &'o FormOptions,
}

impl Render<'_> {
    fn composite(ty: TypeId, kind: FormKind, control: Control) -> InputBox {
        InputBox::new(
            ty,
            Ui::Form(Form {
                kind,
                control,
                children: Vec::new(),
            }),
        )
    }
}

impl TypeVisitor for Render<'_> {
    type Data = ();
    type Value = InputBox;
    type Error = TypeError;

    fn visit_type(&mut self, mgr: &TypeManager, ty: TypeId, _: ()) -> Result<InputBox, TypeError> {
        Ok(InputBox::new(
            ty,
            Ui::Leaf(LeafInput {
                placeholder: mgr.display(ty),
                ..Default::default()
            }),
        ))
    }

    fn visit_null(&mut self, _: &TypeManager, ty: TypeId, _: ()) -> Result<InputBox, TypeError> {
        Ok(InputBox::new(ty, Ui::Empty))
    }

    fn visit_record(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        fields: &[Field],
        _: (),
    ) -> Result<InputBox, TypeError> {
        let mut input = Self::composite(ty, FormKind::Record(fields.to_vec()), Control::None);
        if let Ui::Form(form) = &mut input.ui {
            form.expand(mgr, self.options)?;
        }
        Ok(input)
    }

    fn visit_variant(
        &mut self,
        _: &TypeManager,
        ty: TypeId,
        fields: &[Field],
        _: (),
    ) -> Result<InputBox, TypeError> {
        Ok(Self::composite(
            ty,
            FormKind::Variant(fields.to_vec()),
            Control::Select(None),
        ))
    }

    fn visit_opt(
        &mut self,
        _: &TypeManager,
        ty: TypeId,
        inner: TypeId,
        _: (),
    ) -> Result<InputBox, TypeError> {
        Ok(Self::composite(ty, FormKind::Opt(inner), Control::Checkbox(false)))
    }

    fn visit_vec(
        &mut self,
        _: &TypeManager,
        ty: TypeId,
        inner: TypeId,
        _: (),
    ) -> Result<InputBox, TypeError> {
        Ok(Self::composite(
            ty,
            FormKind::Vec(inner),
            Control::Length(String::new()),
        ))
    }
}

/// Number of children a vector length field asks for.
fn requested_len(text: &str, max: usize) -> usize {
    match text.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n > 0.0 => (n.ceil() as usize).min(max),
        _ => 0,
    }
}

impl Form {
    /// Generate the children for the current control state, dropping the
    /// previous ones.
    pub fn expand(&mut self, mgr: &TypeManager, options: &FormOptions) -> Result<(), TypeError> {
        let mut render = Render { options };
        self.children = match (&self.kind, &self.control) {
            (FormKind::Record(fields), _) => {
                let mut children = Vec::with_capacity(fields.len());
                for field in fields {
                    let mut child = mgr.accept(field.ty, &mut render, ())?;
                    let label = options.labels.get(&field.name).unwrap_or(&field.name);
                    child.label = Some(label.clone());
                    children.push(child);
                }
                children
            }
            (FormKind::Variant(fields), Control::Select(Some(index))) => match fields.get(*index) {
                Some(field) => vec![mgr.accept(field.ty, &mut render, ())?],
                None => Vec::new(),
            },
            (FormKind::Opt(inner), Control::Checkbox(true)) => {
                vec![mgr.accept(*inner, &mut render, ())?]
            }
            (FormKind::Vec(inner), Control::Length(text)) => {
                let len = requested_len(text, options.max_vec_len);
                (0..len)
                    .map(|_| mgr.accept(*inner, &mut render, ()))
                    .collect::<Result<_, _>>()?
            }
            _ => Vec::new(),
        };
        debug!(children = self.children.len(), "regenerated form");
        Ok(())
    }

    fn parse(
        &mut self,
        mgr: &TypeManager,
        mut random: Option<&mut RandomFill<'_>>,
    ) -> Result<Option<Value>, TypeError> {
        // Every child is parsed, so each one gets its own status.
        let mut values = Vec::with_capacity(self.children.len());
        for child in &mut self.children {
            values.push(child.parse_node(mgr, random.as_deref_mut())?);
        }
        let values: Option<Vec<Value>> = values.into_iter().collect();
        let Some(mut values) = values else {
            return Ok(None);
        };

        let value = match (&self.kind, &self.control) {
            (FormKind::Record(fields), _) => Some(Value::Record(
                fields.iter().map(|f| f.name.clone()).zip(values).collect(),
            )),
            (FormKind::Variant(fields), Control::Select(Some(index))) => {
                match (fields.get(*index), values.pop()) {
                    (Some(field), Some(v)) => Some(Value::variant(field.name.clone(), v)),
                    _ => None,
                }
            }
            (FormKind::Variant(_), _) => None,
            (FormKind::Opt(_), _) => Some(Value::Opt(values.pop().map(Box::new))),
            (FormKind::Vec(_), _) => Some(Value::Vec(values)),
        };
        Ok(value)
    }
}

/// Random generation state threaded through a parse.
struct RandomFill<'a> {
    rng: &'a mut dyn RngCore,
    options: &'a FormOptions,
}

impl InputBox {
    fn new(ty: TypeId, ui: Ui) -> Self {
        InputBox {
            ty,
            label: None,
            ui,
            value: None,
            rejection: None,
        }
    }

    /// True when the last parse produced no value, or none ran yet.
    pub fn is_rejected(&self) -> bool {
        self.value.is_none()
    }

    pub fn form(&self) -> Option<&Form> {
        match &self.ui {
            Ui::Form(form) => Some(form),
            _ => None,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut Form> {
        match &mut self.ui {
            Ui::Form(form) => Some(form),
            _ => None,
        }
    }

    /// Child inputs of a composite; empty for leaves.
    pub fn children(&self) -> &[InputBox] {
        self.form().map(|f| f.children.as_slice()).unwrap_or(&[])
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut InputBox> {
        self.form_mut().and_then(|f| f.children.get_mut(index))
    }

    /// Parse without random filling.
    pub fn parse(&mut self, mgr: &TypeManager) -> Result<Option<Value>, TypeError> {
        self.parse_node(mgr, None)
    }

    /// Parse the whole tree, caching each node's value and rejection.
    ///
    /// Returns `Ok(None)` when any leaf was rejected. Errors are reserved
    /// for broken type graphs.
    pub fn parse_with<R: RngCore>(
        &mut self,
        mgr: &TypeManager,
        config: &ParseConfig,
        options: &FormOptions,
        rng: &mut R,
    ) -> Result<Option<Value>, TypeError> {
        let mut random = RandomFill { rng, options };
        self.parse_node(mgr, config.random.then_some(&mut random))
    }

    fn parse_node(
        &mut self,
        mgr: &TypeManager,
        random: Option<&mut RandomFill<'_>>,
    ) -> Result<Option<Value>, TypeError> {
        let value = match &mut self.ui {
            Ui::Empty => Some(Value::Null),
            Ui::Leaf(leaf) => match parse_leaf(mgr, self.ty, &leaf.text, random)? {
                Ok(value) => {
                    leaf.rejected = false;
                    self.rejection = None;
                    Some(value)
                }
                Err(message) => {
                    trace!(ty = %self.ty, message = %message, "input rejected");
                    leaf.rejected = true;
                    self.rejection = Some(Rejection {
                        message: format!("InputError: {}", message),
                    });
                    None
                }
            },
            Ui::Form(form) => form.parse(mgr, random)?,
        };
        self.value = value.clone();
        Ok(value)
    }

    fn leaf_mut(&mut self) -> Result<&mut LeafInput, FormError> {
        match &mut self.ui {
            Ui::Leaf(leaf) => Ok(leaf),
            _ => Err(FormError::NoSuchControl { expected: "text" }),
        }
    }

    pub fn set_text(&mut self, text: &str) -> Result<(), FormError> {
        self.leaf_mut()?.text = text.to_string();
        Ok(())
    }

    /// Clear the rejection mark of a leaf.
    pub fn focus(&mut self) {
        if let Ui::Leaf(leaf) = &mut self.ui {
            leaf.rejected = false;
        }
    }

    /// Leaving a leaf parses it, unless it is empty.
    pub fn blur(&mut self, mgr: &TypeManager) -> Result<(), TypeError> {
        match &self.ui {
            Ui::Leaf(leaf) if !leaf.text.is_empty() => {
                self.parse(mgr)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Select a variant arm and regenerate the form.
    pub fn select(
        &mut self,
        mgr: &TypeManager,
        options: &FormOptions,
        index: usize,
    ) -> Result<(), FormError> {
        let form = self
            .form_mut()
            .ok_or(FormError::NoSuchControl { expected: "select" })?;
        let FormKind::Variant(fields) = &form.kind else {
            return Err(FormError::NoSuchControl { expected: "select" });
        };
        if index >= fields.len() {
            return Err(FormError::OptionOutOfRange {
                index,
                len: fields.len(),
            });
        }
        form.control = Control::Select(Some(index));
        form.expand(mgr, options)?;
        Ok(())
    }

    /// Toggle an option checkbox and regenerate the form.
    pub fn set_checked(
        &mut self,
        mgr: &TypeManager,
        options: &FormOptions,
        checked: bool,
    ) -> Result<(), FormError> {
        let form = self
            .form_mut()
            .filter(|f| matches!(f.kind, FormKind::Opt(_)))
            .ok_or(FormError::NoSuchControl {
                expected: "checkbox",
            })?;
        form.control = Control::Checkbox(checked);
        form.expand(mgr, options)?;
        Ok(())
    }

    /// Change a vector length field and regenerate the form, even when the
    /// length is unchanged.
    pub fn set_length(
        &mut self,
        mgr: &TypeManager,
        options: &FormOptions,
        text: &str,
    ) -> Result<(), FormError> {
        let form = self
            .form_mut()
            .filter(|f| matches!(f.kind, FormKind::Vec(_)))
            .ok_or(FormError::NoSuchControl { expected: "length" })?;
        form.control = Control::Length(text.to_string());
        form.expand(mgr, options)?;
        Ok(())
    }

    /// Write `value` into this input. See [`fill`].
    pub fn fill(
        &mut self,
        mgr: &TypeManager,
        value: &Value,
        options: &FormOptions,
    ) -> Result<(), FormError> {
        fill(mgr, self.ty, self, value, options)
    }
}

/// Parse leaf text. The inner error is a rejection message.
fn parse_leaf(
    mgr: &TypeManager,
    ty: TypeId,
    text: &str,
    random: Option<&mut RandomFill<'_>>,
) -> Result<Result<Value, String>, TypeError> {
    if let Some(random) = random {
        if text.is_empty() {
            return match lucky(mgr, ty, &mut *random.rng, &random.options.lucky) {
                Ok(value) => Ok(Ok(value)),
                Err(TypeError::Uninhabited { .. }) => {
                    Ok(Err(format!("{} has no values", mgr.display(ty))))
                }
                Err(e) => Err(e),
            };
        }
    }
    let value = match parse_text(mgr, ty, text) {
        Ok(value) => value,
        Err(ParseError::Type(e)) => return Err(e),
        Err(e) => return Ok(Err(e.to_string())),
    };
    if !covariant(mgr, ty, &value)? {
        return Ok(Err(format!("{} is not of type {}", text, mgr.display(ty))));
    }
    Ok(Ok(value))
}

/// Visitor data is the input to fill and the value to write into it.
struct Fill<'o, 'b, 'v> {
    options: &'o FormOptions,
    _marker: PhantomData<(&'b mut InputBox, &'v Value)>,
}

impl Fill<'_, '_, '_> {
    fn mismatch(mgr: &TypeManager, ty: TypeId, v: &Value) -> FormError {
        FormError::Value(ValueError::Mismatch {
            kind: v.kind_name(),
            signature: mgr.display(ty),
        })
    }
}

impl<'b, 'v> TypeVisitor for Fill<'_, 'b, 'v> {
    type Data = (&'b mut InputBox, &'v Value);
    type Value = ();
    type Error = FormError;

    fn visit_type(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        (input, v): (&'b mut InputBox, &'v Value),
    ) -> Result<(), FormError> {
        let text = value_to_text(mgr, ty, v)?;
        input.set_text(&text)
    }

    fn visit_null(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        _: (&'b mut InputBox, &'v Value),
    ) -> Result<(), FormError> {
        Ok(())
    }

    fn visit_text(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        (input, v): (&'b mut InputBox, &'v Value),
    ) -> Result<(), FormError> {
        match v {
            Value::Text(s) => input.set_text(s),
            _ => Err(Self::mismatch(mgr, ty, v)),
        }
    }

    fn visit_opt(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        inner: TypeId,
        (input, v): (&'b mut InputBox, &'v Value),
    ) -> Result<(), FormError> {
        let Value::Opt(x) = v else {
            return Err(Self::mismatch(mgr, ty, v));
        };
        input.set_checked(mgr, self.options, x.is_some())?;
        match (x, input.child_mut(0)) {
            (Some(x), Some(child)) => mgr.accept(inner, self, (child, &**x)),
            _ => Ok(()),
        }
    }

    fn visit_record(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        fields: &[Field],
        (input, v): (&'b mut InputBox, &'v Value),
    ) -> Result<(), FormError> {
        let Value::Record(map) = v else {
            return Err(Self::mismatch(mgr, ty, v));
        };
        let form = input
            .form_mut()
            .ok_or(FormError::NoSuchControl { expected: "record" })?;
        for (field, child) in fields.iter().zip(form.children.iter_mut()) {
            let x = map.get(&field.name).ok_or_else(|| Self::mismatch(mgr, ty, v))?;
            mgr.accept(field.ty, self, (child, x))?;
        }
        Ok(())
    }

    fn visit_variant(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        fields: &[Field],
        (input, v): (&'b mut InputBox, &'v Value),
    ) -> Result<(), FormError> {
        let selected = v.variant_tag().and_then(|(tag, x)| {
            fields
                .iter()
                .position(|f| f.name == tag)
                .map(|index| (index, x))
        });
        let Some((index, x)) = selected else {
            return Err(Self::mismatch(mgr, ty, v));
        };
        input.select(mgr, self.options, index)?;
        match input.child_mut(0) {
            Some(child) => mgr.accept(fields[index].ty, self, (child, x)),
            None => Ok(()),
        }
    }

    fn visit_vec(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        inner: TypeId,
        (input, v): (&'b mut InputBox, &'v Value),
    ) -> Result<(), FormError> {
        let Value::Vec(items) = v else {
            return Err(Self::mismatch(mgr, ty, v));
        };
        if items.len() > self.options.max_vec_len {
            return Err(FormError::VecTooLong {
                len: items.len(),
                max: self.options.max_vec_len,
            });
        }
        input.set_length(mgr, self.options, &items.len().to_string())?;
        let form = input
            .form_mut()
            .ok_or(FormError::NoSuchControl { expected: "length" })?;
        for (item, child) in items.iter().zip(form.children.iter_mut()) {
            mgr.accept(inner, self, (child, item))?;
        }
        Ok(())
    }
}

/// Labels of a record form's children, by field name.
pub fn child_labels(input: &InputBox) -> BTreeMap<String, String> {
    match input.form() {
        Some(Form {
            kind: FormKind::Record(fields),
            children,
            ..
        }) => fields
            .iter()
            .zip(children)
            .filter_map(|(f, c)| c.label.clone().map(|l| (f.name.clone(), l)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

#[cfg(test)]
#[path = "form_test.rs"]
mod form_test;
