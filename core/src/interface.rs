//! Interface descriptions loaded from JSON.
//!
//! ```json
//! {
//!   "types": { "List": { "opt": { "record": { "head": "nat", "tail": "List" } } } },
//!   "service": { "sum": { "args": ["List"], "rets": ["nat"], "modes": ["query"] } }
//! }
//! ```
//!
//! A type is a primitive name, a defined name, or a single-key constructor
//! object: `opt`, `vec`, `record`, `variant`, `tuple`, `func`, `service`.
//! Every defined name is a knot, so definitions may refer to each other in
//! any order and recursively.

use knot_types::{FuncModes, FuncType, TypeError, TypeId, TypeKind, TypeManager, Width};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    #[error("malformed interface description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown type `{name}`")]
    UnknownType { name: String },

    #[error("`{name}` is a primitive type and cannot be redefined")]
    ReservedName { name: String },

    #[error("service has no method `{name}`")]
    UnknownMethod { name: String },

    #[error(transparent)]
    Type(#[from] TypeError),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeExpr {
    Name(String),
    Ctor(Ctor),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Ctor {
    Opt(Box<TypeExpr>),
    Vec(Box<TypeExpr>),
    Record(BTreeMap<String, TypeExpr>),
    Variant(BTreeMap<String, TypeExpr>),
    Tuple(Vec<TypeExpr>),
    Func(FuncExpr),
    Service(BTreeMap<String, TypeExpr>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Mode {
    Query,
    Oneway,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FuncExpr {
    #[serde(default)]
    args: Vec<TypeExpr>,
    #[serde(default)]
    rets: Vec<TypeExpr>,
    #[serde(default)]
    modes: Vec<Mode>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    #[serde(default)]
    types: BTreeMap<String, TypeExpr>,
    #[serde(default)]
    service: BTreeMap<String, FuncExpr>,
}

fn primitive(mgr: &mut TypeManager, name: &str) -> Option<TypeId> {
    let ty = match name {
        "null" => mgr.null(),
        "bool" => mgr.bool(),
        "text" => mgr.text(),
        "principal" => mgr.principal(),
        "float64" => mgr.float64(),
        "empty" => mgr.empty(),
        "int" => mgr.int(),
        "nat" => mgr.nat(),
        _ => {
            let (signed, bits) = match name.strip_prefix("int") {
                Some(bits) => (true, bits),
                None => (false, name.strip_prefix("nat")?),
            };
            let width = Width::from_bits(bits.parse().ok()?)?;
            if signed {
                mgr.fixed_int(width)
            } else {
                mgr.fixed_nat(width)
            }
        }
    };
    Some(ty)
}

struct Builder<'m> {
    mgr: &'m mut TypeManager,
    names: &'m BTreeMap<String, TypeId>,
}

impl Builder<'_> {
    fn build(&mut self, expr: &TypeExpr) -> Result<TypeId, InterfaceError> {
        let ctor = match expr {
            TypeExpr::Name(name) => {
                if let Some(ty) = primitive(self.mgr, name) {
                    return Ok(ty);
                }
                return self
                    .names
                    .get(name)
                    .copied()
                    .ok_or_else(|| InterfaceError::UnknownType { name: name.clone() });
            }
            TypeExpr::Ctor(ctor) => ctor,
        };
        let ty = match ctor {
            Ctor::Opt(inner) => {
                let inner = self.build(inner)?;
                self.mgr.opt(inner)
            }
            Ctor::Vec(inner) => {
                let inner = self.build(inner)?;
                self.mgr.vec(inner)
            }
            Ctor::Record(fields) => {
                let fields = self.build_map(fields)?;
                self.mgr.record(fields)?
            }
            Ctor::Variant(fields) => {
                let fields = self.build_map(fields)?;
                self.mgr.variant(fields)?
            }
            Ctor::Tuple(items) => {
                let items = self.build_all(items)?;
                self.mgr.tuple(items)
            }
            Ctor::Func(func) => self.build_func(func)?,
            Ctor::Service(methods) => {
                let methods = self.build_map(methods)?;
                self.mgr.service(methods)?
            }
        };
        Ok(ty)
    }

    fn build_all(&mut self, exprs: &[TypeExpr]) -> Result<Vec<TypeId>, InterfaceError> {
        exprs.iter().map(|e| self.build(e)).collect()
    }

    fn build_map<'e>(
        &mut self,
        exprs: &'e BTreeMap<String, TypeExpr>,
    ) -> Result<Vec<(&'e str, TypeId)>, InterfaceError> {
        exprs
            .iter()
            .map(|(name, e)| Ok((name.as_str(), self.build(e)?)))
            .collect()
    }

    fn build_func(&mut self, func: &FuncExpr) -> Result<TypeId, InterfaceError> {
        let args = self.build_all(&func.args)?;
        let rets = self.build_all(&func.rets)?;
        let modes = func.modes.iter().fold(FuncModes::empty(), |acc, m| {
            acc | match m {
                Mode::Query => FuncModes::QUERY,
                Mode::Oneway => FuncModes::ONEWAY,
            }
        });
        Ok(self.mgr.func(args, rets, modes))
    }
}

/// A loaded service description and the manager owning its types.
#[derive(Debug)]
pub struct Interface {
    mgr: TypeManager,
    service: TypeId,
    methods: BTreeMap<String, TypeId>,
    named: BTreeMap<String, TypeId>,
}

impl Interface {
    /// Load an interface from its JSON description.
    ///
    /// # Example
    ///
    /// ```
    /// use knot_core::interface::Interface;
    ///
    /// let iface = Interface::from_json(r#"{
    ///     "service": { "greet": { "args": ["text"], "rets": ["text"], "modes": ["query"] } }
    /// }"#).unwrap();
    /// let (ty, _) = iface.method("greet").unwrap();
    /// assert_eq!(iface.manager().display(ty), "func (text) → (text) query");
    /// ```
    pub fn from_json(json: &str) -> Result<Self, InterfaceError> {
        let doc: Document = serde_json::from_str(json)?;
        let mut mgr = TypeManager::new();

        let mut named = BTreeMap::new();
        for name in doc.types.keys() {
            if primitive(&mut mgr, name).is_some() {
                return Err(InterfaceError::ReservedName { name: name.clone() });
            }
            named.insert(name.clone(), mgr.rec());
        }

        let mut builder = Builder {
            mgr: &mut mgr,
            names: &named,
        };
        let mut targets = Vec::with_capacity(doc.types.len());
        for (name, expr) in &doc.types {
            targets.push((named[name], builder.build(expr)?));
        }
        let mut methods = BTreeMap::new();
        for (name, func) in &doc.service {
            methods.insert(name.clone(), builder.build_func(func)?);
        }

        for (knot, target) in targets {
            mgr.fill(knot, target)?;
        }
        let service = mgr.service(methods.iter().map(|(name, &ty)| (name.as_str(), ty)))?;
        mgr.check_closed(service)?;
        for &knot in named.values() {
            mgr.check_closed(knot)?;
        }
        debug!(
            types = named.len(),
            methods = methods.len(),
            "loaded interface"
        );

        Ok(Interface {
            mgr,
            service,
            methods,
            named,
        })
    }

    pub fn manager(&self) -> &TypeManager {
        &self.mgr
    }

    pub fn manager_mut(&mut self) -> &mut TypeManager {
        &mut self.mgr
    }

    /// The service type of all methods.
    pub fn service(&self) -> TypeId {
        self.service
    }

    /// Look up a method's function type.
    pub fn method(&self, name: &str) -> Result<(TypeId, &FuncType), InterfaceError> {
        let ty = self
            .methods
            .get(name)
            .copied()
            .ok_or_else(|| InterfaceError::UnknownMethod { name: name.into() })?;
        match self.mgr.kind(ty) {
            TypeKind::Func(func) => Ok((ty, func)),
            _ => Err(TypeError::NotAFunction { name: name.into() }.into()),
        }
    }

    /// Method names in order with their function types.
    pub fn methods(&self) -> impl Iterator<Item = (&str, TypeId)> + '_ {
        self.methods.iter().map(|(name, &ty)| (name.as_str(), ty))
    }

    /// A type defined under `name`.
    pub fn named(&self, name: &str) -> Option<TypeId> {
        self.named.get(name).copied()
    }
}
