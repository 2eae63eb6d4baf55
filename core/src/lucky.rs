//! Random values of a type.
//!
//! Generation is free until the depth budget is spent; from then on only
//! branches of minimal rank are taken (`none`, empty vectors, the shallowest
//! variant arm), so recursive types always terminate.

use crate::options::LuckyOptions;
use crate::principal::Principal;
use crate::values::Value;
use knot_types::{
    Field, FuncType, Method, Ranks, TypeError, TypeId, TypeManager, TypeVisitor, Width,
};
use num_bigint::BigInt;
use rand::Rng;
use std::collections::BTreeMap;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a random value of `ty`. The value is always covariant with `ty`.
///
/// Fails with [`TypeError::Uninhabited`] when `ty` has no finite value, and
/// with a knot error when the type graph is not closed.
///
/// # Example
///
/// ```
/// use knot_core::covariant::covariant;
/// use knot_core::lucky::lucky;
/// use knot_core::options::LuckyOptions;
/// use knot_core::types::TypeManager;
/// use rand::SeedableRng;
///
/// let mut mgr = TypeManager::new();
/// let nat = mgr.nat();
/// let list = mgr.vec(nat);
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let value = lucky(&mgr, list, &mut rng, &LuckyOptions::default()).unwrap();
/// assert!(covariant(&mgr, list, &value).unwrap());
/// ```
pub fn lucky<R: Rng + ?Sized>(
    mgr: &TypeManager,
    ty: TypeId,
    rng: &mut R,
    options: &LuckyOptions,
) -> Result<Value, TypeError> {
    mgr.check_closed(ty)?;
    let ranks = mgr.ranks();
    if !ranks.is_inhabited(ty) {
        return Err(TypeError::Uninhabited { ty });
    }
    let mut lucky = Lucky {
        rng,
        ranks,
        options,
    };
    mgr.accept(ty, &mut lucky, options.depth_budget)
}

/// Visitor data is the remaining depth budget.
struct Lucky<'a, R: ?Sized> {
    rng: &'a mut R,
    ranks: Ranks,
    options: &'a LuckyOptions,
}

impl<R: Rng + ?Sized> Lucky<'_, R> {
    fn small(&mut self, signed: bool) -> BigInt {
        let n: i64 = self.rng.gen_range(0..100);
        if signed && self.rng.gen_bool(0.5) {
            BigInt::from(-n)
        } else {
            BigInt::from(n)
        }
    }

    fn text(&mut self, min_len: usize) -> String {
        let len = self.rng.gen_range(min_len..=self.options.text_len.max(min_len));
        (0..len)
            .map(|_| ALPHABET[self.rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }

    fn principal(&mut self) -> Principal {
        let len = self.rng.gen_range(1..=8);
        let bytes: Vec<u8> = (0..len).map(|_| self.rng.r#gen()).collect();
        Principal::from(bytes)
    }

    fn pick_arm<'f>(&mut self, fields: &'f [Field], budget: usize) -> Option<&'f Field> {
        let inhabited: Vec<&Field> = fields
            .iter()
            .filter(|f| self.ranks.is_inhabited(f.ty))
            .collect();
        if budget == 0 {
            return inhabited.into_iter().min_by_key(|f| self.ranks.get(f.ty));
        }
        if inhabited.is_empty() {
            return None;
        }
        Some(inhabited[self.rng.gen_range(0..inhabited.len())])
    }
}

impl<R: Rng + ?Sized> TypeVisitor for Lucky<'_, R> {
    type Data = usize;
    type Value = Value;
    type Error = TypeError;

    fn visit_type(&mut self, _: &TypeManager, ty: TypeId, _: usize) -> Result<Value, TypeError> {
        Err(TypeError::Uninhabited { ty })
    }

    fn visit_null(&mut self, _: &TypeManager, _: TypeId, _: usize) -> Result<Value, TypeError> {
        Ok(Value::Null)
    }

    fn visit_bool(&mut self, _: &TypeManager, _: TypeId, _: usize) -> Result<Value, TypeError> {
        Ok(Value::Bool(self.rng.r#gen()))
    }

    fn visit_text(&mut self, _: &TypeManager, _: TypeId, _: usize) -> Result<Value, TypeError> {
        Ok(Value::Text(self.text(0)))
    }

    fn visit_float(&mut self, _: &TypeManager, _: TypeId, _: usize) -> Result<Value, TypeError> {
        Ok(Value::Float(self.rng.r#gen::<f64>()))
    }

    fn visit_principal(&mut self, _: &TypeManager, _: TypeId, _: usize) -> Result<Value, TypeError> {
        Ok(Value::Principal(self.principal()))
    }

    fn visit_int(&mut self, _: &TypeManager, _: TypeId, _: usize) -> Result<Value, TypeError> {
        Ok(Value::Int(self.small(true)))
    }

    fn visit_nat(&mut self, _: &TypeManager, _: TypeId, _: usize) -> Result<Value, TypeError> {
        Ok(Value::Int(self.small(false)))
    }

    fn visit_fixed_int(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        _: Width,
        _: usize,
    ) -> Result<Value, TypeError> {
        // [-99, 99] fits int8.
        Ok(Value::Int(self.small(true)))
    }

    fn visit_fixed_nat(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        _: Width,
        _: usize,
    ) -> Result<Value, TypeError> {
        Ok(Value::Int(self.small(false)))
    }

    fn visit_opt(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        inner: TypeId,
        budget: usize,
    ) -> Result<Value, TypeError> {
        if budget == 0 || !self.ranks.is_inhabited(inner) || self.rng.gen_bool(0.5) {
            return Ok(Value::none());
        }
        Ok(Value::some(mgr.accept(inner, self, budget - 1)?))
    }

    fn visit_vec(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        inner: TypeId,
        budget: usize,
    ) -> Result<Value, TypeError> {
        if budget == 0 || !self.ranks.is_inhabited(inner) {
            return Ok(Value::Vec(Vec::new()));
        }
        let len = self.rng.gen_range(0..=self.options.max_vec_len);
        let items = (0..len)
            .map(|_| mgr.accept(inner, self, budget - 1))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Vec(items))
    }

    fn visit_record(
        &mut self,
        mgr: &TypeManager,
        _: TypeId,
        fields: &[Field],
        budget: usize,
    ) -> Result<Value, TypeError> {
        let mut map = BTreeMap::new();
        for field in fields {
            let value = mgr.accept(field.ty, self, budget.saturating_sub(1))?;
            map.insert(field.name.clone(), value);
        }
        Ok(Value::Record(map))
    }

    fn visit_variant(
        &mut self,
        mgr: &TypeManager,
        ty: TypeId,
        fields: &[Field],
        budget: usize,
    ) -> Result<Value, TypeError> {
        let field = self
            .pick_arm(fields, budget)
            .ok_or(TypeError::Uninhabited { ty })?;
        let value = mgr.accept(field.ty, self, budget.saturating_sub(1))?;
        Ok(Value::variant(field.name.clone(), value))
    }

    fn visit_func(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        _: &FuncType,
        _: usize,
    ) -> Result<Value, TypeError> {
        let principal = self.principal();
        Ok(Value::Func(principal, self.text(1)))
    }

    fn visit_service(
        &mut self,
        _: &TypeManager,
        _: TypeId,
        _: &[Method],
        _: usize,
    ) -> Result<Value, TypeError> {
        Ok(Value::Service(self.principal()))
    }
}
