//! Membership operators (`in`, `not in`)
//!
//! The right operand selects the tested element type:
//! - `list<T>`, `set<T>`: an element of type `T`
//! - `map<K,V>`: a key of type `K`
//! - `range`: an integer
//! - `virtual<list<T>>`: an integer index; `virtual<set<T>>` and
//!   `virtual<map<K,V>>` behave like their plain counterparts

use super::{BinaryOperator, OperandCast};
use crate::error::EvalError;
use rell_sema_ast::BinaryOp;
use rell_sema_types::{ResolvedType, Value};
use std::sync::Arc;

enum Container {
    Values(ResolvedType),
    Indices,
}

fn container(ty: &ResolvedType) -> Option<Container> {
    match ty {
        ResolvedType::List(elem) | ResolvedType::Set(elem) => Some(Container::Values((**elem).clone())),
        ResolvedType::Map(key, _) => Some(Container::Values((**key).clone())),
        ResolvedType::Range => Some(Container::Values(ResolvedType::Integer)),
        ResolvedType::Virtual(inner) => match &**inner {
            ResolvedType::List(_) => Some(Container::Indices),
            other => container(other),
        },
        _ => None,
    }
}

pub(super) fn resolve(op: BinaryOp, left: &ResolvedType, right: &ResolvedType) -> Option<BinaryOperator> {
    let negated = op == BinaryOp::NotIn;
    let (element, indices) = match container(right)? {
        Container::Values(elem) => (elem, false),
        Container::Indices => (ResolvedType::Integer, true),
    };

    let left_cast = if element.is_assignable_from(left) {
        None
    } else {
        Some(OperandCast::promote(left, &element)?)
    };

    let eval = Arc::new(move |item: &Value, coll: &Value| {
        let found = if indices {
            match (item, coll.len()) {
                (Value::Integer(i), Some(len)) => *i >= 0 && (*i as u64) < len as u64,
                _ => false,
            }
        } else {
            coll.contains(item)
                .ok_or_else(|| EvalError::internal(format!("not a collection: {coll}")))?
        };
        Ok(Value::Boolean(found != negated))
    });
    Some(BinaryOperator::strict(op, ResolvedType::Boolean, eval, None).with_casts(left_cast, None))
}
