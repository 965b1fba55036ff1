//! Operator registry
//!
//! Maps operator symbols to their overloads for fixed operand types. The
//! registry is built once and shared; resolution rules that depend on type
//! families (equality, comparison, membership) live in their own modules and
//! only consult the registry for the concrete overloads.

use super::arithmetic;
use crate::error::EvalResult;
use crate::sql::SqlOp;
use rell_sema_ast::BinaryOp;
use rell_sema_types::{ResolvedType, Value};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Type alias for binary operator implementations
pub type BinaryFn = Arc<dyn Fn(&Value, &Value) -> EvalResult<Value> + Send + Sync>;

/// Type alias for unary operator implementations
pub type UnaryFn = Arc<dyn Fn(&Value) -> EvalResult<Value> + Send + Sync>;

/// Operator signature for type checking
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperatorSignature {
    pub op: BinaryOp,
    pub left: ResolvedType,
    pub right: ResolvedType,
    pub result: ResolvedType,
}

impl OperatorSignature {
    pub fn new(op: BinaryOp, left: ResolvedType, right: ResolvedType, result: ResolvedType) -> Self {
        Self {
            op,
            left,
            right,
            result,
        }
    }

    /// Check if this signature matches given operand types
    pub fn matches(&self, left: &ResolvedType, right: &ResolvedType) -> bool {
        &self.left == left && &self.right == right
    }
}

/// A registered overload
#[derive(Clone)]
pub struct Overload {
    pub signature: OperatorSignature,
    pub eval: BinaryFn,
    pub sql: Option<SqlOp>,
}

/// Registry for binary operators with fixed operand types
#[derive(Default)]
pub struct OperatorRegistry {
    operators: HashMap<BinaryOp, Vec<Overload>>,
}

impl OperatorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared registry with all built-in overloads
    pub fn builtin() -> &'static OperatorRegistry {
        static REGISTRY: LazyLock<OperatorRegistry> = LazyLock::new(OperatorRegistry::with_builtins);
        &REGISTRY
    }

    /// Register a binary operator overload
    pub fn register(&mut self, signature: OperatorSignature, eval: BinaryFn, sql: Option<SqlOp>) {
        self.operators
            .entry(signature.op)
            .or_default()
            .push(Overload { signature, eval, sql });
    }

    /// Get an overload for the given operand types
    pub fn get(&self, op: BinaryOp, left: &ResolvedType, right: &ResolvedType) -> Option<&Overload> {
        self.operators
            .get(&op)
            .and_then(|overloads| overloads.iter().find(|o| o.signature.matches(left, right)))
    }

    /// Get all overloads for an operator
    pub fn overloads(&self, op: BinaryOp) -> &[Overload] {
        self.operators.get(&op).map(|v| v.as_slice()).unwrap_or_default()
    }

    fn with_builtins() -> Self {
        let mut registry = Self::new();
        let ops = [
            (BinaryOp::Add, SqlOp::Add),
            (BinaryOp::Sub, SqlOp::Sub),
            (BinaryOp::Mul, SqlOp::Mul),
            (BinaryOp::Div, SqlOp::Div),
            (BinaryOp::Mod, SqlOp::Mod),
        ];
        for ty in [ResolvedType::Integer, ResolvedType::BigInteger, ResolvedType::Decimal] {
            for (op, sql) in ops {
                // NUMERIC division is fractional
                let sql = match (&ty, sql) {
                    (ResolvedType::BigInteger, SqlOp::Div) => SqlOp::TruncDiv,
                    (_, sql) => sql,
                };
                let signature = OperatorSignature::new(op, ty.clone(), ty.clone(), ty.clone());
                registry.register(signature, arithmetic::numeric_fn(op), Some(sql));
            }
        }
        for ty in [ResolvedType::Text, ResolvedType::ByteArray] {
            let signature = OperatorSignature::new(BinaryOp::Add, ty.clone(), ty.clone(), ty.clone());
            registry.register(signature, Arc::new(arithmetic::concat), Some(SqlOp::Concat));
        }
        log::debug!(
            "operator registry initialised with {} overloads",
            registry.operators.values().map(Vec::len).sum::<usize>()
        );
        registry
    }
}
