//! When-expression compiler
//!
//! A when-expression compiles in one pass over its cases into a
//! [`MatchPlan`]: constant conditions fill a value table (duplicates are
//! errors), every condition also becomes a runtime test, in case order.
//!
//! With a key, a condition matches when it equals the key; a bare enum
//! member name resolves against the key's enum type. Without a key, a
//! condition is a boolean. Boolean and enum keys, and nullable ones, are
//! exhaustive once the table holds every value of the type.
//!
//! Facts flow through the cases: the falsity of every earlier condition
//! holds in later cases and in `else`.

use crate::compile::ops::compile_binary_exprs;
use crate::compile::{combine, compile_expr, promote_all, type_mismatch};
use crate::context::CompilationContext;
use crate::error::{EvalError, EvalResult};
use crate::expr::{CompiledExpr, Evaluator};
use crate::facts::{ExprFacts, VarFact, VarFacts};
use crate::ids::VarUid;
use crate::operators::resolve_binary;
use crate::runtime::Frame;
use crate::sql::{DbExpr, SqlOp};
use indexmap::IndexMap;
use rell_sema_ast::{BinaryOp, Expr, WhenCase, WhenCondition, WhenExpr};
use rell_sema_diagnostics::{
    RELL0300, RELL0301, RELL0302, RELL0303, RELL0304, RELL0305, RELL0306, RELL0307, Span,
};
use rell_sema_types::{ResolvedType, Value};
use std::fmt;
use std::sync::Arc;

/// One case of a when-expression
#[derive(Debug)]
pub struct MatchCase {
    /// Conditions as written; empty for `else`
    pub conditions: Vec<CompiledExpr>,
    /// Facts the body was compiled under
    pub facts: VarFacts,
    pub body: CompiledExpr,
}

/// Compiled when-expression
#[derive(Debug)]
pub struct MatchPlan {
    pub key: Option<CompiledExpr>,
    /// Constant condition values and the case they select
    pub constants: IndexMap<Value, usize>,
    pub cases: Vec<MatchCase>,
    /// Index of the `else` case
    pub default: Option<usize>,
    /// Every run selects some case
    pub exhaustive: bool,
    pub result_type: ResolvedType,
    /// Runtime tests in case order, with the case each one selects
    tests: Vec<(usize, CompiledExpr)>,
    /// Where the key value is kept while the tests run
    slot: Option<VarUid>,
    /// Every condition is a constant of the key's type
    table_only: bool,
}

impl MatchPlan {
    /// Index of the case selected in this frame
    pub fn choose(&self, frame: &mut Frame<'_>) -> EvalResult<Option<usize>> {
        if let (Some(key), Some(slot)) = (&self.key, self.slot) {
            let value = key.evaluate(frame)?;
            if self.table_only {
                return Ok(self.constants.get(&value).copied().or(self.default));
            }
            frame.set(slot, value);
        }
        for (case, test) in &self.tests {
            if test.evaluate(frame)?.as_bool() == Some(true) {
                return Ok(Some(*case));
            }
        }
        Ok(self.default)
    }

    pub fn execute(&self, frame: &mut Frame<'_>) -> EvalResult<Value> {
        match self.choose(frame)? {
            Some(case) => self.cases[case].body.evaluate(frame),
            None => Err(EvalError::internal("no when case matched")),
        }
    }
}

impl fmt::Display for MatchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "when ({})", key.ty)?,
            None => write!(f, "when")?,
        }
        write!(
            f,
            " {} case(s), {} constant(s), {} test(s)",
            self.cases.len(),
            self.constants.len(),
            self.tests.len()
        )?;
        if self.exhaustive {
            write!(f, ", exhaustive")?;
        }
        write!(f, " -> {}", self.result_type)
    }
}

/// Cases while they are being compiled
#[derive(Default)]
struct CaseTable {
    constants: IndexMap<Value, usize>,
    conditions: Vec<Vec<CompiledExpr>>,
    facts: Vec<VarFacts>,
    default: Option<(usize, Span)>,
    /// Facts holding when no condition so far was true
    else_facts: VarFacts,
    /// A case was rejected
    failed: bool,
}

/// Compile a when-expression
///
/// Returns the expression and, unless compilation failed, its plan.
pub fn compile_when(ctx: &mut CompilationContext, when: &WhenExpr, span: Span) -> (CompiledExpr, Option<Arc<MatchPlan>>) {
    let mut failed = false;
    let key = match &when.key {
        Some(key) => {
            let key = compile_expr(ctx, key);
            if key.is_error() {
                return (CompiledExpr::error(span), None);
            }
            if key.ty.is_null() {
                ctx.error(key.span, RELL0303, "when_expr_type:null", "Cannot use null as when expression");
                failed = true;
            }
            Some(key)
        }
        None => None,
    };
    let key_post = key.as_ref().map_or_else(VarFacts::empty, |k| k.facts.post.clone());

    let (mut table, bodies, post) = ctx.with_facts(&key_post, |ctx| {
        let table = compile_cases(ctx, key.as_ref(), &when.cases);
        let bodies: Vec<CompiledExpr> = when
            .cases
            .iter()
            .zip(&table.facts)
            .map(|(case, facts)| ctx.with_facts(facts, |ctx| compile_expr(ctx, &case.body)))
            .collect();
        let branches: Vec<VarFacts> = table
            .facts
            .iter()
            .zip(&bodies)
            .map(|(facts, body)| facts.put(&body.facts.post))
            .collect();
        let post = VarFacts::for_branches(ctx.facts(), &branches);
        (table, bodies, post)
    });

    failed |= check_case_types(ctx, key.as_ref(), &table.conditions);
    let exhaustive = coverage(ctx, key.as_ref(), &mut table);
    failed |= table.failed;
    if !exhaustive {
        ctx.error(span, RELL0302, "when_no_else", "Else case missing");
        failed = true;
    }

    let Some((result_type, bodies)) = result_type(ctx, &when.cases, bodies) else {
        return (CompiledExpr::error(span), None);
    };
    if failed || result_type.is_error() {
        return (CompiledExpr::error(span), None);
    }

    let slot = key.as_ref().map(|_| ctx.ids().next_var());
    let parts: Vec<CompiledExpr> = key
        .iter()
        .cloned()
        .chain(table.conditions.iter().flatten().cloned())
        .chain(bodies.iter().cloned())
        .collect();
    let database = parts.iter().any(CompiledExpr::is_db);
    let tests = if database {
        Vec::new()
    } else {
        runtime_tests(ctx, key.as_ref(), slot, &table.conditions)
    };
    let table_only = key.as_ref().is_some_and(|key| {
        let value_ty = key.ty.unwrap_nullable();
        table.conditions.iter().flatten().all(|c| {
            c.constant.is_some() && (c.ty.is_null() || c.ty.unwrap_nullable() == value_ty)
        })
    });

    let shape: Vec<usize> = table.conditions.iter().map(Vec::len).collect();
    let key_op = match &key {
        Some(key) if key.ty.is_nullable() => Some(SqlOp::NotDistinct),
        Some(_) => Some(SqlOp::Eq),
        None => None,
    };
    let default = table.default.map(|(idx, _)| idx);
    let cases = table
        .conditions
        .into_iter()
        .zip(table.facts)
        .zip(bodies)
        .map(|((conditions, facts), body)| MatchCase {
            conditions,
            facts,
            body,
        })
        .collect();
    let plan = Arc::new(MatchPlan {
        key,
        constants: table.constants,
        cases,
        default,
        exhaustive,
        result_type: result_type.clone(),
        tests,
        slot,
        table_only,
    });
    log::debug!("built match plan: {plan}");

    let runner = Arc::clone(&plan);
    let build = move |_: Vec<Evaluator>| Evaluator::new(move |frame| runner.execute(frame));
    let db = move |ops: &[DbExpr]| case_sql(key_op, &shape, default, ops);
    let refs: Vec<&CompiledExpr> = parts.iter().collect();
    let expr = combine(ctx, result_type, span, &refs, build, Some(&db)).with_facts(ExprFacts::of_post(key_post.put(&post)));
    (expr, Some(plan))
}

fn compile_cases(ctx: &mut CompilationContext, key: Option<&CompiledExpr>, cases: &[WhenCase]) -> CaseTable {
    let mut table = CaseTable::default();
    let last = cases.len().saturating_sub(1);
    for (idx, case) in cases.iter().enumerate() {
        match &case.condition {
            WhenCondition::Else(else_span) => {
                if idx != last {
                    ctx.error(*else_span, RELL0301, "when_else_notlast", "Else case must be the last one");
                    table.failed = true;
                }
                table.default = Some((idx, *else_span));
                table.conditions.push(Vec::new());
                table.facts.push(table.else_facts.clone());
                table.else_facts = VarFacts::empty();
            }
            WhenCondition::Exprs(exprs) => {
                let start = table.else_facts.clone();
                let mut case_facts = start.clone();
                let mut conditions = Vec::with_capacity(exprs.len());
                for expr in exprs {
                    let condition = ctx.with_facts(&table.else_facts, |ctx| compile_condition(ctx, key, expr));
                    let facts = condition_facts(key, &condition);
                    table.else_facts = table.else_facts.and(&facts.false_facts);
                    if exprs.len() == 1 {
                        case_facts = start.and(&facts.when_true());
                    }
                    if let Some(value) = &condition.constant {
                        if table.constants.contains_key(value) {
                            ctx.error(
                                condition.span,
                                RELL0300,
                                format!("when_expr_dupvalue:{value}"),
                                "Value already used",
                            );
                            table.failed = true;
                        } else {
                            table.constants.insert(value.clone(), idx);
                        }
                    }
                    conditions.push(condition);
                }
                table.conditions.push(conditions);
                table.facts.push(case_facts);
            }
        }
    }
    table
}

/// A condition; bare names of the key's enum values are enum constants
fn compile_condition(ctx: &mut CompilationContext, key: Option<&CompiledExpr>, expr: &Expr) -> CompiledExpr {
    if let Some(ResolvedType::Enum(enum_name)) = key.map(|k| k.ty.unwrap_nullable()) {
        if let Some(name) = expr.inner.as_name() {
            if !ctx.scopes().is_defined(name) {
                let found = ctx.definitions().enumeration(enum_name).and_then(|def| {
                    def.values.iter().position(|v| v == name)
                });
                if let Some(index) = found {
                    log::trace!("when case '{name}' resolved as {enum_name}.{name}");
                    let value = Value::enum_value(enum_name, index, name);
                    return CompiledExpr::constant(value, ResolvedType::Enum(enum_name.clone()), expr.span);
                }
            }
        }
    }
    compile_expr(ctx, expr)
}

/// Facts of one condition; comparing the key variable with `null` narrows it
fn condition_facts(key: Option<&CompiledExpr>, condition: &CompiledExpr) -> ExprFacts {
    let Some(key) = key else {
        return condition.facts.clone();
    };
    match &key.var {
        Some(var) if condition.ty.is_null() && var.declared.is_nullable() => ExprFacts {
            true_facts: VarFacts::of_nulled(var.uid, VarFact::Yes),
            false_facts: VarFacts::of_nulled(var.uid, VarFact::No),
            post: VarFacts::empty(),
        },
        _ => ExprFacts::empty(),
    }
}

/// Report conditions of the wrong type; true if any was reported
fn check_case_types(ctx: &mut CompilationContext, key: Option<&CompiledExpr>, conditions: &[Vec<CompiledExpr>]) -> bool {
    let mut failed = false;
    for condition in conditions.iter().flatten() {
        if condition.is_error() {
            failed = true;
            continue;
        }
        match key {
            None if condition.ty != ResolvedType::Boolean => {
                type_mismatch(
                    ctx,
                    condition.span,
                    RELL0304,
                    "when_case_type",
                    "Wrong type of when condition",
                    &ResolvedType::Boolean,
                    &condition.ty,
                );
                failed = true;
            }
            Some(key) if !comparable(&key.ty, &condition.ty) => {
                ctx.error(
                    condition.span,
                    RELL0304,
                    format!("when_case_type:{}:{}", key.ty, condition.ty),
                    format!("Type mismatch: {} instead of {}", condition.ty, key.ty),
                );
                failed = true;
            }
            _ => {}
        }
    }
    failed
}

fn comparable(key: &ResolvedType, case: &ResolvedType) -> bool {
    if resolve_binary(BinaryOp::Eq, key, case).is_ok() {
        return true;
    }
    key.is_nullable() && resolve_binary(BinaryOp::Eq, key.unwrap_nullable(), case).is_ok()
}

/// Whether every run selects a case; reports an `else` with nothing left
fn coverage(ctx: &mut CompilationContext, key: Option<&CompiledExpr>, table: &mut CaseTable) -> bool {
    let Some(key) = key else {
        return table.default.is_some();
    };
    let values = all_values(ctx, &key.ty);
    let covered = !values.is_empty() && values.iter().all(|v| table.constants.contains_key(v));
    if covered {
        if let Some((_, else_span)) = table.default {
            ctx.error(
                else_span,
                RELL0305,
                format!("when_else_allvalues:{}", key.ty),
                format!("No values of type '{}' left for the else case", key.ty),
            );
            table.failed = true;
        }
    }
    covered || table.default.is_some()
}

/// Every value of a type with finitely many values; empty for other types
fn all_values(ctx: &CompilationContext, ty: &ResolvedType) -> Vec<Value> {
    match ty {
        ResolvedType::Boolean => vec![Value::Boolean(false), Value::Boolean(true)],
        ResolvedType::Enum(name) => ctx.definitions().enumeration(name).map_or_else(Vec::new, |def| {
            def.values
                .iter()
                .enumerate()
                .map(|(index, value)| Value::enum_value(name, index, value))
                .collect()
        }),
        ResolvedType::Nullable(inner) => {
            let mut values = all_values(ctx, inner);
            if !values.is_empty() {
                values.push(Value::Null);
            }
            values
        }
        _ => Vec::new(),
    }
}

/// Common type of the bodies after numeric promotion
fn result_type(
    ctx: &mut CompilationContext,
    cases: &[WhenCase],
    bodies: Vec<CompiledExpr>,
) -> Option<(ResolvedType, Vec<CompiledExpr>)> {
    if bodies.iter().any(CompiledExpr::is_error) {
        return None;
    }
    let mut unit = false;
    for body in &bodies {
        if body.ty.is_unit() {
            ctx.error(body.span, RELL0307, "when_exprtype_unit", "Expression returns nothing");
            unit = true;
        }
    }
    if unit {
        return None;
    }

    let bodies = promote_all(bodies);
    let mut ty = bodies.first()?.ty.clone();
    for (body, case) in bodies.iter().zip(cases).skip(1) {
        match ResolvedType::common_type(&ty, &body.ty) {
            Some(common) => ty = common,
            None => {
                ctx.error(
                    case.body.span,
                    RELL0306,
                    format!("expr_when_incompatible_type:{ty}:{}", body.ty),
                    format!("When case expressions have incompatible types: {ty} and {}", body.ty),
                );
                return None;
            }
        }
    }
    Some((ty, bodies))
}

/// Runtime tests: `key == condition` through the key slot, or the condition itself
fn runtime_tests(
    ctx: &mut CompilationContext,
    key: Option<&CompiledExpr>,
    slot: Option<VarUid>,
    conditions: &[Vec<CompiledExpr>],
) -> Vec<(usize, CompiledExpr)> {
    let mut tests = Vec::new();
    for (case, conditions) in conditions.iter().enumerate() {
        for condition in conditions {
            let test = match (key, slot) {
                (Some(key), Some(slot)) => {
                    let value = CompiledExpr::interpreted(
                        key.ty.clone(),
                        key.span,
                        Evaluator::new(move |frame| frame.get(slot).cloned()),
                    );
                    compile_binary_exprs(ctx, BinaryOp::Eq, value, condition.clone(), condition.span)
                }
                _ => condition.clone(),
            };
            tests.push((case, test));
        }
    }
    tests
}

/// `CASE WHEN ... THEN ... ELSE ... END` over the key, conditions and bodies
fn case_sql(key_op: Option<SqlOp>, shape: &[usize], default: Option<usize>, ops: &[DbExpr]) -> DbExpr {
    let mut ops = ops.iter();
    let key = match key_op {
        Some(op) => ops.next().map(|key| (op, key.clone())),
        None => None,
    };
    let conditions: Vec<Vec<DbExpr>> = shape.iter().map(|n| ops.by_ref().take(*n).cloned().collect()).collect();
    let bodies: Vec<DbExpr> = ops.cloned().collect();

    let mut cases = Vec::new();
    let mut otherwise = None;
    for (idx, (conditions, body)) in conditions.into_iter().zip(bodies).enumerate() {
        if Some(idx) == default {
            otherwise = Some(Box::new(body));
            continue;
        }
        let tests = conditions.into_iter().map(|condition| match (&key, condition) {
            (Some((_, key)), DbExpr::Constant(Value::Null)) => DbExpr::is_null(key.clone(), false),
            (Some((op, key)), condition) => DbExpr::binary(*op, key.clone(), condition),
            (None, condition) => condition,
        });
        let test = tests.reduce(|left, right| DbExpr::binary(SqlOp::Or, left, right));
        if let Some(test) = test {
            cases.push((test, body));
        }
    }
    DbExpr::Case {
        cases,
        default: otherwise,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::NoDatabase;
    use crate::sql::SqlBuilder;
    use crate::test_support::context;
    use pretty_assertions::assert_eq;
    use rell_sema_ast::dsl::*;
    use rell_sema_ast::{AtCardinality, Expression};
    use rstest::rstest;

    fn when_expr(key: Option<Expr>, cases: Vec<WhenCase>) -> WhenExpr {
        match when(key, cases).inner {
            Expression::When(when) => *when,
            _ => unreachable!(),
        }
    }

    fn compile(ctx: &mut CompilationContext, key: Option<Expr>, cases: Vec<WhenCase>) -> (CompiledExpr, Option<Arc<MatchPlan>>) {
        compile_when(ctx, &when_expr(key, cases), Span::default())
    }

    fn run(expr: &CompiledExpr, setup: impl FnOnce(&mut Frame<'_>)) -> EvalResult<Value> {
        let db = NoDatabase;
        let mut frame = Frame::new(&db);
        setup(&mut frame);
        expr.evaluate(&mut frame)
    }

    #[test]
    fn test_boolean_key_exhaustive() {
        let mut ctx = context();
        let b = ctx.declare_param("b", ResolvedType::Boolean);
        let (expr, plan) = compile(
            &mut ctx,
            Some(name("b")),
            vec![case(vec![boolean(true)], int(1)), case(vec![boolean(false)], int(2))],
        );
        assert_eq!(ctx.sink().keys(), Vec::<&str>::new());
        assert!(plan.unwrap().exhaustive);
        assert_eq!(run(&expr, |f| f.set(b, Value::Boolean(false))), Ok(Value::Integer(2)));
    }

    #[rstest]
    #[case(vec![case(vec![boolean(true)], int(1))], vec!["when_no_else"])]
    #[case(
        vec![case(vec![boolean(true), boolean(true)], int(1)), else_case(int(2))],
        vec!["when_expr_dupvalue:true"]
    )]
    #[case(
        vec![case(vec![boolean(true)], int(1)), case(vec![boolean(false)], int(2)), else_case(int(3))],
        vec!["when_else_allvalues:boolean"]
    )]
    #[case(
        vec![else_case(int(2)), case(vec![boolean(true)], int(1))],
        vec!["when_else_notlast"]
    )]
    #[case(
        vec![case(vec![int(1)], int(1)), else_case(int(2))],
        vec!["when_case_type:boolean:integer"]
    )]
    #[case(
        vec![case(vec![boolean(true)], int(1)), else_case(text("x"))],
        vec!["expr_when_incompatible_type:integer:text"]
    )]
    fn test_boolean_key_errors(#[case] cases: Vec<WhenCase>, #[case] expected: Vec<&str>) {
        let mut ctx = context();
        ctx.declare_param("b", ResolvedType::Boolean);
        let (expr, plan) = compile(&mut ctx, Some(name("b")), cases);
        assert_eq!(ctx.sink().keys(), expected);
        assert!(expr.is_error());
        assert!(plan.is_none());
    }

    #[test]
    fn test_keyless_conditions_must_be_boolean() {
        let mut ctx = context();
        let (expr, _) = compile(&mut ctx, None, vec![case(vec![int(1)], int(1)), else_case(int(2))]);
        assert!(expr.is_error());
        assert_eq!(ctx.sink().keys(), vec!["when_case_type:[boolean]:[integer]"]);
    }

    #[test]
    fn test_null_key_is_rejected() {
        let mut ctx = context();
        compile(&mut ctx, Some(null()), vec![else_case(int(1))]);
        assert_eq!(ctx.sink().keys()[0], "when_expr_type:null");
    }

    #[test]
    fn test_enum_bare_names() {
        let mut ctx = context();
        let c = ctx.declare_param("c", ResolvedType::enumeration("color"));
        let (expr, plan) = compile(
            &mut ctx,
            Some(name("c")),
            vec![
                case(vec![name("red"), name("green")], text("warm")),
                case(vec![name("blue")], text("cold")),
            ],
        );
        assert_eq!(ctx.sink().keys(), Vec::<&str>::new());
        let plan = plan.unwrap();
        assert!(plan.exhaustive);
        assert_eq!(plan.constants.len(), 3);
        assert_eq!(
            run(&expr, |f| f.set(c, Value::enum_value("color", 2, "blue"))),
            Ok(Value::text("cold"))
        );
    }

    #[test]
    fn test_nullable_key_needs_null_case() {
        let mut ctx = context();
        ctx.declare_param("b", ResolvedType::nullable(ResolvedType::Boolean));
        compile(
            &mut ctx,
            Some(name("b")),
            vec![case(vec![boolean(true)], int(1)), case(vec![boolean(false)], int(2))],
        );
        assert_eq!(ctx.sink().keys(), vec!["when_no_else"]);

        let mut ctx = context();
        ctx.declare_param("b", ResolvedType::nullable(ResolvedType::Boolean));
        let (_, plan) = compile(
            &mut ctx,
            Some(name("b")),
            vec![
                case(vec![boolean(true)], int(1)),
                case(vec![boolean(false)], int(2)),
                case(vec![null()], int(3)),
            ],
        );
        assert!(plan.unwrap().exhaustive);
    }

    #[test]
    fn test_null_case_narrows_key() {
        let mut ctx = context();
        let x = ctx.declare_param("x", ResolvedType::nullable(ResolvedType::Integer));
        let (expr, _) = compile(
            &mut ctx,
            Some(name("x")),
            vec![case(vec![null()], int(0)), else_case(add(name("x"), int(1)))],
        );
        assert_eq!(ctx.sink().keys(), Vec::<&str>::new());
        assert_eq!(expr.ty, ResolvedType::Integer);
        assert_eq!(run(&expr, |f| f.set(x, Value::Integer(4))), Ok(Value::Integer(5)));
        assert_eq!(run(&expr, |f| f.set(x, Value::Null)), Ok(Value::Integer(0)));
    }

    #[test]
    fn test_keyless_falsity_carries_forward() {
        let mut ctx = context();
        let x = ctx.declare_param("x", ResolvedType::nullable(ResolvedType::Integer));
        let (expr, _) = compile(
            &mut ctx,
            None,
            vec![
                case(vec![eq(name("x"), null())], int(0)),
                case(vec![gt(name("x"), int(10))], int(1)),
                else_case(name("x")),
            ],
        );
        assert_eq!(ctx.sink().keys(), Vec::<&str>::new());
        assert_eq!(expr.ty, ResolvedType::Integer);
        assert_eq!(run(&expr, |f| f.set(x, Value::Integer(3))), Ok(Value::Integer(3)));
        assert_eq!(run(&expr, |f| f.set(x, Value::Integer(30))), Ok(Value::Integer(1)));
    }

    #[test]
    fn test_bodies_are_promoted() {
        let mut ctx = context();
        let n = ctx.declare_param("n", ResolvedType::Integer);
        let (expr, _) = compile(
            &mut ctx,
            Some(name("n")),
            vec![case(vec![int(1), int(2)], int(7)), else_case(dec(25, 1))],
        );
        assert_eq!(expr.ty, ResolvedType::Decimal);
        assert_eq!(
            run(&expr, |f| f.set(n, Value::Integer(2))),
            Ok(Value::Decimal(rust_decimal::Decimal::from(7)))
        );
    }

    #[test]
    fn test_non_constant_conditions_run_in_order() {
        let mut ctx = context();
        let n = ctx.declare_param("n", ResolvedType::Integer);
        let m = ctx.declare_param("m", ResolvedType::Integer);
        let (expr, plan) = compile(
            &mut ctx,
            Some(name("n")),
            vec![case(vec![name("m")], text("m")), case(vec![int(5)], text("five")), else_case(text("other"))],
        );
        assert!(!plan.unwrap().table_only);
        let setup = |f: &mut Frame<'_>| {
            f.set(n, Value::Integer(5));
            f.set(m, Value::Integer(5));
        };
        assert_eq!(run(&expr, setup), Ok(Value::text("m")));
    }

    #[test]
    fn test_constant_when_folds() {
        let mut ctx = context();
        let (expr, _) = compile(
            &mut ctx,
            None,
            vec![case(vec![boolean(false)], int(1)), else_case(int(2))],
        );
        assert_eq!(expr.constant, Some(Value::Integer(2)));
    }

    #[test]
    fn test_database_when_renders_case() {
        let mut ctx = context();
        let inner = at(AtCardinality::ZeroMany, vec![from(name("user"))]).with_fields(vec![field(
            when(
                Some(attr("age")),
                vec![case(vec![int(1), int(2)], text("young")), else_case(text("old"))],
            ),
        )]);
        let (_, plan) = crate::at::compile_at(&mut ctx, &inner, Span::default());
        assert_eq!(ctx.sink().keys(), Vec::<&str>::new());
        assert_eq!(
            plan.unwrap().sql(),
            Some(concat!(
                r#"SELECT CASE WHEN ((A00."age" = ?) OR (A00."age" = ?))"#,
                r#" THEN ? ELSE ? END FROM "user" A00 ORDER BY A00."rowid""#
            ))
        );
    }

    #[test]
    fn test_case_sql_null_condition() {
        let key = DbExpr::Constant(Value::Integer(1));
        let expr = case_sql(
            Some(SqlOp::NotDistinct),
            &[1, 0],
            Some(1),
            &[key, DbExpr::Constant(Value::Null), DbExpr::Constant(Value::Integer(0)), DbExpr::Constant(Value::Integer(1))],
        );
        let sql = SqlBuilder::new(vec![]).render(&expr);
        assert_eq!(sql.sql, "CASE WHEN (? IS NULL) THEN ? ELSE ? END");
    }
}
