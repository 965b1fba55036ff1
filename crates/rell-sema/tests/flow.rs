//! Statements, nullability facts and options, end to end

mod common;

use common::compiler;
use pretty_assertions::assert_eq;
use rell_sema::ast::dsl::*;
use rell_sema::ast::{AssignOp, AtCardinality, SortDirection};
use rell_sema::{CompilerOptions, NoDatabase, ResolvedType, Value};

fn opt_int() -> ResolvedType {
    ResolvedType::nullable(ResolvedType::Integer)
}

#[test]
fn test_null_check_narrows_following_statements() {
    let body = vec![
        var("y", None, Some(name("x"))),
        if_stmt(eq(name("y"), null()), assign("y", int(0)), None),
    ];
    let compiled = compiler()
        .with_param("x", opt_int())
        .compile_body(&body, &mul(name("y"), int(2)))
        .unwrap();
    assert_eq!(compiled.value.ty, ResolvedType::Integer);
    assert_eq!(compiled.evaluate(&NoDatabase, &[("x", Value::Null)]), Ok(Value::Integer(0)));
    assert_eq!(compiled.evaluate(&NoDatabase, &[("x", Value::Integer(3))]), Ok(Value::Integer(6)));
}

#[test]
fn test_unnarrowed_nullable_is_rejected() {
    let err = compiler()
        .with_param("x", opt_int())
        .compile_expr(&add(name("x"), int(1)))
        .unwrap_err();
    assert_eq!(err.keys(), vec!["binop_operand_type:+:[integer?]:[integer]"]);
}

#[test]
fn test_elvis_and_conditional_narrowing() {
    let compiler = compiler().with_param("x", opt_int());
    let compiled = compiler.compile_expr(&elvis(name("x"), int(-1))).unwrap();
    assert_eq!(compiled.value.ty, ResolvedType::Integer);
    assert_eq!(compiled.evaluate(&NoDatabase, &[("x", Value::Null)]), Ok(Value::Integer(-1)));

    let compiled = compiler
        .compile_expr(&if_expr(ne(name("x"), null()), add(name("x"), int(1)), int(0)))
        .unwrap();
    assert_eq!(compiled.value.ty, ResolvedType::Integer);
    assert_eq!(compiled.evaluate(&NoDatabase, &[("x", Value::Integer(1))]), Ok(Value::Integer(2)));
}

#[test]
fn test_loop_over_query_result() {
    let body = vec![
        var("total", None, Some(int(0))),
        for_stmt(
            "v",
            at(AtCardinality::ZeroMany, vec![from(list(vec![int(1), int(2), int(3), int(4)]))])
                .with_where(gt(placeholder(), int(1)))
                .into_expr(),
            assign_op("total", AssignOp::AddAssign, name("v")),
        ),
    ];
    let compiled = compiler().compile_body(&body, &name("total")).unwrap();
    assert_eq!(compiled.evaluate(&NoDatabase, &[]), Ok(Value::Integer(9)));
}

#[test]
fn test_constant_expression_is_folded() {
    let compiled = compiler().compile_expr(&add(int(2), mul(int(3), int(4)))).unwrap();
    assert_eq!(compiled.value.constant, Some(Value::Integer(14)));
}

#[test]
fn test_deprecated_syntax_follows_options() {
    let query = at(AtCardinality::ZeroMany, vec![from(list(vec![int(2), int(1)]))])
        .with_fields(vec![field(placeholder()).legacy_sort(SortDirection::Desc)]);

    let compiled = compiler().compile_query(&query).unwrap();
    let warnings: Vec<&str> = compiled.warnings.iter().map(|w| w.key.as_str()).collect();
    assert_eq!(warnings, vec!["at:what:sort:deprecated:sort_desc"]);

    let strict = compiler().with_options(CompilerOptions::builder().deprecated_error(true).build());
    let err = strict.compile_query(&query).unwrap_err();
    assert_eq!(err.keys(), vec!["at:what:sort:deprecated:sort_desc"]);

    let strict = compiler().with_options_json(r#"{"deprecated_error": true}"#).unwrap();
    assert!(strict.compile_query(&query).is_err());
}
