//! Member access: `base.name` and `base?.name`
//!
//! Members are tuple fields, entity and object attributes, enum constants
//! (`color.red`) and the enum properties `.name` and `.value`. Entity
//! attributes of a row inside a database at-expression become columns,
//! joining through entity-typed attributes; elsewhere they are read with a
//! single-row query.

use super::{combine, compile_expr, denarrowed, names, sql_not_allowed};
use crate::at::decode_value;
use crate::context::CompilationContext;
use crate::error::{EvalError, EvalResult};
use crate::expr::{CompiledExpr, Evaluator};
use crate::facts::ExprFacts;
use crate::ids::AtEntityId;
use crate::runtime::{Frame, ParameterizedSql};
use crate::sql::{DbExpr, DbTable, SqlBuilder};
use rell_sema_ast::{Expr, Expression, Name};
use rell_sema_diagnostics::{RELL0003, RELL0004, Span};
use rell_sema_types::{Definitions, ResolvedType, Value};

/// What a member name refers to, for a given base type
#[derive(Debug, Clone)]
enum Member {
    TupleField { index: usize, ty: ResolvedType },
    EntityRowid,
    EntityAttr { table: String, column: String, ty: ResolvedType },
    ObjectAttr { table: String, column: String, ty: ResolvedType },
    EnumName,
    EnumValue,
}

impl Member {
    fn ty(&self) -> ResolvedType {
        match self {
            Self::TupleField { ty, .. } | Self::EntityAttr { ty, .. } | Self::ObjectAttr { ty, .. } => ty.clone(),
            Self::EntityRowid => ResolvedType::Rowid,
            Self::EnumName => ResolvedType::Text,
            Self::EnumValue => ResolvedType::Integer,
        }
    }
}

pub(crate) fn compile_member(
    ctx: &mut CompilationContext,
    base: &Expr,
    name: &Name,
    safe: bool,
    span: Span,
) -> CompiledExpr {
    if !safe {
        if let Some(enum_name) = enum_type_name(ctx, base) {
            return compile_enum_constant(ctx, &enum_name, name, span);
        }
    }

    let mut base = compile_expr(ctx, base);
    if safe {
        base = denarrowed(ctx, base);
    }
    if base.is_error() {
        return CompiledExpr::error(span);
    }

    if safe && !base.ty.is_nullable() {
        ctx.error(
            span,
            RELL0004,
            format!("expr_safemem_type:[{}]", base.ty),
            format!("Wrong type for operator '?.': {}", base.ty),
        );
        return CompiledExpr::error(span);
    }
    if !safe && base.ty.is_nullable() {
        ctx.error(
            span,
            RELL0004,
            format!("expr_mem_null:{}", name.inner),
            format!("Cannot access member '{}' of a nullable value", name.inner),
        );
        return CompiledExpr::error(span);
    }

    let value_ty = base.ty.unwrap_nullable().clone();
    let Some(member) = resolve_member(ctx.definitions(), &value_ty, &name.inner) else {
        ctx.error(
            name.span,
            RELL0003,
            format!("unknown_member:[{value_ty}]:{}", name.inner),
            format!("Unknown member of type {value_ty}: '{}'", name.inner),
        );
        return CompiledExpr::error(span);
    };
    log::trace!("member {} of {value_ty}: {member:?}", name.inner);

    let ty = if safe { ResolvedType::nullable(member.ty()) } else { member.ty() };
    let facts = ExprFacts::of_post(base.facts.post.clone());
    let expr = if base.is_db() {
        if safe {
            return sql_not_allowed(ctx, span);
        }
        db_member(ctx, &base, &member, ty, span)
    } else {
        interpreted_member(ctx, base, member, ty, safe, span)
    };
    expr.with_name(name.inner.as_str()).with_facts(facts)
}

/// The enum named by a bare base name, unless a value of that name is in scope
fn enum_type_name(ctx: &CompilationContext, base: &Expr) -> Option<String> {
    let Expression::Name(name) = &base.inner else {
        return None;
    };
    let shadowed = ctx.scopes().lookup(name).is_some()
        || ctx.global(name).is_some()
        || (ctx.scopes().in_at() && !names::lookup_attributes(ctx, name).is_empty());
    if shadowed {
        return None;
    }
    ctx.definitions().enumeration(name).map(|def| def.name.clone())
}

fn compile_enum_constant(ctx: &mut CompilationContext, enum_name: &str, member: &Name, span: Span) -> CompiledExpr {
    let Some(def) = ctx.definitions().enumeration(enum_name).cloned() else {
        return CompiledExpr::error(span);
    };
    match def.ordinal(&member.inner) {
        Some(ordinal) => {
            let value = Value::enum_value(&def.name, ordinal, &member.inner);
            CompiledExpr::constant(value, def.ty(), span).with_name(member.inner.as_str())
        }
        None => {
            ctx.error(
                member.span,
                RELL0003,
                format!("unknown_member:[{}]:{}", def.name, member.inner),
                format!("Unknown member of type {}: '{}'", def.name, member.inner),
            );
            CompiledExpr::error(span)
        }
    }
}

fn resolve_member(defs: &Definitions, ty: &ResolvedType, name: &str) -> Option<Member> {
    match ty {
        ResolvedType::Tuple(fields) => fields
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
            .map(|index| Member::TupleField {
                index,
                ty: fields[index].ty.clone(),
            }),
        ResolvedType::Entity(entity) => {
            let def = defs.entity(entity)?;
            if name == "rowid" {
                return Some(Member::EntityRowid);
            }
            def.attribute(name).map(|attr| Member::EntityAttr {
                table: def.table.clone(),
                column: attr.column().to_string(),
                ty: attr.ty.clone(),
            })
        }
        ResolvedType::Object(object) => {
            let def = defs.object(object)?;
            def.attribute(name).map(|attr| Member::ObjectAttr {
                table: def.table.clone(),
                column: attr.column().to_string(),
                ty: attr.ty.clone(),
            })
        }
        ResolvedType::Enum(_) => match name {
            "name" => Some(Member::EnumName),
            "value" => Some(Member::EnumValue),
            _ => None,
        },
        _ => None,
    }
}

/// Member of a row inside a database at-expression
fn db_member(
    ctx: &mut CompilationContext,
    base: &CompiledExpr,
    member: &Member,
    ty: ResolvedType,
    span: Span,
) -> CompiledExpr {
    let (Some(base_db), Some(&at)) = (&base.db, base.at_deps.first()) else {
        return sql_not_allowed(ctx, span);
    };
    let db = match member {
        Member::EntityRowid | Member::EntityAttr { .. } => {
            let target = match &base.ty {
                ResolvedType::Entity(entity) => ctx.definitions().entity(entity).map(|def| def.table.clone()),
                _ => None,
            };
            match target.and_then(|table| base_db.entity_table(&table)) {
                Some(table) => match member {
                    Member::EntityAttr { column, .. } => DbExpr::Column {
                        table,
                        column: column.clone(),
                    },
                    _ => DbExpr::Rowid(table),
                },
                None => return sql_not_allowed(ctx, span),
            }
        }
        // Enums are stored as their ordinal
        Member::EnumValue => base_db.clone(),
        Member::EnumName | Member::TupleField { .. } | Member::ObjectAttr { .. } => {
            return sql_not_allowed(ctx, span);
        }
    };
    CompiledExpr::database(ty, span, db, at).with_deps(&base.at_deps)
}

fn interpreted_member(
    ctx: &mut CompilationContext,
    base: CompiledExpr,
    member: Member,
    ty: ResolvedType,
    safe: bool,
    span: Span,
) -> CompiledExpr {
    let reads_db = matches!(member, Member::EntityAttr { .. } | Member::ObjectAttr { .. });
    // Attribute reads see the current database state and are never folded
    let base = if reads_db { base.impure() } else { base };
    let defs = ctx.definitions_arc();
    let build = move |evals: Vec<Evaluator>| {
        let inner = evals[0].clone();
        Evaluator::new(move |frame| {
            let value = inner.call(frame)?;
            if safe && value.is_null() {
                return Ok(Value::Null);
            }
            read_member(frame, &defs, &member, value)
        })
    };
    combine(ctx, ty, span, &[&base], build, None)
}

fn read_member(frame: &mut Frame<'_>, defs: &Definitions, member: &Member, value: Value) -> EvalResult<Value> {
    match (member, &value) {
        (Member::TupleField { index, .. }, Value::Tuple(fields)) => fields
            .get(*index)
            .cloned()
            .ok_or_else(|| EvalError::internal(format!("no tuple field {index} in {value}"))),
        (Member::EntityRowid, Value::Entity { rowid, .. }) => Ok(Value::Rowid(*rowid)),
        (Member::EntityAttr { table, column, ty }, Value::Entity { rowid, .. }) => {
            let sql = ParameterizedSql {
                sql: attribute_query(table, column, true),
                params: vec![Value::Rowid(*rowid)],
            };
            read_single(frame, defs, &sql, ty)
        }
        (Member::ObjectAttr { table, column, ty }, Value::Object(_)) => {
            let sql = ParameterizedSql {
                sql: attribute_query(table, column, false),
                params: Vec::new(),
            };
            read_single(frame, defs, &sql, ty)
        }
        (Member::EnumName, Value::Enum { name, .. }) => Ok(Value::Text(name.to_string())),
        (Member::EnumValue, Value::Enum { ordinal, .. }) => i64::try_from(*ordinal)
            .map(Value::Integer)
            .map_err(|_| EvalError::overflow("enum ordinal")),
        _ => Err(EvalError::internal(format!("no member {member:?} in {value}"))),
    }
}

fn read_single(frame: &mut Frame<'_>, defs: &Definitions, sql: &ParameterizedSql, ty: &ResolvedType) -> EvalResult<Value> {
    let rows = frame.query(sql, std::slice::from_ref(ty))?;
    match rows.as_slice() {
        [row] => {
            let value = row.first().cloned().unwrap_or(Value::Null);
            decode_value(defs, ty, value)
        }
        _ => Err(EvalError::Cardinality { count: rows.len() }),
    }
}

/// `SELECT A00."column" FROM "table" A00`, optionally filtered by row id
fn attribute_query(table: &str, column: &str, by_rowid: bool) -> String {
    let root = AtEntityId(0);
    let mut builder = SqlBuilder::new(vec![(root, table.to_string())]);
    let select = builder.render(&DbExpr::Column {
        table: DbTable::root(root),
        column: column.to_string(),
    });
    let mut sql = format!("SELECT {}{}", select.sql, builder.from_clause());
    if by_rowid {
        let rowid = builder.render(&DbExpr::Rowid(DbTable::root(root)));
        sql.push_str(&format!(" WHERE {} = ?", rowid.sql));
    }
    log::debug!("attribute query: {sql}");
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{VarFact, VarFacts};
    use crate::test_support::{RecordingExecutor, context};
    use pretty_assertions::assert_eq;
    use rell_sema_ast::dsl::*;
    use rell_sema_types::TupleField;

    #[test]
    fn test_enum_constant_and_properties() {
        let mut ctx = context();
        let expr = compile_expr(&mut ctx, &member(name("color"), "green"));
        assert_eq!(expr.ty, ResolvedType::enumeration("color"));
        assert_eq!(expr.constant, Some(Value::enum_value("color", 1, "green")));

        let value = compile_expr(&mut ctx, &member(member(name("color"), "blue"), "value"));
        assert_eq!(value.constant, Some(Value::Integer(2)));
        let text = compile_expr(&mut ctx, &member(member(name("color"), "blue"), "name"));
        assert_eq!(text.constant, Some(Value::text("blue")));

        compile_expr(&mut ctx, &member(name("color"), "purple"));
        assert_eq!(ctx.sink().keys(), vec!["unknown_member:[color]:purple"]);
    }

    #[test]
    fn test_tuple_field_access() {
        let mut ctx = context();
        let expr = compile_expr(
            &mut ctx,
            &member(tuple(vec![(Some("a"), int(1)), (Some("b"), text("x"))]), "b"),
        );
        assert_eq!(expr.ty, ResolvedType::Text);
        assert_eq!(expr.constant, Some(Value::text("x")));
        assert_eq!(expr.implicit_name.as_deref(), Some("b"));
    }

    #[test]
    fn test_nullable_base_requires_safe_access() {
        let mut ctx = context();
        let ty = ResolvedType::nullable(ResolvedType::tuple(vec![TupleField::named("a", ResolvedType::Integer)]));
        let t = ctx.declare_param("t", ty);
        compile_expr(&mut ctx, &member(name("t"), "a"));
        assert_eq!(ctx.sink().keys(), vec!["expr_mem_null:a"]);

        let safe = compile_expr(&mut ctx, &safe_member(name("t"), "a"));
        assert_eq!(safe.ty, ResolvedType::nullable(ResolvedType::Integer));
        let db = RecordingExecutor::new();
        let mut frame = Frame::new(&db);
        frame.set(t, Value::Null);
        assert_eq!(safe.evaluate(&mut frame), Ok(Value::Null));

        ctx.apply_facts(&VarFacts::of_nulled(t, VarFact::No));
        let narrowed = compile_expr(&mut ctx, &member(name("t"), "a"));
        assert_eq!(narrowed.ty, ResolvedType::Integer);
    }

    #[test]
    fn test_safe_access_on_non_nullable() {
        let mut ctx = context();
        compile_expr(&mut ctx, &safe_member(tuple(vec![(Some("a"), int(1))]), "a"));
        assert_eq!(ctx.sink().keys(), vec!["expr_safemem_type:[(a:integer)]"]);
    }

    #[test]
    fn test_entity_attribute_outside_query() {
        let mut ctx = context();
        let u = ctx.declare_param("u", ResolvedType::entity("user"));
        let expr = compile_expr(&mut ctx, &member(member(name("u"), "company"), "name"));
        assert_eq!(expr.ty, ResolvedType::Text);

        let db = RecordingExecutor::new()
            .with_result(vec![vec![Value::Integer(7)]])
            .with_result(vec![vec![Value::text("Acme")]]);
        let mut frame = Frame::new(&db);
        frame.set(u, Value::entity("user", 3));
        assert_eq!(expr.evaluate(&mut frame), Ok(Value::text("Acme")));
        assert_eq!(
            db.executed(),
            vec![
                "SELECT A00.\"company\" FROM \"user\" A00 WHERE A00.\"rowid\" = ? [3]",
                "SELECT A00.\"name\" FROM \"company\" A00 WHERE A00.\"rowid\" = ? [7]",
            ]
        );
    }

    #[test]
    fn test_object_attribute_is_not_folded() {
        let mut ctx = context();
        let expr = compile_expr(&mut ctx, &member(name("state"), "counter"));
        assert_eq!(expr.ty, ResolvedType::Integer);
        assert!(expr.constant.is_none());

        let db = RecordingExecutor::new().with_result(vec![vec![Value::Integer(42)]]);
        let mut frame = Frame::new(&db);
        assert_eq!(expr.evaluate(&mut frame), Ok(Value::Integer(42)));
        assert_eq!(db.executed(), vec!["SELECT A00.\"counter\" FROM \"state\" A00"]);
    }

    #[test]
    fn test_unknown_member() {
        let mut ctx = context();
        ctx.declare_param("u", ResolvedType::entity("user"));
        compile_expr(&mut ctx, &member(name("u"), "email"));
        compile_expr(&mut ctx, &member(int(1), "x"));
        assert_eq!(ctx.sink().keys(), vec!["unknown_member:[user]:email", "unknown_member:[integer]:x"]);
    }
}
