//! Rell syntax tree
//!
//! The semantic core does not parse: callers hand it trees built from these
//! nodes. Every node that can be the subject of a diagnostic is wrapped in
//! [`Spanned`]. The [`dsl`] module offers terse constructors for building
//! trees by hand.

mod expression;
mod literal;
mod operator;
mod query;
mod statement;
mod types;

pub mod dsl;

pub use expression::*;
pub use literal::*;
pub use operator::*;
pub use query::*;
pub use statement::*;
pub use types::*;

pub use rell_sema_diagnostics::Span;

/// A node with source span information
pub type Spanned<T> = rell_sema_diagnostics::Spanned<T>;

/// A spanned expression
pub type Expr = Spanned<Expression>;

/// Type alias for boxed expressions
pub type BoxExpr = Box<Expr>;

/// A spanned identifier
pub type Name = Spanned<String>;
