//! At-expression (query) and when-expression (match) nodes

use crate::{BoxExpr, Expr, Name, Span, Spanned};
use smallvec::SmallVec;
use std::fmt;

/// An at-expression: `from @cardinality { where } ( what ) limit N offset M`
#[derive(Debug, Clone, PartialEq)]
pub struct AtExpr {
    /// One or more entity sources, or exactly one iterable source
    pub from: Vec<FromItem>,
    pub cardinality: Spanned<AtCardinality>,
    /// Conjoined where-expressions, in source order
    pub where_: Vec<Expr>,
    pub what: What,
    pub limit: Option<BoxExpr>,
    pub offset: Option<BoxExpr>,
}

/// A source of an at-expression, `alias: expr` or just `expr`
#[derive(Debug, Clone, PartialEq)]
pub struct FromItem {
    pub alias: Option<Name>,
    pub expr: Expr,
}

/// Cardinality operator of an at-expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtCardinality {
    /// `@` exactly one
    One,
    /// `@?` zero or one
    ZeroOne,
    /// `@+` one or more
    OneMany,
    /// `@*` any number
    ZeroMany,
}

impl AtCardinality {
    pub const fn zero(&self) -> bool {
        matches!(self, Self::ZeroOne | Self::ZeroMany)
    }

    pub const fn many(&self) -> bool {
        matches!(self, Self::OneMany | Self::ZeroMany)
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::One => "@",
            Self::ZeroOne => "@?",
            Self::OneMany => "@+",
            Self::ZeroMany => "@*",
        }
    }
}

impl fmt::Display for AtCardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// What-part of an at-expression
#[derive(Debug, Clone, PartialEq, Default)]
pub enum What {
    /// No what-part: the entity, the alias tuple, or the collection element
    #[default]
    Default,
    Fields(Vec<WhatField>),
}

/// A single what-expression with its name and annotations
#[derive(Debug, Clone, PartialEq)]
pub struct WhatField {
    pub name: WhatFieldName,
    pub expr: Expr,
    pub annotations: SmallVec<[Spanned<WhatAnnotation>; 2]>,
    /// Legacy `+expr` / `-expr` sort prefix
    pub deprecated_sort: Option<Spanned<SortDirection>>,
}

/// How a what-field is named
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WhatFieldName {
    /// Inferred from the expression (attribute, variable or member name)
    #[default]
    Implicit,
    /// `name = expr`
    Explicit(Name),
    /// `_ = expr`
    Unnamed,
}

/// Annotations of a what-field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhatAnnotation {
    Omit,
    Sort,
    SortDesc,
    Group,
    Sum,
    Min,
    Max,
}

impl WhatAnnotation {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Omit => "omit",
            Self::Sort => "sort",
            Self::SortDesc => "sort_desc",
            Self::Group => "group",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for WhatAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A when-expression: `when (key) { a, b -> x; else -> y }`
#[derive(Debug, Clone, PartialEq)]
pub struct WhenExpr {
    pub key: Option<BoxExpr>,
    pub cases: Vec<WhenCase>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenCase {
    pub condition: WhenCondition,
    pub body: Expr,
}

/// Left-hand side of a when case
#[derive(Debug, Clone, PartialEq)]
pub enum WhenCondition {
    /// One or more comma-separated expressions
    Exprs(SmallVec<[Expr; 1]>),
    /// `else`, carrying the span of the keyword
    Else(Span),
}
