//! Scope management
//!
//! Scopes form a stack; the innermost scope is searched first. Scopes
//! come in two flavours:
//! - blocks and loop bodies, introducing local variables
//! - at-expression frames, introducing entity aliases or the element
//!   variable of an iterable, plus the implicit attributes reachable
//!   without a qualifier
//!
//! The scope table knows nothing about flow facts; those live in the
//! compilation context.

use crate::ids::{AtEntityId, AtExprId, VarUid};
use indexmap::IndexMap;
use rell_sema_types::{AttributeDef, EntityDef, ResolvedType};
use std::fmt;
use std::sync::Arc;

/// A local variable, including loop and iteration variables
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVar {
    pub uid: VarUid,
    pub name: String,
    pub ty: ResolvedType,
    pub mutable: bool,
    /// The collection at-expression whose element this variable holds
    pub at: Option<AtExprId>,
}

/// An entity source of a database at-expression
#[derive(Debug, Clone)]
pub struct AtEntity {
    pub id: AtEntityId,
    pub at: AtExprId,
    pub alias: String,
    pub explicit_alias: bool,
    pub def: Arc<EntityDef>,
}

/// A named entry of a scope
#[derive(Debug, Clone)]
pub enum Symbol {
    Var(LocalVar),
    AtEntity(AtEntity),
}

/// Source of an at-expression frame
#[derive(Debug, Clone)]
pub enum FrameSource {
    Db(Vec<AtEntity>),
    Collection { item: LocalVar, explicit_alias: bool },
}

/// Compile-time frame of an at-expression
#[derive(Debug, Clone)]
pub struct AtFrame {
    pub id: AtExprId,
    pub source: FrameSource,
}

/// An implicit attribute reachable from an at-expression frame
#[derive(Debug, Clone)]
pub enum FrameAttr {
    /// Column of a from-entity
    Db { entity: AtEntity, attr: AttributeDef },
    /// Named field of a tuple element
    Field { item: LocalVar, index: usize, name: String, ty: ResolvedType },
}

impl FrameAttr {
    pub fn name(&self) -> &str {
        match self {
            Self::Db { attr, .. } => &attr.name,
            Self::Field { name, .. } => name,
        }
    }

    pub fn ty(&self) -> &ResolvedType {
        match self {
            Self::Db { attr, .. } => &attr.ty,
            Self::Field { ty, .. } => ty,
        }
    }

    /// Name qualified with the alias, e.g. `u.name`
    pub fn qualified_name(&self) -> String {
        match self {
            Self::Db { entity, attr } => format!("{}.{}", entity.alias, attr.name),
            Self::Field { item, name, .. } => format!("{}.{}", item.name, name),
        }
    }

    /// Owner description used in diagnostics
    pub fn owner(&self) -> String {
        match self {
            Self::Db { entity, .. } => format!("{}:{}", entity.alias, entity.def.name),
            Self::Field { item, .. } => item.ty.to_string(),
        }
    }
}

/// A placeholder (`$`) candidate of a frame
#[derive(Debug, Clone)]
pub enum PlaceholderTarget {
    Entity(AtEntity),
    Item(LocalVar),
}

impl AtFrame {
    pub fn is_db(&self) -> bool {
        matches!(self.source, FrameSource::Db(_))
    }

    pub fn attributes(&self) -> Vec<FrameAttr> {
        match &self.source {
            FrameSource::Db(entities) => entities
                .iter()
                .flat_map(|entity| {
                    entity.def.attributes.values().map(|attr| FrameAttr::Db {
                        entity: entity.clone(),
                        attr: attr.clone(),
                    })
                })
                .collect(),
            FrameSource::Collection { item, .. } => item_attributes(item),
        }
    }

    pub fn attributes_by_name(&self, name: &str) -> Vec<FrameAttr> {
        self.attributes().into_iter().filter(|a| a.name() == name).collect()
    }

    pub fn attributes_by_type(&self, ty: &ResolvedType) -> Vec<FrameAttr> {
        self.attributes()
            .into_iter()
            .filter(|a| a.ty().unwrap_nullable() == ty.unwrap_nullable())
            .collect()
    }

    /// Sources without an explicit alias
    pub fn placeholders(&self) -> Vec<PlaceholderTarget> {
        match &self.source {
            FrameSource::Db(entities) => entities
                .iter()
                .filter(|e| !e.explicit_alias)
                .map(|e| PlaceholderTarget::Entity(e.clone()))
                .collect(),
            FrameSource::Collection { item, explicit_alias } if !explicit_alias => {
                vec![PlaceholderTarget::Item(item.clone())]
            }
            FrameSource::Collection { .. } => Vec::new(),
        }
    }
}

// Tuple elements expose their named fields
fn item_attributes(item: &LocalVar) -> Vec<FrameAttr> {
    match &item.ty {
        ResolvedType::Tuple(fields) => fields
            .iter()
            .enumerate()
            .filter_map(|(index, field)| {
                field.name.as_ref().map(|name| FrameAttr::Field {
                    item: item.clone(),
                    index,
                    name: name.clone(),
                    ty: field.ty.clone(),
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Kind of scope
#[derive(Debug, Clone)]
pub enum ScopeKind {
    /// Outermost scope of a compilation unit
    Root,
    Block,
    Loop,
    At(AtFrame),
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Block => write!(f, "block"),
            Self::Loop => write!(f, "loop"),
            Self::At(frame) => write!(f, "at {}", frame.id),
        }
    }
}

/// A scope with its symbols
#[derive(Debug, Clone)]
pub struct Scope {
    kind: ScopeKind,
    symbols: IndexMap<String, Symbol>,
}

impl Scope {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            symbols: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> &ScopeKind {
        &self.kind
    }

    pub fn define(&mut self, name: impl Into<String>, symbol: Symbol) {
        self.symbols.insert(name.into(), symbol);
    }

    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn local_symbols(&self) -> impl Iterator<Item = (&String, &Symbol)> {
        self.symbols.iter()
    }
}

/// Scope stack used during compilation
#[derive(Debug, Clone)]
pub struct ScopeManager {
    scopes: Vec<Scope>,
}

impl ScopeManager {
    /// Create a scope manager with a root scope
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Root)],
        }
    }

    pub fn current(&self) -> &Scope {
        // The root scope is never left
        &self.scopes[self.scopes.len() - 1]
    }

    pub fn enter(&mut self, kind: ScopeKind) {
        log::trace!("enter {kind} scope at depth {}", self.scopes.len());
        self.scopes.push(Scope::new(kind));
    }

    /// Leave the current scope; the root scope is kept
    pub fn leave(&mut self) -> Option<Scope> {
        if self.scopes.len() > 1 { self.scopes.pop() } else { None }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Define a symbol in the current scope
    pub fn define(&mut self, name: impl Into<String>, symbol: Symbol) {
        let last = self.scopes.len() - 1;
        self.scopes[last].define(name, symbol);
    }

    /// Look up a symbol, innermost scope first
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|s| s.lookup_local(name))
    }

    /// Look up a local variable, ignoring entity aliases
    pub fn lookup_var(&self, name: &str) -> Option<&LocalVar> {
        self.scopes.iter().rev().find_map(|s| match s.lookup_local(name) {
            Some(Symbol::Var(var)) => Some(var),
            _ => None,
        })
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Check whether `name` is declared outside the innermost loop enclosing the current scope
    pub fn declared_outside_loop(&self, name: &str) -> bool {
        let mut in_loop = false;
        for scope in self.scopes.iter().rev() {
            if scope.lookup_local(name).is_some() {
                return in_loop;
            }
            if matches!(scope.kind, ScopeKind::Loop) {
                in_loop = true;
            }
        }
        false
    }

    /// At-expression frames, innermost first
    pub fn at_frames(&self) -> impl Iterator<Item = &AtFrame> {
        self.scopes.iter().rev().filter_map(|s| match &s.kind {
            ScopeKind::At(frame) => Some(frame),
            _ => None,
        })
    }

    pub fn innermost_at(&self) -> Option<&AtFrame> {
        self.at_frames().next()
    }

    pub fn in_at(&self) -> bool {
        self.innermost_at().is_some()
    }
}

impl Default for ScopeManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rell_sema_types::TupleField;

    fn var(uid: u32, name: &str, ty: ResolvedType) -> LocalVar {
        LocalVar {
            uid: VarUid(uid),
            name: name.to_string(),
            ty,
            mutable: false,
            at: None,
        }
    }

    #[test]
    fn test_inner_scope_shadows_and_leaves() {
        let mut scopes = ScopeManager::new();
        scopes.define("x", Symbol::Var(var(0, "x", ResolvedType::Integer)));
        scopes.enter(ScopeKind::Block);
        scopes.define("x", Symbol::Var(var(1, "x", ResolvedType::Text)));
        assert_eq!(scopes.lookup_var("x").map(|v| v.uid), Some(VarUid(1)));
        assert!(scopes.leave().is_some());
        assert_eq!(scopes.lookup_var("x").map(|v| v.uid), Some(VarUid(0)));
        assert!(scopes.leave().is_none());
        assert_eq!(scopes.depth(), 0);
    }

    #[test]
    fn test_frames_innermost_first() {
        let mut scopes = ScopeManager::new();
        let tuple = ResolvedType::tuple(vec![
            TupleField::named("a", ResolvedType::Integer),
            TupleField::unnamed(ResolvedType::Text),
        ]);
        let mut item = var(0, "$", tuple);
        item.at = Some(AtExprId(0));
        scopes.enter(ScopeKind::At(AtFrame {
            id: AtExprId(0),
            source: FrameSource::Collection {
                item,
                explicit_alias: false,
            },
        }));
        scopes.enter(ScopeKind::Block);
        let mut inner = var(1, "$", ResolvedType::Integer);
        inner.at = Some(AtExprId(1));
        scopes.enter(ScopeKind::At(AtFrame {
            id: AtExprId(1),
            source: FrameSource::Collection {
                item: inner,
                explicit_alias: true,
            },
        }));

        let ids: Vec<AtExprId> = scopes.at_frames().map(|f| f.id).collect();
        assert_eq!(ids, vec![AtExprId(1), AtExprId(0)]);
        assert!(scopes.innermost_at().is_some_and(|f| f.placeholders().is_empty()));

        let outer = scopes.at_frames().nth(1).unwrap();
        let attrs = outer.attributes();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].name(), "a");
        assert_eq!(outer.attributes_by_type(&ResolvedType::Integer).len(), 1);
    }
}
