//! Identifiers allocated during compilation
//!
//! Every compilation unit owns one [`IdCounter`]; ids are unique within the
//! unit and never shared through global state.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identity of an at-expression
    AtExprId,
    "at"
);
define_id!(
    /// Identity of an entity alias inside an at-expression
    AtEntityId,
    "ent"
);
define_id!(
    /// Identity of a local variable; flow facts are keyed by it
    VarUid,
    "var"
);

/// Sequential id allocator of a compilation unit
#[derive(Debug, Clone, Default)]
pub struct IdCounter {
    next_at_expr: u32,
    next_at_entity: u32,
    next_var: u32,
}

impl IdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_at_expr(&mut self) -> AtExprId {
        let id = AtExprId(self.next_at_expr);
        self.next_at_expr += 1;
        id
    }

    pub fn next_at_entity(&mut self) -> AtEntityId {
        let id = AtEntityId(self.next_at_entity);
        self.next_at_entity += 1;
        id
    }

    pub fn next_var(&mut self) -> VarUid {
        let id = VarUid(self.next_var);
        self.next_var += 1;
        id
    }
}
