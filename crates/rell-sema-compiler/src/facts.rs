//! Nullability and initialization flow facts
//!
//! A [`VarFact`] answers a yes/no question about a variable (is it null, is
//! it initialized) with `No`, `Maybe` or `Yes`. [`VarFacts`] maps variables
//! to facts and is persistent: every combinator returns a new set, so branches
//! can be analyzed under different incoming facts without copying state back.
//!
//! [`ExprFacts`] is what a compiled expression carries:
//! - `post`: facts known after the expression was evaluated
//! - `true_facts` / `false_facts`: facts known when a boolean expression
//!   evaluated to `true` / `false`

use crate::ids::VarUid;
use indexmap::IndexMap;
use rell_sema_types::ResolvedType;
use std::fmt;
use std::sync::Arc;

/// Three-valued knowledge about a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VarFact {
    No,
    Maybe,
    Yes,
}

impl VarFact {
    pub fn of_bool(value: bool) -> Self {
        if value { Self::Yes } else { Self::No }
    }

    pub fn not(self) -> Self {
        match self {
            Self::No => Self::Yes,
            Self::Maybe => Self::Maybe,
            Self::Yes => Self::No,
        }
    }

    /// Meet of two facts about the same variable reached by different paths
    pub fn merge(self, other: Self) -> Self {
        if self == other { self } else { Self::Maybe }
    }
}

impl fmt::Display for VarFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::No => "no",
            Self::Maybe => "maybe",
            Self::Yes => "yes",
        };
        f.write_str(s)
    }
}

type FactMap = Arc<IndexMap<VarUid, VarFact>>;

/// Immutable set of variable facts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarFacts {
    inited: FactMap,
    nulled: FactMap,
}

impl VarFacts {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inited.is_empty() && self.nulled.is_empty()
    }

    pub fn of_nulled(var: VarUid, fact: VarFact) -> Self {
        Self {
            inited: FactMap::default(),
            nulled: Arc::new(IndexMap::from([(var, fact)])),
        }
    }

    pub fn of_inited(var: VarUid, fact: VarFact) -> Self {
        Self {
            inited: Arc::new(IndexMap::from([(var, fact)])),
            nulled: FactMap::default(),
        }
    }

    /// Facts installed by assigning a value of type `value` to a variable of type `var_ty`
    pub fn for_assignment(var: VarUid, var_ty: &ResolvedType, value: &ResolvedType) -> Self {
        let mut facts = Self::of_inited(var, VarFact::Yes);
        if var_ty.is_nullable() {
            let nulled = if value.is_null() {
                VarFact::Yes
            } else if value.is_nullable() || value.is_error() {
                VarFact::Maybe
            } else {
                VarFact::No
            };
            facts = facts.put(&Self::of_nulled(var, nulled));
        }
        facts
    }

    pub fn inited(&self, var: VarUid) -> Option<VarFact> {
        self.inited.get(&var).copied()
    }

    pub fn nulled(&self, var: VarUid) -> Option<VarFact> {
        self.nulled.get(&var).copied()
    }

    /// Combine knowledge that holds simultaneously
    ///
    /// Variables known to only one side keep their fact. For variables known
    /// to both, initialization takes the weaker fact and nullability collapses
    /// to `Maybe` on conflict.
    pub fn and(&self, other: &VarFacts) -> VarFacts {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        Self {
            inited: and_maps(&self.inited, &other.inited, VarFact::min),
            nulled: and_maps(&self.nulled, &other.nulled, VarFact::merge),
        }
    }

    /// Override facts with newer ones
    pub fn put(&self, other: &VarFacts) -> VarFacts {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        Self {
            inited: put_maps(&self.inited, &other.inited),
            nulled: put_maps(&self.nulled, &other.nulled),
        }
    }

    /// Merge the outcomes of alternative branches
    ///
    /// A variable mentioned by any branch gets the meet of every branch's
    /// value, where a branch that says nothing contributes the value from
    /// `prev`. Entries equal to `prev` are left out.
    pub fn for_branches(prev: &VarFacts, cases: &[VarFacts]) -> VarFacts {
        let inited = branch_map(cases, |c| &c.inited, |v| prev.inited(v).unwrap_or(VarFact::No));
        let nulled = branch_map(cases, |c| &c.nulled, |v| prev.nulled(v).unwrap_or(VarFact::Maybe));
        log::trace!("merged {} branch fact set(s)", cases.len());
        Self {
            inited: Arc::new(inited),
            nulled: Arc::new(nulled),
        }
    }

    /// Forget nullability facts of the given variables
    pub fn invalidate(&self, vars: &[VarUid]) -> VarFacts {
        if vars.is_empty() {
            return self.clone();
        }
        let mut nulled = (*self.nulled).clone();
        for var in vars {
            nulled.insert(*var, VarFact::Maybe);
        }
        Self {
            inited: self.inited.clone(),
            nulled: Arc::new(nulled),
        }
    }
}

fn and_maps(a: &FactMap, b: &FactMap, combine: fn(VarFact, VarFact) -> VarFact) -> FactMap {
    if b.is_empty() {
        return a.clone();
    }
    let mut res = (**a).clone();
    for (var, fact) in b.iter() {
        let value = match res.get(var) {
            Some(existing) => combine(*existing, *fact),
            None => *fact,
        };
        res.insert(*var, value);
    }
    Arc::new(res)
}

fn put_maps(a: &FactMap, b: &FactMap) -> FactMap {
    if b.is_empty() {
        return a.clone();
    }
    if a.is_empty() {
        return b.clone();
    }
    let mut res = (**a).clone();
    res.extend(b.iter().map(|(k, v)| (*k, *v)));
    Arc::new(res)
}

fn branch_map(
    cases: &[VarFacts],
    get: impl Fn(&VarFacts) -> &FactMap,
    prev: impl Fn(VarUid) -> VarFact,
) -> IndexMap<VarUid, VarFact> {
    let mut vars: Vec<VarUid> = Vec::new();
    for case in cases {
        for var in get(case).keys() {
            if !vars.contains(var) {
                vars.push(*var);
            }
        }
    }

    let mut res = IndexMap::new();
    for var in vars {
        let prev_value = prev(var);
        let merged = cases
            .iter()
            .map(|case| get(case).get(&var).copied().unwrap_or(prev_value))
            .reduce(VarFact::merge)
            .unwrap_or(prev_value);
        if merged != prev_value {
            res.insert(var, merged);
        }
    }
    res
}

/// Facts attached to a compiled expression
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExprFacts {
    pub true_facts: VarFacts,
    pub false_facts: VarFacts,
    pub post: VarFacts,
}

impl ExprFacts {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of_post(post: VarFacts) -> Self {
        Self {
            post,
            ..Self::default()
        }
    }

    /// Facts of `x == null` (`null_if_true`) or `x != null`
    pub fn for_null_check(var: VarUid, null_if_true: bool) -> Self {
        Self {
            true_facts: VarFacts::of_nulled(var, VarFact::of_bool(null_if_true)),
            false_facts: VarFacts::of_nulled(var, VarFact::of_bool(!null_if_true)),
            post: VarFacts::empty(),
        }
    }

    /// Facts of an expression that only completes if `var` is not null
    pub fn for_null_cast(post: VarFacts, var: VarUid) -> Self {
        Self::of_post(post.put(&VarFacts::of_nulled(var, VarFact::No)))
    }

    /// Facts of an expression that evaluates all of its sub-expressions
    pub fn for_sub_exprs<'a>(subs: impl IntoIterator<Item = &'a ExprFacts>) -> Self {
        let post = subs
            .into_iter()
            .fold(VarFacts::empty(), |acc, facts| acc.and(&facts.post));
        Self::of_post(post)
    }

    /// Swap true and false facts, as `not` does
    pub fn negate(&self) -> Self {
        Self {
            true_facts: self.false_facts.clone(),
            false_facts: self.true_facts.clone(),
            post: self.post.clone(),
        }
    }

    pub fn with_post(mut self, post: VarFacts) -> Self {
        self.post = post;
        self
    }

    /// Facts that hold when the expression is true, including post facts
    pub fn when_true(&self) -> VarFacts {
        self.post.and(&self.true_facts)
    }

    pub fn when_false(&self) -> VarFacts {
        self.post.and(&self.false_facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: VarUid = VarUid(0);
    const Y: VarUid = VarUid(1);

    #[test]
    fn test_and_keeps_one_sided_and_merges_conflicts() {
        let a = VarFacts::of_nulled(X, VarFact::No);
        let b = VarFacts::of_nulled(X, VarFact::Yes).put(&VarFacts::of_nulled(Y, VarFact::No));
        let res = a.and(&b);
        assert_eq!(res.nulled(X), Some(VarFact::Maybe));
        assert_eq!(res.nulled(Y), Some(VarFact::No));
    }

    #[test]
    fn test_and_inited_takes_weaker() {
        let a = VarFacts::of_inited(X, VarFact::Yes);
        let b = VarFacts::of_inited(X, VarFact::Maybe);
        assert_eq!(a.and(&b).inited(X), Some(VarFact::Maybe));
    }

    #[test]
    fn test_put_overrides() {
        let a = VarFacts::of_nulled(X, VarFact::No);
        let b = VarFacts::of_nulled(X, VarFact::Yes);
        assert_eq!(a.put(&b).nulled(X), Some(VarFact::Yes));
    }

    #[test]
    fn test_for_branches_uses_prev_for_silent_branches() {
        let prev = VarFacts::of_nulled(X, VarFact::No);
        let then = VarFacts::empty();
        let other = VarFacts::of_nulled(X, VarFact::Yes);
        let res = VarFacts::for_branches(&prev, &[then, other]);
        assert_eq!(res.nulled(X), Some(VarFact::Maybe));

        let same = VarFacts::for_branches(&prev, &[VarFacts::of_nulled(X, VarFact::No)]);
        assert!(same.is_empty());
    }

    #[test]
    fn test_null_check_negation_swaps() {
        let eq = ExprFacts::for_null_check(X, true);
        let ne = ExprFacts::for_null_check(X, false);
        assert_eq!(eq.negate(), ne);
        assert_eq!(eq.true_facts.nulled(X), Some(VarFact::Yes));
        assert_eq!(ne.true_facts.nulled(X), Some(VarFact::No));
    }

    #[test]
    fn test_assignment_facts() {
        let int_opt = ResolvedType::nullable(ResolvedType::Integer);
        let f = VarFacts::for_assignment(X, &int_opt, &ResolvedType::Null);
        assert_eq!(f.nulled(X), Some(VarFact::Yes));
        assert_eq!(f.inited(X), Some(VarFact::Yes));
        let f = VarFacts::for_assignment(X, &int_opt, &ResolvedType::Integer);
        assert_eq!(f.nulled(X), Some(VarFact::No));
        let f = VarFacts::for_assignment(X, &ResolvedType::Integer, &ResolvedType::Integer);
        assert_eq!(f.nulled(X), None);
    }
}
