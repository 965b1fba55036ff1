//! Compilation context
//!
//! One [`CompilationContext`] exists per compilation unit. It owns
//! everything the expression compilers read or update:
//! - definitions and global constants
//! - the scope stack and the id counter
//! - the flow facts known at the current point
//! - the diagnostic sink

use crate::deferred::Deferred;
use crate::facts::{VarFact, VarFacts};
use crate::ids::{IdCounter, VarUid};
use crate::options::CompilerOptions;
use crate::scope::{LocalVar, ScopeKind, ScopeManager, Symbol};
use indexmap::IndexMap;
use rell_sema_diagnostics::{Diagnostic, DiagnosticSink, ErrorCode, Span};
use rell_sema_types::{Definitions, ResolvedType, Value};
use std::sync::Arc;

/// A module-level constant
///
/// Both the type and the value may be computed by a later pass; the
/// scheduler resolves them through the setters of the deferred handles.
#[derive(Debug, Clone)]
pub struct GlobalConstant {
    pub ty: Deferred<ResolvedType>,
    pub value: Deferred<Value>,
}

impl GlobalConstant {
    pub fn new(ty: Deferred<ResolvedType>, value: Deferred<Value>) -> Self {
        Self { ty, value }
    }

    /// A constant known up front
    pub fn resolved(ty: ResolvedType, value: Value) -> Self {
        Self {
            ty: Deferred::resolved(ty),
            value: Deferred::resolved(value),
        }
    }
}

/// State of one compilation unit
#[derive(Debug)]
pub struct CompilationContext {
    defs: Arc<Definitions>,
    options: CompilerOptions,
    sink: DiagnosticSink,
    ids: IdCounter,
    pub(crate) scopes: ScopeManager,
    facts: VarFacts,
    globals: IndexMap<String, GlobalConstant>,
}

impl CompilationContext {
    pub fn new(defs: Arc<Definitions>, options: CompilerOptions) -> Self {
        let sink = DiagnosticSink::new().with_max_errors(options.max_errors);
        Self {
            defs,
            options,
            sink,
            ids: IdCounter::new(),
            scopes: ScopeManager::new(),
            facts: VarFacts::empty(),
            globals: IndexMap::new(),
        }
    }

    pub fn definitions(&self) -> &Definitions {
        &self.defs
    }

    pub(crate) fn definitions_arc(&self) -> Arc<Definitions> {
        self.defs.clone()
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    pub fn into_sink(self) -> DiagnosticSink {
        self.sink
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.sink.diagnostics()
    }

    pub fn ids(&mut self) -> &mut IdCounter {
        &mut self.ids
    }

    pub fn scopes(&self) -> &ScopeManager {
        &self.scopes
    }

    // === Facts ===

    /// Facts known at the current point
    pub fn facts(&self) -> &VarFacts {
        &self.facts
    }

    /// Install newer facts at the current point
    pub fn apply_facts(&mut self, facts: &VarFacts) {
        self.facts = self.facts.put(facts);
    }

    /// Run `f` with additional facts; the previous facts are restored afterwards
    pub fn with_facts<R>(&mut self, facts: &VarFacts, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.facts.clone();
        self.facts = saved.put(facts);
        let result = f(self);
        self.facts = saved;
        result
    }

    // === Scopes ===

    /// Run `f` in a new scope
    pub fn with_scope<R>(&mut self, kind: ScopeKind, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scopes.enter(kind);
        let result = f(self);
        self.scopes.leave();
        result
    }

    /// Declare a local variable in the current scope without flow facts
    pub fn declare_var(&mut self, name: &str, ty: ResolvedType, mutable: bool) -> LocalVar {
        let var = LocalVar {
            uid: self.ids.next_var(),
            name: name.to_string(),
            ty,
            mutable,
            at: None,
        };
        self.scopes.define(name, Symbol::Var(var.clone()));
        var
    }

    /// Declare an initialized variable, such as a function parameter
    pub fn declare_param(&mut self, name: &str, ty: ResolvedType) -> VarUid {
        let var = self.declare_var(name, ty, false);
        self.apply_facts(&VarFacts::of_inited(var.uid, VarFact::Yes));
        var.uid
    }

    // === Globals ===

    pub fn define_global(&mut self, name: impl Into<String>, constant: GlobalConstant) {
        self.globals.insert(name.into(), constant);
    }

    pub fn global(&self, name: &str) -> Option<&GlobalConstant> {
        self.globals.get(name)
    }

    // === Diagnostics ===

    pub(crate) fn error(&mut self, span: Span, code: ErrorCode, key: impl Into<String>, message: impl Into<String>) {
        self.sink.error(span, code, key, message);
    }

    pub(crate) fn warning(&mut self, span: Span, code: ErrorCode, key: impl Into<String>, message: impl Into<String>) {
        self.sink.warning(span, code, key, message);
    }

    /// Report deprecated syntax, as an error when configured so
    /// Returns whether it was reported as an error
    pub(crate) fn deprecated(&mut self, span: Span, code: ErrorCode, key: impl Into<String>, message: impl Into<String>) -> bool {
        let key = key.into();
        if self.options.deprecated_error {
            self.sink.error(span, code, key, message);
        } else {
            log::warn!("accepting deprecated syntax: {key}");
            self.sink.warning(span, code, key, message);
        }
        self.options.deprecated_error
    }
}
