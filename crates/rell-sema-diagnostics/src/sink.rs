//! Diagnostic collection

use crate::{Diagnostic, ErrorCode, Result, SemaError, Severity, Span};

/// Collects diagnostics during compilation
///
/// Errors never abort compilation: the caller substitutes an error-typed
/// result and continues, so one pass reports as many problems as possible.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    max_errors: Option<usize>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop recording error diagnostics after `max` of them; the count keeps growing
    pub fn with_max_errors(mut self, max: Option<usize>) -> Self {
        self.max_errors = max;
        self
    }

    /// Record a diagnostic
    pub fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Error {
            self.error_count += 1;
            if self.max_errors.is_some_and(|max| self.error_count > max) {
                log::trace!("error limit reached, dropping {}", diagnostic.key);
                return;
            }
        }
        self.diagnostics.push(diagnostic);
    }

    /// Record an error
    pub fn error(
        &mut self,
        span: Span,
        code: ErrorCode,
        key: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.report(Diagnostic::error(code, key, message).at(span));
    }

    /// Record a warning
    pub fn warning(
        &mut self,
        span: Span,
        code: ErrorCode,
        key: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.report(Diagnostic::warning(code, key, message).at(span));
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Stable keys of all recorded diagnostics
    pub fn keys(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|d| d.key.as_str()).collect()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Convert into `Ok(value)` when no error was recorded
    pub fn into_result<T>(self, value: T) -> Result<T> {
        if self.has_errors() {
            let errors = self
                .diagnostics
                .into_iter()
                .filter(Diagnostic::is_error)
                .collect();
            Err(SemaError::Compilation(errors))
        } else {
            Ok(value)
        }
    }
}
