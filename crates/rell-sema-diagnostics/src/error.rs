//! Diagnostic records and the top-level error type

use crate::{ErrorCode, SourceLocation, Span};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Compilation result must not be used
    Error,
    /// Accepted, but likely wrong or deprecated
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message: position, stable key and human-readable text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Numeric error family
    pub code: ErrorCode,
    /// Stable machine-readable key, e.g. `when_expr_dupvalue:1`
    pub key: String,
    /// Human-readable message
    pub message: String,
    /// Source span
    pub span: Span,
    /// Additional context or help
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            key: key.into(),
            message: message.into(),
            span: Span::default(),
            help: None,
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(code: ErrorCode, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, key, message)
        }
    }

    /// Set the span
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render with a line/column position resolved against `source`
    pub fn render(&self, source: &str) -> String {
        let loc = SourceLocation::from_span(self.span, source);
        format!(
            "{}: {} [{}] {} at {}",
            self.severity, self.code, self.key, self.message, loc
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {} at {}",
            self.severity, self.code, self.key, self.message, self.span
        )
    }
}

/// Main error type returned by semantic analysis entry points
#[derive(Debug, Clone, Error)]
pub enum SemaError {
    /// Compilation finished with one or more error diagnostics
    #[error("compilation failed with {} error(s): {}", .0.len(), first_message(.0))]
    Compilation(Vec<Diagnostic>),

    /// Invalid compiler configuration
    #[error("{code}: invalid configuration: {message}")]
    Configuration { code: ErrorCode, message: String },
}

fn first_message(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .first()
        .map(|d| format!("[{}] {}", d.key, d.message))
        .unwrap_or_default()
}

impl SemaError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            code: crate::RELL0900,
            message: message.into(),
        }
    }

    /// Diagnostics carried by this error
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Compilation(diagnostics) => diagnostics,
            Self::Configuration { .. } => &[],
        }
    }

    /// Stable keys of all carried diagnostics, in report order
    pub fn keys(&self) -> Vec<&str> {
        self.diagnostics().iter().map(|d| d.key.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RELL0100, RELL0212};

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::error(
            RELL0100,
            "binop_operand_type:+:[boolean]:[integer]",
            "Wrong operand types for '+': boolean, integer",
        )
        .at(Span::new(4, 9));

        let text = diag.to_string();
        assert!(text.contains("RELL0100"));
        assert!(text.contains("4..9"));
        assert!(diag.is_error());
    }

    #[test]
    fn test_render_with_source() {
        let diag = Diagnostic::warning(RELL0212, "at:what:sort:deprecated:-", "Deprecated sort syntax")
            .at(Span::new(11, 12));
        let rendered = diag.render("val a = 1;\n-x");
        assert!(rendered.starts_with("warning"));
        assert!(rendered.ends_with("at 2:1"));
    }

    #[test]
    fn test_compilation_error_keys() {
        let err = SemaError::Compilation(vec![
            Diagnostic::error(RELL0100, "a", "first"),
            Diagnostic::error(RELL0100, "b", "second"),
        ]);
        assert_eq!(err.keys(), vec!["a", "b"]);
        assert!(err.to_string().contains("2 error(s)"));
        assert!(err.to_string().contains("[a] first"));
    }
}
