//! Runtime faults raised by compiled evaluators

use rell_sema_diagnostics::{ErrorCode, RELL0501, RELL0502, RELL0503, RELL0504, RELL0505, RELL0900};
use rell_sema_types::CoercionError;
use thiserror::Error;

/// Result type for evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors that can occur when a compiled expression is evaluated
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// Division or remainder by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Integer overflow
    #[error("Integer overflow in {operation}")]
    Overflow { operation: String },

    /// An at-expression returned the wrong number of records
    #[error("{}", cardinality_message(*count))]
    Cardinality { count: usize },

    /// Not-null assertion failed
    #[error("Null value")]
    NullValue,

    /// `require()` failed, with the optional user message
    #[error("{}", message.as_deref().unwrap_or("Requirement failed"))]
    Requirement { message: Option<String> },

    /// The SQL executor failed
    #[error("SQL execution failed: {message}")]
    Sql { message: String },

    /// A promoted value did not fit its target type
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    /// Internal error (should not happen)
    #[error("Internal evaluation error: {message}")]
    Internal { message: String },
}

fn cardinality_message(count: usize) -> String {
    if count == 0 {
        "No records found".to_string()
    } else {
        format!("Multiple records found: {count}")
    }
}

impl EvalError {
    /// Create an overflow error
    pub fn overflow(operation: impl Into<String>) -> Self {
        Self::Overflow {
            operation: operation.into(),
        }
    }

    /// Create a SQL executor error
    pub fn sql(message: impl Into<String>) -> Self {
        Self::Sql {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable key of the fault, e.g. `at:wrong_count:0`
    pub fn key(&self) -> String {
        match self {
            Self::DivisionByZero => "expr:/:div0".to_string(),
            Self::Overflow { operation } => format!("expr:{operation}:overflow"),
            Self::Cardinality { count } => format!("at:wrong_count:{count}"),
            Self::NullValue => "null_value".to_string(),
            Self::Requirement { message: None } => "req_err:null".to_string(),
            Self::Requirement { message: Some(message) } => format!("req_err:[{message}]"),
            Self::Sql { .. } => "sqlerr".to_string(),
            Self::Coercion(_) => "conversion".to_string(),
            Self::Internal { .. } => "internal".to_string(),
        }
    }

    /// Error code of the fault
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DivisionByZero => RELL0501,
            Self::Overflow { .. } | Self::Coercion(_) => RELL0502,
            Self::Cardinality { .. } => RELL0503,
            Self::NullValue | Self::Requirement { .. } => RELL0504,
            Self::Sql { .. } => RELL0505,
            Self::Internal { .. } => RELL0900,
        }
    }

    /// Check whether the fault is a failed user-level check rather than a defect
    pub fn is_user_fault(&self) -> bool {
        !matches!(self, Self::Internal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_messages() {
        assert_eq!(EvalError::Cardinality { count: 0 }.to_string(), "No records found");
        assert_eq!(
            EvalError::Cardinality { count: 3 }.to_string(),
            "Multiple records found: 3"
        );
        assert_eq!(EvalError::Cardinality { count: 2 }.key(), "at:wrong_count:2");
    }

    #[test]
    fn test_codes() {
        assert_eq!(EvalError::DivisionByZero.code(), RELL0501);
        assert_eq!(EvalError::overflow("+").key(), "expr:+:overflow");
        assert!(!EvalError::internal("boom").is_user_fault());
    }

    #[test]
    fn test_requirement_message() {
        let plain = EvalError::Requirement { message: None };
        assert_eq!(plain.to_string(), "Requirement failed");
        assert_eq!(plain.key(), "req_err:null");
        let custom = EvalError::Requirement {
            message: Some("not found".to_string()),
        };
        assert_eq!(custom.to_string(), "not found");
        assert_eq!(custom.key(), "req_err:[not found]");
    }
}
