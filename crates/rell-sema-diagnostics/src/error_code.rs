//! Numeric error codes
//!
//! Error code ranges:
//! - RELL0001-RELL0099: Type and name resolution
//! - RELL0100-RELL0199: Operators and the SQL boundary
//! - RELL0200-RELL0299: At-expressions (queries)
//! - RELL0300-RELL0399: When-expressions (matches)
//! - RELL0400-RELL0499: Statements and flow analysis
//! - RELL0500-RELL0599: Runtime faults
//! - RELL0900+: Internal errors
//!
//! Every diagnostic also carries a stable string key (for example
//! `binop_operand_type:+:[boolean]:[integer]`); the numeric code groups keys
//! into families.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    /// Check if this is a type or name error (0001-0099)
    pub const fn is_type_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    /// Check if this is an operator error (0100-0199)
    pub const fn is_operator_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    /// Check if this is a query error (0200-0299)
    pub const fn is_query_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Check if this is a match error (0300-0399)
    pub const fn is_match_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Check if this is a statement or flow error (0400-0499)
    pub const fn is_flow_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// Check if this is a runtime fault (0500-0599)
    pub const fn is_runtime_error(&self) -> bool {
        self.0 >= 500 && self.0 < 600
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RELL{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Types and names (0001-0099)
    map.insert(1, ErrorInfo::new("Unknown name"));
    map.insert(2, ErrorInfo::new("Unknown type"));
    map.insert(3, ErrorInfo::new("Unknown member"));
    map.insert(4, ErrorInfo::new("Member access on a nullable value")
        .with_help("Use '?.' for safe access or check the value for null first"));
    map.insert(5, ErrorInfo::new("Type mismatch"));
    map.insert(6, ErrorInfo::new("Duplicate tuple field name"));
    map.insert(7, ErrorInfo::new("Incompatible element types"));
    map.insert(8, ErrorInfo::new("Unknown function"));
    map.insert(9, ErrorInfo::new("Wrong number of arguments"));
    map.insert(10, ErrorInfo::new("Expression has no value"));
    map.insert(11, ErrorInfo::new("Name does not denote a value"));
    map.insert(12, ErrorInfo::new("Invalid literal"));

    // Operators (0100-0199)
    map.insert(100, ErrorInfo::new("Wrong operand types for binary operator"));
    map.insert(101, ErrorInfo::new("Wrong operand type for unary operator"));
    map.insert(102, ErrorInfo::new("Expression cannot be converted to SQL")
        .with_help("Move the computation out of the database query"));
    map.insert(103, ErrorInfo::new("Value cannot be converted to SQL"));
    map.insert(104, ErrorInfo::new("Wrong argument type"));

    // Queries (0200-0299)
    map.insert(200, ErrorInfo::new("Duplicate at-expression alias"));
    map.insert(201, ErrorInfo::new("Alias conflicts with a local variable"));
    map.insert(202, ErrorInfo::new("Invalid at-expression source"));
    map.insert(203, ErrorInfo::new("Wrong type of where-expression"));
    map.insert(204, ErrorInfo::new("No attribute matches the where-expression type"));
    map.insert(205, ErrorInfo::new("Multiple attributes match the where-expression type"));
    map.insert(206, ErrorInfo::new("Mixed aggregated and plain what-expressions")
        .with_help("Either none or all what-expressions must be annotated with @group, @sum, @min or @max"));
    map.insert(207, ErrorInfo::new("Wrong type for aggregation"));
    map.insert(208, ErrorInfo::new("All fields are excluded from the result"));
    map.insert(209, ErrorInfo::new("Duplicate field name"));
    map.insert(210, ErrorInfo::new("Wrong limit or offset type"));
    map.insert(211, ErrorInfo::new("Type is not sortable"));
    map.insert(212, ErrorInfo::new("Deprecated sort syntax")
        .with_help("Use @sort or @sort_desc instead"));
    map.insert(213, ErrorInfo::new("Attribute belongs to an outer at-expression"));
    map.insert(214, ErrorInfo::new("Ambiguous attribute name"));
    map.insert(215, ErrorInfo::new("Invalid placeholder"));

    // Matches (0300-0399)
    map.insert(300, ErrorInfo::new("Value already used"));
    map.insert(301, ErrorInfo::new("Else case must be the last one"));
    map.insert(302, ErrorInfo::new("Else case missing"));
    map.insert(303, ErrorInfo::new("Invalid when-expression type"));
    map.insert(304, ErrorInfo::new("Case type mismatch"));
    map.insert(305, ErrorInfo::new("No values left for the else case"));
    map.insert(306, ErrorInfo::new("Incompatible branch types"));
    map.insert(307, ErrorInfo::new("Branch has no value"));

    // Statements and flow (0400-0499)
    map.insert(400, ErrorInfo::new("Variable may be uninitialized"));
    map.insert(401, ErrorInfo::new("Cannot assign to a value"));
    map.insert(402, ErrorInfo::new("Wrong assignment type"));
    map.insert(403, ErrorInfo::new("Name conflict"));
    map.insert(404, ErrorInfo::new("Variable declaration needs a type or an expression"));
    map.insert(405, ErrorInfo::new("Condition must be boolean"));
    map.insert(406, ErrorInfo::new("Wrong iterable type"));
    map.insert(407, ErrorInfo::new("Variable is always or never null")
        .with_help("The check is redundant after smart narrowing"));

    // Runtime (0500-0599)
    map.insert(500, ErrorInfo::new("Evaluation failed"));
    map.insert(501, ErrorInfo::new("Division by zero"));
    map.insert(502, ErrorInfo::new("Integer overflow"));
    map.insert(503, ErrorInfo::new("Wrong number of records"));
    map.insert(504, ErrorInfo::new("Null value"));
    map.insert(505, ErrorInfo::new("SQL execution failed"));

    // Internal (0900+)
    map.insert(900, ErrorInfo::new("Internal error"));

    map
});

// Types and names
pub const RELL0001: ErrorCode = ErrorCode::new(1);
pub const RELL0002: ErrorCode = ErrorCode::new(2);
pub const RELL0003: ErrorCode = ErrorCode::new(3);
pub const RELL0004: ErrorCode = ErrorCode::new(4);
pub const RELL0005: ErrorCode = ErrorCode::new(5);
pub const RELL0006: ErrorCode = ErrorCode::new(6);
pub const RELL0007: ErrorCode = ErrorCode::new(7);
pub const RELL0008: ErrorCode = ErrorCode::new(8);
pub const RELL0009: ErrorCode = ErrorCode::new(9);
pub const RELL0010: ErrorCode = ErrorCode::new(10);
pub const RELL0011: ErrorCode = ErrorCode::new(11);
pub const RELL0012: ErrorCode = ErrorCode::new(12);

// Operators
pub const RELL0100: ErrorCode = ErrorCode::new(100);
pub const RELL0101: ErrorCode = ErrorCode::new(101);
pub const RELL0102: ErrorCode = ErrorCode::new(102);
pub const RELL0103: ErrorCode = ErrorCode::new(103);
pub const RELL0104: ErrorCode = ErrorCode::new(104);

// Queries
pub const RELL0200: ErrorCode = ErrorCode::new(200);
pub const RELL0201: ErrorCode = ErrorCode::new(201);
pub const RELL0202: ErrorCode = ErrorCode::new(202);
pub const RELL0203: ErrorCode = ErrorCode::new(203);
pub const RELL0204: ErrorCode = ErrorCode::new(204);
pub const RELL0205: ErrorCode = ErrorCode::new(205);
pub const RELL0206: ErrorCode = ErrorCode::new(206);
pub const RELL0207: ErrorCode = ErrorCode::new(207);
pub const RELL0208: ErrorCode = ErrorCode::new(208);
pub const RELL0209: ErrorCode = ErrorCode::new(209);
pub const RELL0210: ErrorCode = ErrorCode::new(210);
pub const RELL0211: ErrorCode = ErrorCode::new(211);
pub const RELL0212: ErrorCode = ErrorCode::new(212);
pub const RELL0213: ErrorCode = ErrorCode::new(213);
pub const RELL0214: ErrorCode = ErrorCode::new(214);
pub const RELL0215: ErrorCode = ErrorCode::new(215);

// Matches
pub const RELL0300: ErrorCode = ErrorCode::new(300);
pub const RELL0301: ErrorCode = ErrorCode::new(301);
pub const RELL0302: ErrorCode = ErrorCode::new(302);
pub const RELL0303: ErrorCode = ErrorCode::new(303);
pub const RELL0304: ErrorCode = ErrorCode::new(304);
pub const RELL0305: ErrorCode = ErrorCode::new(305);
pub const RELL0306: ErrorCode = ErrorCode::new(306);
pub const RELL0307: ErrorCode = ErrorCode::new(307);

// Statements and flow
pub const RELL0400: ErrorCode = ErrorCode::new(400);
pub const RELL0401: ErrorCode = ErrorCode::new(401);
pub const RELL0402: ErrorCode = ErrorCode::new(402);
pub const RELL0403: ErrorCode = ErrorCode::new(403);
pub const RELL0404: ErrorCode = ErrorCode::new(404);
pub const RELL0405: ErrorCode = ErrorCode::new(405);
pub const RELL0406: ErrorCode = ErrorCode::new(406);
pub const RELL0407: ErrorCode = ErrorCode::new(407);

// Runtime
pub const RELL0500: ErrorCode = ErrorCode::new(500);
pub const RELL0501: ErrorCode = ErrorCode::new(501);
pub const RELL0502: ErrorCode = ErrorCode::new(502);
pub const RELL0503: ErrorCode = ErrorCode::new(503);
pub const RELL0504: ErrorCode = ErrorCode::new(504);
pub const RELL0505: ErrorCode = ErrorCode::new(505);

// Internal
pub const RELL0900: ErrorCode = ErrorCode::new(900);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(RELL0001.to_string(), "RELL0001");
        assert_eq!(RELL0300.to_string(), "RELL0300");
    }

    #[test]
    fn test_error_categories() {
        assert!(RELL0001.is_type_error());
        assert!(!RELL0001.is_operator_error());
        assert!(RELL0102.is_operator_error());
        assert!(RELL0213.is_query_error());
        assert!(RELL0302.is_match_error());
        assert!(RELL0400.is_flow_error());
        assert!(RELL0503.is_runtime_error());
    }

    #[test]
    fn test_error_info() {
        assert_eq!(RELL0300.info().description, "Value already used");
        assert!(RELL0206.info().help.is_some());
        assert_eq!(ErrorCode::new(777).info().description, "Unknown error");
    }
}
