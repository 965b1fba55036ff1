//! Diagnostics for the Rell semantic core
//!
//! This crate provides the error reporting infrastructure shared by the
//! type checker and the expression compilers:
//!
//! - [`Span`] / [`Spanned`] source ranges carried by every syntax node
//! - [`ErrorCode`] numeric codes with a static description table
//! - [`Diagnostic`] records pairing a code with a stable string key
//! - [`DiagnosticSink`] which collects diagnostics without aborting compilation

mod error;
mod error_code;
mod sink;
mod span;

pub use error::*;
pub use error_code::*;
pub use sink::*;
pub use span::*;

/// Result type for semantic analysis entry points
pub type Result<T> = std::result::Result<T, SemaError>;
