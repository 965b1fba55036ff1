//! Compiler options
//!
//! Options are plain data with serde defaults, so a host may keep them in a
//! JSON configuration file:
//!
//! ```
//! use rell_sema_compiler::{AtAttrShadowing, CompilerOptions};
//!
//! let options = CompilerOptions::from_json_str(r#"{ "at_attr_shadowing": "partial" }"#).unwrap();
//! assert_eq!(options.at_attr_shadowing, AtAttrShadowing::Partial);
//! assert!(!options.deprecated_error);
//! ```

use rell_sema_diagnostics::SemaError;
use serde::Deserialize;
use thiserror::Error;

/// How far implicit attribute lookup goes through enclosing at-expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtAttrShadowing {
    /// Stop at the first at-expression that has a matching attribute
    #[default]
    Full,
    /// Stop only when the innermost at-expression has a matching attribute
    Partial,
    /// Always search every enclosing at-expression
    None,
}

/// Options controlling the semantic core
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerOptions {
    /// Report deprecated syntax as an error instead of a warning
    pub deprecated_error: bool,
    pub at_attr_shadowing: AtAttrShadowing,
    /// Stop recording errors after this many
    pub max_errors: Option<usize>,
}

/// Errors when loading options
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("Invalid compiler options: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<OptionsError> for SemaError {
    fn from(err: OptionsError) -> Self {
        SemaError::configuration(err.to_string())
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn builder() -> CompilerOptionsBuilder {
        CompilerOptionsBuilder::default()
    }
}

/// Builder for [`CompilerOptions`]
#[derive(Debug, Clone, Default)]
pub struct CompilerOptionsBuilder {
    options: CompilerOptions,
}

impl CompilerOptionsBuilder {
    pub fn deprecated_error(mut self, value: bool) -> Self {
        self.options.deprecated_error = value;
        self
    }

    pub fn at_attr_shadowing(mut self, value: AtAttrShadowing) -> Self {
        self.options.at_attr_shadowing = value;
        self
    }

    pub fn max_errors(mut self, value: usize) -> Self {
        self.options.max_errors = Some(value);
        self
    }

    pub fn build(self) -> CompilerOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let options = CompilerOptions::from_json_str("{}").unwrap();
        assert_eq!(options, CompilerOptions::default());
        assert_eq!(options.at_attr_shadowing, AtAttrShadowing::Full);
    }

    #[test]
    fn test_builder() {
        let options = CompilerOptions::builder()
            .deprecated_error(true)
            .at_attr_shadowing(AtAttrShadowing::None)
            .max_errors(5)
            .build();
        assert!(options.deprecated_error);
        assert_eq!(options.at_attr_shadowing, AtAttrShadowing::None);
        assert_eq!(options.max_errors, Some(5));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = CompilerOptions::from_json_str(r#"{ "shadowing": "full" }"#).unwrap_err();
        let sema: SemaError = err.into();
        assert!(sema.to_string().contains("Invalid compiler options"));
    }
}
