//! Security utilities for the reconciliation library.
//!
//! Every identifier that ends up inside generated SQL (schema, table and
//! column names) goes through [`SqlSecurity`] first. Credentials for the
//! native engines are held in a [`SecureString`].

use crate::error::{Result, TermError};
use once_cell::sync::Lazy;
use regex::Regex;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secure string that automatically clears its contents when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureString(String);

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl SecureString {
    /// Create a new secure string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string value. Use carefully and avoid storing the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Convert to a regular string. The SecureString will be zeroized.
    pub fn into_string(mut self) -> String {
        let value = std::mem::take(&mut self.0);
        self.0.zeroize();
        value
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Maximum accepted identifier length.
const MAX_IDENTIFIER_LENGTH: usize = 128;

static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    // Compile-time constant pattern
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_$]*$").expect("Hard-coded regex pattern should be valid")
});

/// SQL identifier validation and quoting utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates a single-part SQL identifier (schema, table or column name).
    ///
    /// # Examples
    /// ```rust
    /// use term_reconcile::security::SqlSecurity;
    ///
    /// assert!(SqlSecurity::validate_identifier("customer_id").is_ok());
    /// assert!(SqlSecurity::validate_identifier("id; DROP TABLE users--").is_err());
    /// assert!(SqlSecurity::validate_identifier("public.orders").is_err());
    /// ```
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(TermError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > MAX_IDENTIFIER_LENGTH {
            return Err(TermError::SecurityError(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }

        if identifier.contains('\0') {
            return Err(TermError::SecurityError(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }

        if !IDENTIFIER_REGEX.is_match(identifier) {
            return Err(TermError::SecurityError(format!(
                "Invalid SQL identifier format: '{identifier}'. Identifiers must start with a letter or underscore and contain only letters, numbers, underscores and '$'"
            )));
        }

        Ok(())
    }

    /// Validates an identifier and wraps it in double quotes.
    ///
    /// Both DataFusion and PostgreSQL use ANSI double-quoted identifiers, so
    /// quoting preserves the identifier's case exactly as introspected.
    pub fn quote_identifier(identifier: &str) -> Result<String> {
        Self::validate_identifier(identifier)?;
        let escaped = identifier.replace('"', "\"\"");
        Ok(format!("\"{escaped}\""))
    }

    /// Quotes a column name reported by the engine's own catalog.
    ///
    /// Catalog names are not user input and may legally contain spaces,
    /// punctuation or non-ASCII letters, so only embedded quotes are escaped.
    pub fn quote_introspected(identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    /// Splits `schema.table` (or a bare `table`) into its parts, validating both.
    ///
    /// A bare name yields `None` for the schema so the caller can apply its
    /// own default.
    pub fn split_qualified_name(name: &str) -> Result<(Option<String>, String)> {
        let parts: Vec<&str> = name.trim().split('.').collect();
        match parts.as_slice() {
            [table] => {
                Self::validate_identifier(table)?;
                Ok((None, (*table).to_string()))
            }
            [schema, table] => {
                Self::validate_identifier(schema)?;
                Self::validate_identifier(table)?;
                Ok((Some((*schema).to_string()), (*table).to_string()))
            }
            _ => Err(TermError::SecurityError(format!(
                "Invalid qualified table name: '{name}'. Expected 'schema.table' or 'table'"
            ))),
        }
    }
}

/// Input validation utilities for numeric options.
pub struct InputValidator;

impl InputValidator {
    /// Validates that a tolerance is finite and non-negative.
    pub fn validate_tolerance(value: f64, name: &str) -> Result<()> {
        if !value.is_finite() {
            return Err(TermError::Configuration(format!(
                "Invalid {name} value: must be finite (not NaN or infinite)"
            )));
        }
        if value < 0.0 {
            return Err(TermError::Configuration(format!(
                "Invalid {name} value: must not be negative, got {value}"
            )));
        }
        Ok(())
    }

    /// Validates a ratio value (0.0 to 1.0).
    pub fn validate_ratio(value: f64, name: &str) -> Result<()> {
        Self::validate_tolerance(value, name)?;

        if value > 1.0 {
            return Err(TermError::Configuration(format!(
                "Invalid {name} value: must be between 0.0 and 1.0, got {value}"
            )));
        }
        Ok(())
    }
}
