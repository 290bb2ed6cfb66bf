//! Comparison options supplied by the orchestrator.

use crate::prelude::*;
use crate::security::{InputValidator, SqlSecurity};
use serde::{Deserialize, Serialize};

/// Default cap on the number of sample mismatch records in a verdict.
pub const DEFAULT_SAMPLE_CAP: usize = 20;

/// Options recognized by the comparators and the aggregator.
///
/// Every field has a default, so options deserialize from partial JSON:
///
/// ```rust
/// use term_reconcile::core::ComparisonOptions;
///
/// let options: ComparisonOptions =
///     serde_json::from_str(r#"{"row_count_tolerance": 0.05}"#).unwrap();
/// assert_eq!(options.row_count_tolerance, 0.05);
/// assert_eq!(options.sample_cap, 20);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonOptions {
    /// Relative tolerance for row counts (0.0 = exact)
    pub row_count_tolerance: f64,
    /// Maximum accepted absolute difference between NULL ratios (0.0 = strict)
    pub null_divergence_threshold: f64,
    /// Maximum number of sample mismatch records in a verdict
    pub sample_cap: usize,
    /// Predicate applied to both row counts, passed through unmodified
    pub filter_clause: Option<String>,
    /// Relative tolerance for numeric cell comparison
    pub value_tolerance: f64,
    /// Key column joining rows for column-value comparison; the source
    /// table's first column when unset
    pub key_column: Option<String>,
    /// Column whose values are compared
    pub compare_column: Option<String>,
    /// Lower bound for the table-rows check
    pub min_rows: Option<u64>,
    /// Upper bound for the table-rows check
    pub max_rows: Option<u64>,
}

impl Default for ComparisonOptions {
    fn default() -> Self {
        Self {
            row_count_tolerance: 0.0,
            null_divergence_threshold: 0.0,
            sample_cap: DEFAULT_SAMPLE_CAP,
            filter_clause: None,
            value_tolerance: 0.0,
            key_column: None,
            compare_column: None,
            min_rows: None,
            max_rows: None,
        }
    }
}

impl ComparisonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the relative row count tolerance.
    pub fn with_row_count_tolerance(mut self, tolerance: f64) -> Self {
        self.row_count_tolerance = tolerance;
        self
    }

    /// Sets the NULL ratio divergence threshold.
    pub fn with_null_divergence_threshold(mut self, threshold: f64) -> Self {
        self.null_divergence_threshold = threshold;
        self
    }

    /// Sets the sample mismatch cap.
    pub fn with_sample_cap(mut self, cap: usize) -> Self {
        self.sample_cap = cap;
        self
    }

    /// Sets the row count filter predicate.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_clause = Some(filter.into());
        self
    }

    /// Sets the numeric tolerance for column-value comparison.
    pub fn with_value_tolerance(mut self, tolerance: f64) -> Self {
        self.value_tolerance = tolerance;
        self
    }

    /// Sets the key and compared column for column-value comparison.
    pub fn with_column_compare(
        mut self,
        key_column: impl Into<String>,
        compare_column: impl Into<String>,
    ) -> Self {
        self.key_column = Some(key_column.into());
        self.compare_column = Some(compare_column.into());
        self
    }

    /// Sets the compared column, joining on the source table's first column.
    pub fn with_compare_column(mut self, compare_column: impl Into<String>) -> Self {
        self.key_column = None;
        self.compare_column = Some(compare_column.into());
        self
    }

    /// Sets the bounds for the table-rows check.
    pub fn with_row_bounds(mut self, min_rows: Option<u64>, max_rows: Option<u64>) -> Self {
        self.min_rows = min_rows;
        self.max_rows = max_rows;
        self
    }

    /// Validates the options, failing fast with a configuration error.
    pub fn validate(&self) -> Result<()> {
        InputValidator::validate_tolerance(self.row_count_tolerance, "row_count_tolerance")?;
        InputValidator::validate_ratio(
            self.null_divergence_threshold,
            "null_divergence_threshold",
        )?;
        InputValidator::validate_tolerance(self.value_tolerance, "value_tolerance")?;

        for (name, column) in [
            ("key_column", &self.key_column),
            ("compare_column", &self.compare_column),
        ] {
            if let Some(column) = column {
                SqlSecurity::validate_identifier(column).map_err(|e| {
                    TermError::configuration(format!("invalid {name} '{column}': {e}"))
                })?;
            }
        }

        if let (Some(min), Some(max)) = (self.min_rows, self.max_rows) {
            if min > max {
                return Err(TermError::configuration(format!(
                    "min_rows ({min}) must not exceed max_rows ({max})"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ComparisonOptions::default();
        assert_eq!(options.row_count_tolerance, 0.0);
        assert_eq!(options.null_divergence_threshold, 0.0);
        assert_eq!(options.sample_cap, DEFAULT_SAMPLE_CAP);
        assert!(options.filter_clause.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let options = ComparisonOptions::new()
            .with_row_count_tolerance(0.05)
            .with_null_divergence_threshold(0.1)
            .with_sample_cap(5)
            .with_filter("status = 'active'")
            .with_column_compare("id", "price");
        assert_eq!(options.sample_cap, 5);
        assert_eq!(options.filter_clause.as_deref(), Some("status = 'active'"));
        assert_eq!(options.key_column.as_deref(), Some("id"));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_compare_column_without_key() {
        let options = ComparisonOptions::new()
            .with_column_compare("id", "price")
            .with_compare_column("product_name");
        assert!(options.key_column.is_none());
        assert_eq!(options.compare_column.as_deref(), Some("product_name"));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_invalid_options_are_configuration_errors() {
        let cases = [
            ComparisonOptions::new().with_row_count_tolerance(-1.0),
            ComparisonOptions::new().with_row_count_tolerance(f64::INFINITY),
            ComparisonOptions::new().with_null_divergence_threshold(1.5),
            ComparisonOptions::new().with_value_tolerance(f64::NAN),
            ComparisonOptions::new().with_column_compare("id", "price; --"),
            ComparisonOptions::new().with_row_bounds(Some(10), Some(5)),
        ];
        for options in cases {
            let err = options.validate().unwrap_err();
            assert!(err.is_fail_fast(), "{err}");
        }
    }

    #[test]
    fn test_serde_round_trip_keeps_fields() {
        let options = ComparisonOptions::new().with_filter("id > 10");
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["filter_clause"], "id > 10");
        assert_eq!(json["sample_cap"], 20);
    }
}
