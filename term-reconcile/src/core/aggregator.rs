//! Merging component results into one verdict.

use super::{ComparisonKind, MismatchRecord, ValidationVerdict, VerdictStatus, DEFAULT_SAMPLE_CAP};
use crate::compare::null_pattern::{null_pattern_records, null_patterns_status, null_patterns_summary};
use crate::compare::{ColumnComparison, NullPatternResult, RowCountResult, SchemaDiff, TableRowsResult};
use crate::error::{ErrorClass, TermError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// A comparator failure captured in place of its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentError {
    pub class: ErrorClass,
    pub message: String,
}

impl From<&TermError> for ComponentError {
    fn from(err: &TermError) -> Self {
        Self {
            class: err.class(),
            message: err.to_string(),
        }
    }
}

/// The structured result of one comparator, or the error it raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentOutcome {
    Schema(SchemaDiff),
    RowCount(RowCountResult),
    NullPattern(Vec<NullPatternResult>),
    ColumnValues(ColumnComparison),
    TableRows(TableRowsResult),
    Error(ComponentError),
}

impl ComponentOutcome {
    /// Wraps a comparator error.
    pub fn error(err: &TermError) -> Self {
        ComponentOutcome::Error(ComponentError::from(err))
    }

    pub fn status(&self) -> VerdictStatus {
        match self {
            ComponentOutcome::Schema(diff) => diff.status(),
            ComponentOutcome::RowCount(result) => result.status(),
            ComponentOutcome::NullPattern(results) => null_patterns_status(results),
            ComponentOutcome::ColumnValues(comparison) => comparison.status(),
            ComponentOutcome::TableRows(result) => result.status(),
            ComponentOutcome::Error(_) => VerdictStatus::Error,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            ComponentOutcome::Schema(diff) => diff.summary(),
            ComponentOutcome::RowCount(result) => result.summary(),
            ComponentOutcome::NullPattern(results) => null_patterns_summary(results),
            ComponentOutcome::ColumnValues(comparison) => comparison.summary(),
            ComponentOutcome::TableRows(result) => result.summary(),
            ComponentOutcome::Error(err) => format!("error ({:?}): {}", err.class, err.message),
        }
    }

    /// Detail records; an errored component has none.
    pub fn mismatch_records(&self) -> Vec<MismatchRecord> {
        match self {
            ComponentOutcome::Schema(diff) => diff.mismatch_records(),
            ComponentOutcome::RowCount(result) => result.mismatch_records(),
            ComponentOutcome::NullPattern(results) => null_pattern_records(results),
            ComponentOutcome::ColumnValues(comparison) => comparison.mismatch_records(),
            ComponentOutcome::TableRows(result) => result.mismatch_records(),
            ComponentOutcome::Error(_) => Vec::new(),
        }
    }
}

/// Combines component outcomes into a [`ValidationVerdict`].
///
/// The overall status is the worst component status (ERROR > FAIL > WARN >
/// PASS). Sample mismatches are taken in [`ComparisonKind`] order, up to the
/// cap, so the same inputs always yield the same samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerdictAggregator {
    sample_cap: usize,
}

impl Default for VerdictAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_CAP)
    }
}

impl VerdictAggregator {
    pub fn new(sample_cap: usize) -> Self {
        Self { sample_cap }
    }

    pub fn sample_cap(&self) -> usize {
        self.sample_cap
    }

    /// Builds the verdict. Never fails: errors already live in the map as
    /// [`ComponentOutcome::Error`].
    pub fn aggregate(
        &self,
        component_results: BTreeMap<ComparisonKind, ComponentOutcome>,
        duration: Duration,
    ) -> ValidationVerdict {
        let status = component_results
            .values()
            .map(ComponentOutcome::status)
            .max()
            .unwrap_or(VerdictStatus::Pass);

        let sample_mismatches: Vec<MismatchRecord> = component_results
            .values()
            .flat_map(ComponentOutcome::mismatch_records)
            .take(self.sample_cap)
            .collect();

        let message = if component_results.is_empty() {
            format!("{status}: no comparisons were run")
        } else {
            let parts: Vec<String> = component_results
                .values()
                .map(ComponentOutcome::summary)
                .collect();
            format!("{status}: {}", parts.join("; "))
        };

        debug!(
            status = %status,
            components = component_results.len(),
            samples = sample_mismatches.len(),
            "Aggregated verdict"
        );

        ValidationVerdict {
            status,
            component_results,
            message,
            sample_mismatches,
            duration,
        }
    }
}
