//! Row count comparison with relative tolerance.

use crate::core::{MismatchKind, MismatchRecord, TableDescriptor, VerdictStatus};
use crate::prelude::*;
use crate::security::InputValidator;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Outcome of comparing the row counts of two tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowCountResult {
    pub source_count: u64,
    pub target_count: u64,
    /// Relative tolerance the counts were compared with
    pub tolerance: f64,
    pub within_tolerance: bool,
    /// `source_count - target_count`
    pub delta: i64,
}

impl RowCountResult {
    /// Classifies a pair of counts.
    ///
    /// Counts are within tolerance iff
    /// `|delta| / max(source, target, 1) <= tolerance`.
    ///
    /// ```rust
    /// use term_reconcile::compare::RowCountResult;
    ///
    /// let result = RowCountResult::new(1200, 8, 0.0);
    /// assert_eq!(result.delta, 1192);
    /// assert!(!result.within_tolerance);
    ///
    /// assert!(RowCountResult::new(100, 96, 0.05).within_tolerance);
    /// ```
    pub fn new(source_count: u64, target_count: u64, tolerance: f64) -> Self {
        let delta = i128::from(source_count) - i128::from(target_count);
        let denominator = source_count.max(target_count).max(1) as f64;
        let within_tolerance = delta.unsigned_abs() as f64 / denominator <= tolerance;

        Self {
            source_count,
            target_count,
            tolerance,
            within_tolerance,
            delta: delta.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64,
        }
    }

    pub fn status(&self) -> VerdictStatus {
        if self.within_tolerance {
            VerdictStatus::Pass
        } else {
            VerdictStatus::Fail
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "row count: source={} target={} delta={} ({})",
            self.source_count,
            self.target_count,
            self.delta,
            if self.within_tolerance {
                "within tolerance"
            } else {
                "outside tolerance"
            }
        )
    }

    pub fn mismatch_records(&self) -> Vec<MismatchRecord> {
        if self.within_tolerance {
            return Vec::new();
        }
        vec![MismatchRecord::new(
            MismatchKind::RowCountDelta,
            format!(
                "row counts differ by {} (tolerance {})",
                self.delta, self.tolerance
            ),
        )
        .with_values(self.source_count, self.target_count)]
    }
}

/// Counts rows on both sides, one after the other, and compares them.
///
/// The optional `filter_clause` is applied verbatim to both count queries.
/// An invalid tolerance is a configuration error; a failed count query
/// surfaces as a connection or transient error.
#[instrument(
    skip(source, target, filter_clause),
    fields(source.table = %source, target.table = %target, result.status = tracing::field::Empty)
)]
pub async fn compare_row_counts(
    source: &TableDescriptor,
    target: &TableDescriptor,
    filter_clause: Option<&str>,
    tolerance: f64,
) -> Result<RowCountResult> {
    InputValidator::validate_tolerance(tolerance, "row_count_tolerance")?;

    let source_count = source
        .engine()
        .execute_count(source.schema_name(), source.table_name(), filter_clause)
        .await?;
    let target_count = target
        .engine()
        .execute_count(target.schema_name(), target.table_name(), filter_clause)
        .await?;

    let result = RowCountResult::new(source_count, target_count, tolerance);
    tracing::Span::current().record("result.status", result.status().as_str());
    debug!(
        source.count = source_count,
        target.count = target_count,
        delta = result.delta,
        within_tolerance = result.within_tolerance,
        "Compared row counts"
    );
    Ok(result)
}
