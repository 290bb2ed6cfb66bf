//! Per-column NULL ratio comparison.

use super::numeric::{null_ratio, ratios_diverge};
use super::schema::SharedColumn;
use crate::core::{MismatchKind, MismatchRecord, TableDescriptor, VerdictStatus};
use crate::prelude::*;
use crate::security::InputValidator;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Classification of one column's NULL pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NullPatternStatus {
    Match,
    Divergent,
}

/// NULL statistics for one shared column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullPatternResult {
    pub column_name: String,
    pub source_null_count: u64,
    pub source_total: u64,
    pub target_null_count: u64,
    pub target_total: u64,
    pub source_null_ratio: f64,
    pub target_null_ratio: f64,
    pub status: NullPatternStatus,
    /// A side declared the column NOT NULL yet holds NULLs
    #[serde(default)]
    pub constraint_violation: bool,
}

impl NullPatternResult {
    /// Classifies a column's NULL counts.
    ///
    /// A side with no rows has a ratio of 0.0.
    ///
    /// ```rust
    /// use term_reconcile::compare::{NullPatternResult, NullPatternStatus};
    ///
    /// let phone = NullPatternResult::new("phone", (0, 1000), (4, 7), 0.0);
    /// assert_eq!(phone.status, NullPatternStatus::Divergent);
    /// assert!((phone.target_null_ratio - 0.571).abs() < 0.001);
    /// ```
    pub fn new(
        column_name: impl Into<String>,
        (source_null_count, source_total): (u64, u64),
        (target_null_count, target_total): (u64, u64),
        threshold: f64,
    ) -> Self {
        let source_null_ratio = null_ratio(source_null_count, source_total);
        let target_null_ratio = null_ratio(target_null_count, target_total);
        let status = if ratios_diverge(source_null_ratio, target_null_ratio, threshold) {
            NullPatternStatus::Divergent
        } else {
            NullPatternStatus::Match
        };

        Self {
            column_name: column_name.into(),
            source_null_count,
            source_total,
            target_null_count,
            target_total,
            source_null_ratio,
            target_null_ratio,
            status,
            constraint_violation: false,
        }
    }

    /// Flags NULLs found in a side declared NOT NULL.
    pub fn with_constraints(mut self, source_nullable: bool, target_nullable: bool) -> Self {
        self.constraint_violation = (!source_nullable && self.source_null_count > 0)
            || (!target_nullable && self.target_null_count > 0);
        self
    }

    pub fn is_divergent(&self) -> bool {
        self.status == NullPatternStatus::Divergent
    }

    pub fn status(&self) -> VerdictStatus {
        if self.is_divergent() || self.constraint_violation {
            VerdictStatus::Fail
        } else {
            VerdictStatus::Pass
        }
    }

    fn records(&self) -> impl Iterator<Item = MismatchRecord> + '_ {
        let divergence = self.is_divergent().then(|| {
            MismatchRecord::new(
                MismatchKind::NullDivergence,
                format!(
                    "NULL ratio {:.4} vs {:.4}",
                    self.source_null_ratio, self.target_null_ratio
                ),
            )
            .with_column(&self.column_name)
            .with_values(
                format!("{}/{}", self.source_null_count, self.source_total),
                format!("{}/{}", self.target_null_count, self.target_total),
            )
        });
        let violation = self.constraint_violation.then(|| {
            MismatchRecord::new(
                MismatchKind::NullConstraintViolation,
                "NOT NULL column contains NULL values",
            )
            .with_column(&self.column_name)
            .with_values(self.source_null_count, self.target_null_count)
        });
        divergence.into_iter().chain(violation)
    }
}

/// Worst status across the column results.
pub fn null_patterns_status(results: &[NullPatternResult]) -> VerdictStatus {
    results
        .iter()
        .map(NullPatternResult::status)
        .max()
        .unwrap_or(VerdictStatus::Pass)
}

pub fn null_patterns_summary(results: &[NullPatternResult]) -> String {
    let divergent = results.iter().filter(|r| r.is_divergent()).count();
    let violations = results.iter().filter(|r| r.constraint_violation).count();
    let mut summary = format!(
        "null pattern: {divergent} of {} column(s) divergent",
        results.len()
    );
    if violations > 0 {
        summary.push_str(&format!(", {violations} NOT NULL violation(s)"));
    }
    summary
}

/// Detail records in column order.
pub fn null_pattern_records(results: &[NullPatternResult]) -> Vec<MismatchRecord> {
    results.iter().flat_map(NullPatternResult::records).collect()
}

/// Compares NULL ratios for every shared column, in the order given.
///
/// Each side is queried once per column with the column name as spelled on
/// that side. `threshold` is the largest accepted absolute difference
/// between the two ratios.
#[instrument(
    skip(source, target, shared_columns),
    fields(source.table = %source, target.table = %target, columns = shared_columns.len())
)]
pub async fn compare_null_patterns(
    source: &TableDescriptor,
    target: &TableDescriptor,
    shared_columns: &[SharedColumn],
    threshold: f64,
) -> Result<Vec<NullPatternResult>> {
    InputValidator::validate_ratio(threshold, "null_divergence_threshold")?;

    let mut results = Vec::with_capacity(shared_columns.len());
    for column in shared_columns {
        let source_counts = null_counts(source, &column.source.name).await?;
        let target_counts = null_counts(target, &column.target.name).await?;
        let result = NullPatternResult::new(&column.name, source_counts, target_counts, threshold)
            .with_constraints(column.source.is_nullable, column.target.is_nullable);

        debug!(
            column = %result.column_name,
            source.null_ratio = result.source_null_ratio,
            target.null_ratio = result.target_null_ratio,
            status = ?result.status,
            constraint_violation = result.constraint_violation,
            "Compared NULL pattern"
        );
        results.push(result);
    }
    Ok(results)
}

async fn null_counts(table: &TableDescriptor, column: &str) -> Result<(u64, u64)> {
    let sql = table
        .dialect()
        .null_count_sql(table.schema_name(), table.table_name(), column)?;
    let row = table.engine().execute_row(&sql).await?;
    match row.as_slice() {
        [Some(nulls), Some(total), ..] => {
            let nulls = u64::try_from(*nulls).map_err(|_| {
                TermError::Internal(format!("negative NULL count for column {column}"))
            })?;
            let total = u64::try_from(*total).map_err(|_| {
                TermError::Internal(format!("negative row count for column {column}"))
            })?;
            Ok((nulls, total))
        }
        _ => Err(TermError::connection(
            "null count",
            format!("NULL count query for {table}.{column} returned no row"),
        )),
    }
}
