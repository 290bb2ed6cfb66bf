//! Single-table row count bounds check.

use crate::core::{MismatchKind, MismatchRecord, TableDescriptor, VerdictStatus};
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Lower bound used when none is given: the table must hold data.
pub const DEFAULT_MIN_ROWS: u64 = 1;

/// Outcome of a row bounds check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRowsResult {
    pub table: String,
    pub row_count: u64,
    pub min_rows: u64,
    pub max_rows: Option<u64>,
    pub within_bounds: bool,
}

impl TableRowsResult {
    pub fn new(table: impl Into<String>, row_count: u64, min_rows: u64, max_rows: Option<u64>) -> Self {
        let within_bounds = row_count >= min_rows && max_rows.map_or(true, |max| row_count <= max);
        Self {
            table: table.into(),
            row_count,
            min_rows,
            max_rows,
            within_bounds,
        }
    }

    pub fn status(&self) -> VerdictStatus {
        if self.within_bounds {
            VerdictStatus::Pass
        } else {
            VerdictStatus::Fail
        }
    }

    fn bounds(&self) -> String {
        match self.max_rows {
            Some(max) => format!("[{}, {max}]", self.min_rows),
            None => format!(">= {}", self.min_rows),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "table rows: {} has {} row(s), expected {}",
            self.table,
            self.row_count,
            self.bounds()
        )
    }

    pub fn mismatch_records(&self) -> Vec<MismatchRecord> {
        if self.within_bounds {
            return Vec::new();
        }
        vec![MismatchRecord::new(
            MismatchKind::RowBounds,
            format!("{} has {} row(s), expected {}", self.table, self.row_count, self.bounds()),
        )
        .with_values(self.row_count, self.bounds())]
    }
}

/// Counts the rows of one table and checks them against the bounds.
///
/// `min_rows` defaults to [`DEFAULT_MIN_ROWS`].
#[instrument(skip(table), fields(table = %table))]
pub async fn check_table_rows(
    table: &TableDescriptor,
    min_rows: Option<u64>,
    max_rows: Option<u64>,
) -> Result<TableRowsResult> {
    let min_rows = min_rows.unwrap_or(DEFAULT_MIN_ROWS);
    if let Some(max) = max_rows {
        if min_rows > max {
            return Err(TermError::configuration(format!(
                "min_rows ({min_rows}) must not exceed max_rows ({max})"
            )));
        }
    }

    let row_count = table
        .engine()
        .execute_count(table.schema_name(), table.table_name(), None)
        .await?;
    let result = TableRowsResult::new(table.qualified_name(), row_count, min_rows, max_rows);
    debug!(row_count, within_bounds = result.within_bounds, "Checked table rows");
    Ok(result)
}
