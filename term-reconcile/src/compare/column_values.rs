//! Keyed cell-by-cell comparison of one column.

use super::numeric::{compare_cells, CellMatch};
use super::schema::fetch_columns;
use crate::core::{
    CellValue, ColumnDescriptor, KeyedValue, MismatchKind, MismatchRecord, TableDescriptor,
    VerdictStatus,
};
use crate::prelude::*;
use crate::security::{InputValidator, SqlSecurity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// A key whose cells differ between source and target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueMismatch {
    pub key: String,
    pub source: CellValue,
    pub target: CellValue,
}

/// Outcome of comparing one column across two tables joined by a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnComparison {
    pub key_column: String,
    pub column: String,
    pub tolerance: f64,
    /// Keys present on both sides
    pub records_compared: usize,
    /// Both cells present but unequal
    pub value_mismatches: Vec<ValueMismatch>,
    /// Exactly one cell NULL
    pub null_mismatches: Vec<ValueMismatch>,
    pub missing_in_target: Vec<String>,
    pub missing_in_source: Vec<String>,
}

impl ColumnComparison {
    /// Joins two keyed value lists and classifies every shared key.
    ///
    /// Duplicate keys keep their first value. All output lists are sorted
    /// by key.
    pub fn from_values(
        key_column: impl Into<String>,
        column: impl Into<String>,
        source: Vec<KeyedValue>,
        target: Vec<KeyedValue>,
        tolerance: f64,
    ) -> Self {
        let source = by_key(source);
        let mut target = by_key(target);

        let mut comparison = Self {
            key_column: key_column.into(),
            column: column.into(),
            tolerance,
            records_compared: 0,
            value_mismatches: Vec::new(),
            null_mismatches: Vec::new(),
            missing_in_target: Vec::new(),
            missing_in_source: Vec::new(),
        };

        for (key, source_value) in source {
            let Some(target_value) = target.remove(&key) else {
                comparison.missing_in_target.push(key);
                continue;
            };
            comparison.records_compared += 1;
            let mismatch = || ValueMismatch {
                key: key.clone(),
                source: source_value.clone(),
                target: target_value.clone(),
            };
            match compare_cells(&source_value, &target_value, tolerance) {
                CellMatch::Match => {}
                CellMatch::NullMismatch => comparison.null_mismatches.push(mismatch()),
                CellMatch::ValueMismatch => comparison.value_mismatches.push(mismatch()),
            }
        }
        comparison.missing_in_source = target.into_keys().collect();
        comparison
    }

    /// FAIL on value differences or unmatched keys, WARN when the only
    /// differences are one-sided NULLs.
    pub fn status(&self) -> VerdictStatus {
        if !self.value_mismatches.is_empty()
            || !self.missing_in_target.is_empty()
            || !self.missing_in_source.is_empty()
        {
            VerdictStatus::Fail
        } else if !self.null_mismatches.is_empty() {
            VerdictStatus::Warn
        } else {
            VerdictStatus::Pass
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "column values ({}): {} compared, {} value mismatch(es), {} NULL mismatch(es), {} missing in target, {} missing in source",
            self.column,
            self.records_compared,
            self.value_mismatches.len(),
            self.null_mismatches.len(),
            self.missing_in_target.len(),
            self.missing_in_source.len()
        )
    }

    pub fn mismatch_records(&self) -> Vec<MismatchRecord> {
        let key_detail = |key: &str| format!("{} = {key}", self.key_column);

        let mut records: Vec<MismatchRecord> = self
            .value_mismatches
            .iter()
            .map(|m| {
                MismatchRecord::new(MismatchKind::ValueMismatch, key_detail(&m.key))
                    .with_column(&self.column)
                    .with_values(&m.source, &m.target)
            })
            .collect();
        records.extend(self.missing_in_target.iter().map(|key| {
            MismatchRecord::new(MismatchKind::MissingKeyInTarget, key_detail(key))
                .with_column(&self.key_column)
        }));
        records.extend(self.missing_in_source.iter().map(|key| {
            MismatchRecord::new(MismatchKind::MissingKeyInSource, key_detail(key))
                .with_column(&self.key_column)
        }));
        records.extend(self.null_mismatches.iter().map(|m| {
            MismatchRecord::new(MismatchKind::NullMismatch, key_detail(&m.key))
                .with_severity(VerdictStatus::Warn)
                .with_column(&self.column)
                .with_values(&m.source, &m.target)
        }));
        records
    }
}

fn by_key(values: Vec<KeyedValue>) -> BTreeMap<String, CellValue> {
    let mut map = BTreeMap::new();
    let mut duplicates = 0usize;
    for KeyedValue { key, value } in values {
        if map.contains_key(&key) {
            duplicates += 1;
        } else {
            map.insert(key, value);
        }
    }
    if duplicates > 0 {
        debug!(duplicates, "Ignoring duplicate keys");
    }
    map
}

/// Compares `column` between two tables, joining rows on `key_column`.
///
/// Both columns must exist on each side (matched case-insensitively).
/// Without a key column the rows are joined on the source table's first
/// column by ordinal position. Numeric cells are compared with `tolerance`;
/// other cells must be equal.
#[instrument(
    skip(source, target),
    fields(source.table = %source, target.table = %target)
)]
pub async fn compare_column_values(
    source: &TableDescriptor,
    target: &TableDescriptor,
    key_column: Option<&str>,
    column: &str,
    tolerance: f64,
) -> Result<ColumnComparison> {
    InputValidator::validate_tolerance(tolerance, "value_tolerance")?;
    for identifier in key_column.into_iter().chain([column]) {
        SqlSecurity::validate_identifier(identifier).map_err(|e| {
            TermError::configuration(format!("invalid column name '{identifier}': {e}"))
        })?;
    }

    let source_columns = fetch_columns(source).await?;
    let key_column = match key_column {
        Some(key) => key.to_string(),
        None => {
            let key = first_column(source, &source_columns)?;
            debug!(key_column = %key, "Joining on the first source column");
            key
        }
    };
    let target_columns = fetch_columns(target).await?;

    let source_values = fetch_side(source, &source_columns, &key_column, column).await?;
    let target_values = fetch_side(target, &target_columns, &key_column, column).await?;
    let comparison =
        ColumnComparison::from_values(key_column, column, source_values, target_values, tolerance);

    debug!(
        records_compared = comparison.records_compared,
        value_mismatches = comparison.value_mismatches.len(),
        null_mismatches = comparison.null_mismatches.len(),
        "Compared column values"
    );
    Ok(comparison)
}

async fn fetch_side(
    table: &TableDescriptor,
    columns: &[ColumnDescriptor],
    key_column: &str,
    column: &str,
) -> Result<Vec<KeyedValue>> {
    let key = find_column(table, columns, key_column)?;
    let value = find_column(table, columns, column)?;
    table
        .engine()
        .fetch_column_values(table.schema_name(), table.table_name(), &key.name, value)
        .await
}

/// The column with the lowest ordinal position.
fn first_column(table: &TableDescriptor, columns: &[ColumnDescriptor]) -> Result<String> {
    columns
        .iter()
        .min_by_key(|c| c.ordinal_position)
        .map(|c| c.name.clone())
        .ok_or_else(|| TermError::schema_lookup(table.qualified_name(), "table has no columns"))
}

fn find_column<'a>(
    table: &TableDescriptor,
    columns: &'a [ColumnDescriptor],
    name: &str,
) -> Result<&'a ColumnDescriptor> {
    let wanted = name.to_lowercase();
    columns
        .iter()
        .find(|c| c.match_key() == wanted)
        .ok_or_else(|| {
            TermError::schema_lookup(table.qualified_name(), format!("column '{name}' not found"))
        })
}
