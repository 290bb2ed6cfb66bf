//! Schema introspection and structural diffing.

use crate::core::{
    ColumnDescriptor, MismatchKind, MismatchRecord, SemanticType, TableDescriptor, VerdictStatus,
};
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Fetches the normalized column list of a table in ordinal order.
///
/// A table without columns is reported as a schema lookup failure, as is
/// any non-transient metadata query error.
#[instrument(skip(table), fields(table = %table, engine = table.dialect().name()))]
pub async fn fetch_columns(table: &TableDescriptor) -> Result<Vec<ColumnDescriptor>> {
    let mut columns = table
        .engine()
        .fetch_columns(table.schema_name(), table.table_name())
        .await
        .map_err(|e| match e {
            TermError::Connection { message, source, .. } => TermError::SchemaLookup {
                table: table.qualified_name(),
                message,
                source,
            },
            other => other,
        })?;

    if columns.is_empty() {
        return Err(TermError::schema_lookup(
            table.qualified_name(),
            "table does not exist or has no visible columns",
        ));
    }

    columns.sort_by_key(|c| c.ordinal_position);
    debug!(columns = columns.len(), "Introspected table");
    Ok(columns)
}

/// A difference in one attribute of a column present on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMismatch<T> {
    pub column: String,
    pub source: T,
    pub target: T,
}

impl<T> ColumnMismatch<T> {
    fn new(column: &str, source: T, target: T) -> Self {
        Self {
            column: column.to_string(),
            source,
            target,
        }
    }
}

/// `(precision, scale)` as reported by an engine.
pub type PrecisionScale = (Option<u32>, Option<u32>);

/// A column present on both sides, matched by case-insensitive name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedColumn {
    /// Name as spelled in the source table
    pub name: String,
    pub source: ColumnDescriptor,
    pub target: ColumnDescriptor,
}

/// Structural difference between two column lists.
///
/// TEXT length differences have their own list rather than sharing
/// `precision_mismatches`, which only ever holds DECIMAL precision/scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDiff {
    /// Source columns without a target counterpart, in source order
    pub missing_in_target: Vec<ColumnDescriptor>,
    /// Target columns without a source counterpart, in target order
    pub extra_in_target: Vec<ColumnDescriptor>,
    pub type_mismatches: Vec<ColumnMismatch<SemanticType>>,
    pub precision_mismatches: Vec<ColumnMismatch<PrecisionScale>>,
    pub length_mismatches: Vec<ColumnMismatch<Option<u32>>>,
    pub nullability_mismatches: Vec<ColumnMismatch<bool>>,
    /// Name intersection in source order; informational, not a mismatch
    pub shared_columns: Vec<SharedColumn>,
}

impl SchemaDiff {
    /// True when the two tables are structurally identical.
    pub fn is_empty(&self) -> bool {
        self.difference_count() == 0
    }

    /// Total number of recorded differences.
    pub fn difference_count(&self) -> usize {
        self.missing_in_target.len()
            + self.extra_in_target.len()
            + self.type_mismatches.len()
            + self.precision_mismatches.len()
            + self.length_mismatches.len()
            + self.nullability_mismatches.len()
    }

    pub fn status(&self) -> VerdictStatus {
        if self.is_empty() {
            VerdictStatus::Pass
        } else {
            VerdictStatus::Fail
        }
    }

    pub fn summary(&self) -> String {
        if self.is_empty() {
            format!(
                "schema: identical ({} shared columns)",
                self.shared_columns.len()
            )
        } else {
            format!(
                "schema: {} difference(s) ({} missing in target, {} extra in target, {} type, {} precision, {} length, {} nullability)",
                self.difference_count(),
                self.missing_in_target.len(),
                self.extra_in_target.len(),
                self.type_mismatches.len(),
                self.precision_mismatches.len(),
                self.length_mismatches.len(),
                self.nullability_mismatches.len()
            )
        }
    }

    /// Detail records in a fixed order: missing, extra, type, precision,
    /// length, nullability.
    pub fn mismatch_records(&self) -> Vec<MismatchRecord> {
        let mut records = Vec::with_capacity(self.difference_count());
        records.extend(self.missing_in_target.iter().map(|c| {
            MismatchRecord::new(MismatchKind::MissingInTarget, "column missing in target")
                .with_column(&c.name)
                .with_values(c.type_display(), "<absent>")
        }));
        records.extend(self.extra_in_target.iter().map(|c| {
            MismatchRecord::new(MismatchKind::ExtraInTarget, "column only present in target")
                .with_column(&c.name)
                .with_values("<absent>", c.type_display())
        }));
        records.extend(self.type_mismatches.iter().map(|m| {
            MismatchRecord::new(MismatchKind::TypeMismatch, "column type differs")
                .with_column(&m.column)
                .with_values(m.source, m.target)
        }));
        records.extend(self.precision_mismatches.iter().map(|m| {
            MismatchRecord::new(MismatchKind::PrecisionMismatch, "numeric precision differs")
                .with_column(&m.column)
                .with_values(render_precision(m.source), render_precision(m.target))
        }));
        records.extend(self.length_mismatches.iter().map(|m| {
            MismatchRecord::new(MismatchKind::LengthMismatch, "maximum length differs")
                .with_column(&m.column)
                .with_values(render_length(m.source), render_length(m.target))
        }));
        records.extend(self.nullability_mismatches.iter().map(|m| {
            MismatchRecord::new(MismatchKind::NullabilityMismatch, "nullability differs")
                .with_column(&m.column)
                .with_values(render_nullable(m.source), render_nullable(m.target))
        }));
        records
    }
}

fn render_precision((precision, scale): PrecisionScale) -> String {
    match (precision, scale) {
        (Some(p), Some(s)) => format!("({p},{s})"),
        (Some(p), None) => format!("({p})"),
        (None, Some(s)) => format!("(?,{s})"),
        (None, None) => "unspecified".to_string(),
    }
}

fn render_length(length: Option<u32>) -> String {
    length.map_or_else(|| "unbounded".to_string(), |l| l.to_string())
}

fn render_nullable(nullable: bool) -> &'static str {
    if nullable {
        "NULL"
    } else {
        "NOT NULL"
    }
}

/// Compares two column lists by case-insensitive name.
///
/// Types are compared by their normalized [`SemanticType`]. Precision and
/// length are only compared when the types agree and both sides report a
/// value, since some engines (DataFusion among them) never report declared
/// lengths.
///
/// # Examples
///
/// ```rust
/// use term_reconcile::compare::diff_schemas;
/// use term_reconcile::core::{ColumnDescriptor, SemanticType};
///
/// let source = vec![
///     ColumnDescriptor::new("id", SemanticType::Integer),
///     ColumnDescriptor::new("name", SemanticType::Text),
/// ];
/// let mut target = source.clone();
/// target.push(ColumnDescriptor::new("extra", SemanticType::Text));
///
/// let diff = diff_schemas(&source, &target);
/// assert_eq!(diff.extra_in_target.len(), 1);
/// assert_eq!(diff.extra_in_target[0].name, "extra");
/// assert!(diff.missing_in_target.is_empty());
/// assert_eq!(diff.shared_columns.len(), 2);
/// ```
pub fn diff_schemas(source: &[ColumnDescriptor], target: &[ColumnDescriptor]) -> SchemaDiff {
    let source_index = index_by_name(source);
    let target_index = index_by_name(target);
    let mut diff = SchemaDiff::default();

    for (idx, column) in source.iter().enumerate() {
        let key = column.match_key();
        // Only the first spelling of a case-folded duplicate participates
        if source_index.get(&key) != Some(&idx) {
            continue;
        }
        match target_index.get(&key) {
            None => diff.missing_in_target.push(column.clone()),
            Some(&target_idx) => compare_shared(&mut diff, column, &target[target_idx]),
        }
    }

    for (idx, column) in target.iter().enumerate() {
        let key = column.match_key();
        if target_index.get(&key) == Some(&idx) && !source_index.contains_key(&key) {
            diff.extra_in_target.push(column.clone());
        }
    }

    debug!(
        shared = diff.shared_columns.len(),
        differences = diff.difference_count(),
        "Computed schema diff"
    );
    diff
}

fn index_by_name(columns: &[ColumnDescriptor]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(columns.len());
    for (idx, column) in columns.iter().enumerate() {
        index.entry(column.match_key()).or_insert(idx);
    }
    index
}

fn compare_shared(diff: &mut SchemaDiff, source: &ColumnDescriptor, target: &ColumnDescriptor) {
    let name = source.name.as_str();

    if source.declared_type != target.declared_type {
        diff.type_mismatches.push(ColumnMismatch::new(
            name,
            source.declared_type,
            target.declared_type,
        ));
    } else {
        match source.declared_type {
            SemanticType::Decimal => {
                if let (Some(s), Some(t)) = (source.precision_pair(), target.precision_pair()) {
                    if s != t {
                        diff.precision_mismatches
                            .push(ColumnMismatch::new(name, s, t));
                    }
                }
            }
            SemanticType::Text => {
                if let (Some(s), Some(t)) = (source.max_length, target.max_length) {
                    if s != t {
                        diff.length_mismatches
                            .push(ColumnMismatch::new(name, Some(s), Some(t)));
                    }
                }
            }
            _ => {}
        }
    }

    if source.is_nullable != target.is_nullable {
        diff.nullability_mismatches.push(ColumnMismatch::new(
            name,
            source.is_nullable,
            target.is_nullable,
        ));
    }

    diff.shared_columns.push(SharedColumn {
        name: name.to_string(),
        source: source.clone(),
        target: target.clone(),
    });
}
