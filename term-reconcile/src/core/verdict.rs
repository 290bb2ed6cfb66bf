//! Verdict types returned to the orchestrator.
//!
//! [`ValidationVerdict`] is the only object handed back from a comparison
//! run. Its field names are the contract reporting code serializes against,
//! so they are kept stable and `snake_case`.

use super::ComponentOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::TermError;

/// Overall or per-component outcome.
///
/// Variants are ordered by severity so the worst of several statuses is
/// simply their maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictStatus {
    Pass,
    Warn,
    Fail,
    Error,
}

impl VerdictStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, VerdictStatus::Pass)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictStatus::Pass => "PASS",
            VerdictStatus::Warn => "WARN",
            VerdictStatus::Fail => "FAIL",
            VerdictStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The dimension a comparator covers.
///
/// The declaration order is the fixed precedence used when sampling
/// mismatches: schema first, then row count, then NULL patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    Schema,
    RowCount,
    NullPattern,
    ColumnValues,
    TableRows,
}

impl ComparisonKind {
    /// All kinds, in precedence order.
    pub const ALL: [ComparisonKind; 5] = [
        ComparisonKind::Schema,
        ComparisonKind::RowCount,
        ComparisonKind::NullPattern,
        ComparisonKind::ColumnValues,
        ComparisonKind::TableRows,
    ];

    /// The kinds a composite smoke test bundles.
    pub const SMOKE: [ComparisonKind; 3] = [
        ComparisonKind::Schema,
        ComparisonKind::RowCount,
        ComparisonKind::NullPattern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonKind::Schema => "schema",
            ComparisonKind::RowCount => "row_count",
            ComparisonKind::NullPattern => "null_pattern",
            ComparisonKind::ColumnValues => "column_values",
            ComparisonKind::TableRows => "table_rows",
        }
    }
}

impl fmt::Display for ComparisonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonKind {
    type Err = TermError;

    /// Parses the test-type names used in test definitions.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SCHEMA" | "SCHEMA_VALIDATION" | "SCHEMA_COMPARE" => Ok(ComparisonKind::Schema),
            "ROW_COUNT" | "ROW_COUNT_VALIDATION" | "ROW_COUNT_COMPARE" => {
                Ok(ComparisonKind::RowCount)
            }
            "NULL_PATTERN" | "NULL_VALUE_VALIDATION" | "NULL_COMPARE" => {
                Ok(ComparisonKind::NullPattern)
            }
            "COLUMN_VALUES" | "COLUMN_COMPARE_VALIDATION" | "COLUMN_COMPARE" => {
                Ok(ComparisonKind::ColumnValues)
            }
            "TABLE_ROWS" => Ok(ComparisonKind::TableRows),
            other => Err(TermError::configuration(format!(
                "unknown comparison type '{other}'"
            ))),
        }
    }
}

/// What a single mismatch record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MismatchKind {
    MissingInTarget,
    ExtraInTarget,
    TypeMismatch,
    PrecisionMismatch,
    LengthMismatch,
    NullabilityMismatch,
    RowCountDelta,
    NullDivergence,
    NullConstraintViolation,
    ValueMismatch,
    NullMismatch,
    MissingKeyInTarget,
    MissingKeyInSource,
    RowBounds,
}

/// The most granular detail record a comparator produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MismatchRecord {
    pub kind: MismatchKind,
    /// Status this record alone would warrant
    pub severity: VerdictStatus,
    pub column: Option<String>,
    pub detail: String,
    pub source_value: Option<String>,
    pub target_value: Option<String>,
}

impl MismatchRecord {
    /// Creates a FAIL-severity record.
    pub fn new(kind: MismatchKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            severity: VerdictStatus::Fail,
            column: None,
            detail: detail.into(),
            source_value: None,
            target_value: None,
        }
    }

    pub fn with_severity(mut self, severity: VerdictStatus) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Attaches the values observed on each side.
    pub fn with_values(mut self, source: impl ToString, target: impl ToString) -> Self {
        self.source_value = Some(source.to_string());
        self.target_value = Some(target.to_string());
        self
    }
}

/// The final structured outcome of one comparison run.
///
/// Built once by the aggregator and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub status: VerdictStatus,
    pub component_results: BTreeMap<ComparisonKind, ComponentOutcome>,
    pub message: String,
    pub sample_mismatches: Vec<MismatchRecord>,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
}

impl ValidationVerdict {
    /// Status of one component, if it ran.
    pub fn component_status(&self, kind: ComparisonKind) -> Option<VerdictStatus> {
        self.component_results.get(&kind).map(ComponentOutcome::status)
    }

    /// Serializes the verdict as pretty-printed JSON.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
