//! Tolerance-based numeric equality and NULL classification.
//!
//! These are pure functions shared by the column-value comparator and the
//! NULL-pattern comparator's ratio check.

use crate::core::{CellValue, VerdictStatus};
use serde::{Deserialize, Serialize};

/// Floor for the relative-difference denominator, so two zeros compare.
pub const EPSILON: f64 = 1e-9;

/// Returns true if `a == b`, or if both are present and their relative
/// difference is within `relative_tolerance`.
///
/// Two NULLs are equal; a NULL and a number never are.
///
/// # Examples
///
/// ```rust
/// use term_reconcile::compare::numbers_equal;
///
/// assert!(numbers_equal(Some(100.0), Some(100.0), 0.0));
/// assert!(numbers_equal(Some(100.0), Some(104.0), 0.05));
/// assert!(!numbers_equal(Some(100.0), Some(106.0), 0.05));
/// assert!(numbers_equal(Some(0.0), Some(0.0), 0.0));
/// assert!(!numbers_equal(None, Some(1.0), 1.0));
/// ```
pub fn numbers_equal(a: Option<f64>, b: Option<f64>, relative_tolerance: f64) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            if a == b {
                return true;
            }
            let scale = a.abs().max(b.abs()).max(EPSILON);
            (a - b).abs() / scale <= relative_tolerance
        }
        _ => false,
    }
}

/// Three-way NULL classification of a pair of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NullClassification {
    BothNull,
    ANullOnly,
    BNullOnly,
    NeitherNull,
}

impl NullClassification {
    /// The status this classification settles on its own.
    ///
    /// `None` means the values must be compared. A NULL on exactly one side
    /// is never worse than WARN.
    pub fn status(&self) -> Option<VerdictStatus> {
        match self {
            NullClassification::BothNull => Some(VerdictStatus::Pass),
            NullClassification::ANullOnly | NullClassification::BNullOnly => {
                Some(VerdictStatus::Warn)
            }
            NullClassification::NeitherNull => None,
        }
    }

    pub fn is_one_sided(&self) -> bool {
        matches!(
            self,
            NullClassification::ANullOnly | NullClassification::BNullOnly
        )
    }
}

/// Classifies which side of a pair is NULL.
pub fn classify_nulls(a: &CellValue, b: &CellValue) -> NullClassification {
    match (a.is_null(), b.is_null()) {
        (true, true) => NullClassification::BothNull,
        (true, false) => NullClassification::ANullOnly,
        (false, true) => NullClassification::BNullOnly,
        (false, false) => NullClassification::NeitherNull,
    }
}

/// Outcome of comparing two cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellMatch {
    Match,
    /// Exactly one side is NULL
    NullMismatch,
    ValueMismatch,
}

/// Compares two cells: NULL classification first, then numeric tolerance
/// for numbers and exact equality for everything else.
pub fn compare_cells(a: &CellValue, b: &CellValue, relative_tolerance: f64) -> CellMatch {
    let classification = classify_nulls(a, b);
    match classification.status() {
        Some(VerdictStatus::Pass) => return CellMatch::Match,
        Some(_) => return CellMatch::NullMismatch,
        None => {}
    }

    let equal = match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => numbers_equal(Some(x), Some(y), relative_tolerance),
        _ => a == b,
    };
    if equal {
        CellMatch::Match
    } else {
        CellMatch::ValueMismatch
    }
}

/// NULL ratio of a column, defined as 0.0 for an empty table.
pub fn null_ratio(null_count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        null_count as f64 / total as f64
    }
}

/// True if two ratios differ by more than `threshold`.
///
/// Differences within [`EPSILON`] of the threshold are not divergent, so a
/// threshold of 0.0 means equality up to floating-point noise.
pub fn ratios_diverge(source_ratio: f64, target_ratio: f64, threshold: f64) -> bool {
    (source_ratio - target_ratio).abs() > threshold + EPSILON
}
