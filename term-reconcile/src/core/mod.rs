//! Core reconciliation types.
//!
//! This module holds the data model shared by every comparator and the
//! pieces that tie comparators together into one verdict.
//!
//! ## Overview
//!
//! - **[`TableDescriptor`]**: one side of a comparison (engine handle + schema + table)
//! - **[`ColumnDescriptor`]** / **[`SemanticType`]**: engine-independent column metadata
//! - **[`ComparisonOptions`]**: tolerances, thresholds and the sample cap
//! - **[`ComparisonSuite`]**: runs a set of [`ComparisonKind`]s against a table pair
//! - **[`VerdictAggregator`]**: merges component outcomes into a [`ValidationVerdict`]
//!
//! ## Architecture
//!
//! ```text
//! ComparisonSuite::run(source, target)
//!     ├── fetch_columns + diff_schemas   → ComponentOutcome::Schema
//!     ├── compare_row_counts             → ComponentOutcome::RowCount
//!     ├── compare_null_patterns          → ComponentOutcome::NullPattern
//!     ├── compare_column_values          → ComponentOutcome::ColumnValues
//!     └── check_table_rows               → ComponentOutcome::TableRows
//!                     │
//!                     ▼
//!            VerdictAggregator → ValidationVerdict
//! ```
//!
//! ## Verdict Status
//!
//! - **PASS**: every component is clean
//! - **WARN**: the only differences are NULL-on-one-side cell mismatches
//! - **FAIL**: a schema difference, row count delta, divergent NULL pattern,
//!   value mismatch or bounds violation
//! - **ERROR**: a component could not run; its error class is recorded so
//!   transient failures can be retried by the caller

mod aggregator;
mod column;
mod options;
mod suite;
mod table;
mod value;
mod verdict;

pub use aggregator::{ComponentError, ComponentOutcome, VerdictAggregator};
pub use column::{ColumnDescriptor, SemanticType};
pub use options::{ComparisonOptions, DEFAULT_SAMPLE_CAP};
pub use suite::{ComparisonSuite, ComparisonSuiteBuilder};
pub use table::{TableDescriptor, DEFAULT_SCHEMA};
pub use value::{CellValue, KeyedValue};
pub use verdict::{ComparisonKind, MismatchKind, MismatchRecord, ValidationVerdict, VerdictStatus};
