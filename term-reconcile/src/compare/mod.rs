//! Comparators.
//!
//! Each comparator covers one dimension of a source/target comparison and
//! is callable on its own. They are stateless async functions taking the
//! two [`TableDescriptor`](crate::core::TableDescriptor)s and the options
//! they need; queries are awaited one after another.
//!
//! | Comparator | Result |
//! |------------|--------|
//! | [`fetch_columns`] + [`diff_schemas`] | [`SchemaDiff`] |
//! | [`compare_row_counts`] | [`RowCountResult`] |
//! | [`compare_null_patterns`] | `Vec<`[`NullPatternResult`]`>` |
//! | [`compare_column_values`] | [`ColumnComparison`] |
//! | [`check_table_rows`] | [`TableRowsResult`] |
//!
//! The pure helpers in [`numeric`] are shared between them.

pub mod column_values;
pub mod null_pattern;
pub mod numeric;
pub mod row_count;
pub mod schema;
pub mod table_rows;

pub use column_values::{compare_column_values, ColumnComparison, ValueMismatch};
pub use null_pattern::{compare_null_patterns, NullPatternResult, NullPatternStatus};
pub use numeric::{classify_nulls, numbers_equal, NullClassification};
pub use row_count::{compare_row_counts, RowCountResult};
pub use schema::{diff_schemas, fetch_columns, ColumnMismatch, SchemaDiff, SharedColumn};
pub use table_rows::{check_table_rows, TableRowsResult};
