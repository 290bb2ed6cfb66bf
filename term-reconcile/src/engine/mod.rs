//! Database engine capability interface.
//!
//! Comparators never talk to a concrete database. They depend on the
//! [`TableEngine`] trait, which exposes the handful of capabilities a
//! reconciliation needs: column introspection, filtered row counts, single-row
//! integer queries and keyed value fetches. Adding an engine means adding one
//! implementation of this trait; no comparison logic changes.
//!
//! Two implementations ship with the crate:
//!
//! - [`DataFusionEngine`]: any table registered in a DataFusion
//!   `SessionContext` (in-memory, files, or database-backed table providers).
//!   Metadata comes from the registered provider's Arrow schema.
//! - `PostgresEngine` (feature `postgres`): a native `tokio-postgres` client
//!   introspecting through `information_schema.columns`.

mod datafusion_engine;
#[cfg(feature = "postgres")]
mod postgres;

pub use self::datafusion_engine::DataFusionEngine;
#[cfg(feature = "postgres")]
pub use self::postgres::{PostgresConfig, PostgresEngine};

use crate::core::{CellValue, ColumnDescriptor, KeyedValue};
use crate::prelude::*;
use crate::security::SqlSecurity;
use async_trait::async_trait;
use std::fmt::Debug;

/// SQL dialect of an engine.
///
/// Both supported dialects use ANSI double-quoted identifiers; the dialect is
/// still carried so SQL generation stays in one place per engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    DataFusion,
    PostgreSql,
}

impl Dialect {
    /// Human-readable engine name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::DataFusion => "DataFusion",
            Dialect::PostgreSql => "PostgreSQL",
        }
    }

    /// Quotes a single identifier.
    pub fn quote(&self, identifier: &str) -> Result<String> {
        match self {
            Dialect::DataFusion | Dialect::PostgreSql => SqlSecurity::quote_identifier(identifier),
        }
    }

    /// Quotes a column name taken from introspected metadata.
    pub fn quote_introspected(&self, column: &str) -> String {
        match self {
            Dialect::DataFusion | Dialect::PostgreSql => SqlSecurity::quote_introspected(column),
        }
    }

    /// Returns `"schema"."table"`.
    pub fn qualified_table(&self, schema: &str, table: &str) -> Result<String> {
        let schema = self.quote(schema)?;
        let table = self.quote(table)?;
        Ok(format!("{schema}.{table}"))
    }

    /// Builds the row count query, appending the caller's filter verbatim.
    pub fn count_sql(&self, schema: &str, table: &str, filter: Option<&str>) -> Result<String> {
        let qualified = self.qualified_table(schema, table)?;
        Ok(match filter.map(str::trim).filter(|f| !f.is_empty()) {
            Some(predicate) => {
                format!("SELECT COUNT(*) AS row_count FROM {qualified} WHERE ({predicate})")
            }
            None => format!("SELECT COUNT(*) AS row_count FROM {qualified}"),
        })
    }

    /// Builds the single query returning `(null_count, total_count)` for a column.
    ///
    /// `column` is an introspected name and is quoted without validation.
    pub fn null_count_sql(&self, schema: &str, table: &str, column: &str) -> Result<String> {
        let qualified = self.qualified_table(schema, table)?;
        let column = self.quote_introspected(column);
        Ok(format!(
            "SELECT COUNT(*) - COUNT({column}) AS null_count, COUNT(*) AS total_count FROM {qualified}"
        ))
    }
}

/// Capability set every database engine provides to the comparators.
///
/// Implementations must be read-only: none of these methods may write.
/// Timeouts and transient network failures must surface as
/// [`TermError::Transient`] so an outer retry policy can distinguish them.
#[async_trait]
pub trait TableEngine: Debug + Send + Sync {
    /// The SQL dialect spoken by this engine.
    fn dialect(&self) -> Dialect;

    /// Returns one descriptor per physical column in ordinal order.
    ///
    /// An absent table may either fail or return an empty list; the schema
    /// introspector turns the latter into a schema lookup error.
    async fn fetch_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// Counts rows, optionally restricted by a caller-supplied predicate.
    async fn execute_count(&self, schema: &str, table: &str, filter: Option<&str>)
        -> Result<u64>;

    /// Executes a query and returns its first row as integers.
    ///
    /// An empty result yields an empty vector.
    async fn execute_row(&self, sql: &str) -> Result<Vec<Option<i64>>>;

    /// Executes a query and returns the first column of its first row.
    async fn execute_scalar(&self, sql: &str) -> Result<Option<i64>> {
        Ok(self.execute_row(sql).await?.into_iter().next().flatten())
    }

    /// Fetches `(key, value)` pairs for one column, keyed by `key_column`.
    ///
    /// Both column names come from [`TableEngine::fetch_columns`]. Rows with
    /// a NULL key are skipped.
    async fn fetch_column_values(
        &self,
        schema: &str,
        table: &str,
        key_column: &str,
        value_column: &ColumnDescriptor,
    ) -> Result<Vec<KeyedValue>>;
}

/// Converts a count returned by an engine into `u64`.
pub(crate) fn count_from_row(row: &[Option<i64>], operation: &str) -> Result<u64> {
    let value = row
        .first()
        .copied()
        .flatten()
        .ok_or_else(|| TermError::connection(operation, "count query returned no value"))?;
    u64::try_from(value)
        .map_err(|_| TermError::Internal(format!("{operation} returned negative count {value}")))
}

/// Builds a keyed value, dropping rows whose key is NULL.
pub(crate) fn keyed(key: Option<String>, value: CellValue) -> Option<KeyedValue> {
    key.map(|key| KeyedValue::new(key, value))
}
