//! Table descriptors: one side of a comparison.

use crate::engine::{Dialect, TableEngine};
use crate::prelude::*;
use crate::security::SqlSecurity;
use std::fmt;
use std::sync::Arc;

/// Schema used when a table name is given without one.
pub const DEFAULT_SCHEMA: &str = "public";

/// Identifies one side (source or target) of a comparison.
///
/// A descriptor pairs a connection handle with a validated schema and table
/// name. It is immutable once constructed; cloning only bumps the handle's
/// reference count.
///
/// # Examples
///
/// ```rust
/// use term_reconcile::core::TableDescriptor;
/// use term_reconcile::engine::DataFusionEngine;
/// use datafusion::prelude::SessionContext;
/// use std::sync::Arc;
///
/// let engine = Arc::new(DataFusionEngine::new(SessionContext::new()));
/// let orders = TableDescriptor::new(engine.clone(), "public", "orders").unwrap();
/// assert_eq!(orders.qualified_name(), "public.orders");
///
/// let parsed = TableDescriptor::parse(engine, "new_orders").unwrap();
/// assert_eq!(parsed.schema_name(), "public");
///
/// assert!(TableDescriptor::new(
///     Arc::new(DataFusionEngine::new(SessionContext::new())),
///     "public",
///     "orders; DROP TABLE orders",
/// )
/// .is_err());
/// ```
#[derive(Clone)]
pub struct TableDescriptor {
    engine: Arc<dyn TableEngine>,
    schema_name: String,
    table_name: String,
}

impl TableDescriptor {
    /// Creates a descriptor, validating both identifiers.
    ///
    /// Invalid identifiers are a configuration error.
    pub fn new(
        engine: Arc<dyn TableEngine>,
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Result<Self> {
        let schema_name = schema_name.into();
        let table_name = table_name.into();
        SqlSecurity::validate_identifier(&schema_name)
            .and_then(|_| SqlSecurity::validate_identifier(&table_name))
            .map_err(|e| {
                TermError::configuration(format!(
                    "invalid table descriptor '{schema_name}.{table_name}': {e}"
                ))
            })?;

        Ok(Self {
            engine,
            schema_name,
            table_name,
        })
    }

    /// Creates a descriptor from `schema.table` or a bare `table`
    /// (which lands in [`DEFAULT_SCHEMA`]).
    pub fn parse(engine: Arc<dyn TableEngine>, qualified_name: &str) -> Result<Self> {
        let (schema, table) = SqlSecurity::split_qualified_name(qualified_name).map_err(|e| {
            TermError::configuration(format!("invalid table name '{qualified_name}': {e}"))
        })?;
        Self::new(
            engine,
            schema.unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            table,
        )
    }

    /// The connection handle.
    pub fn engine(&self) -> &dyn TableEngine {
        self.engine.as_ref()
    }

    /// The dialect of the connection handle.
    pub fn dialect(&self) -> Dialect {
        self.engine.dialect()
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// `schema.table`, unquoted, for logs and reports.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema_name, self.table_name)
    }
}

impl fmt::Debug for TableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableDescriptor")
            .field("engine", &self.engine.dialect().name())
            .field("schema_name", &self.schema_name)
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl fmt::Display for TableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema_name, self.table_name)
    }
}
