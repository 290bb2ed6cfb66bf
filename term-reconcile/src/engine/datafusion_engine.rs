//! DataFusion-backed engine.

use super::{count_from_row, keyed, Dialect, TableEngine};
use crate::core::{CellValue, ColumnDescriptor, KeyedValue, SemanticType};
use crate::logging::LogConfig;
use crate::prelude::*;
use crate::{log_column, log_query};
use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::catalog::TableProvider;
use datafusion::error::DataFusionError;
use datafusion::prelude::SessionContext;
use datafusion::sql::TableReference;
use std::fmt;
use tracing::{debug, instrument};

/// Engine over tables registered in a DataFusion [`SessionContext`].
///
/// Tables are addressed as `schema.table` inside the context's default
/// catalog; `SessionContext::register_table("orders", ..)` makes a table
/// reachable as `public.orders`.
///
/// # Examples
///
/// ```rust,no_run
/// use term_reconcile::engine::DataFusionEngine;
/// use datafusion::prelude::*;
///
/// # async fn example() -> datafusion::error::Result<()> {
/// let ctx = SessionContext::new();
/// ctx.register_csv("orders", "data/orders.csv", CsvReadOptions::new()).await?;
/// let engine = DataFusionEngine::new(ctx);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DataFusionEngine {
    ctx: SessionContext,
    log_config: LogConfig,
}

impl fmt::Debug for DataFusionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFusionEngine")
            .field("session_id", &self.ctx.session_id())
            .field("log_config", &self.log_config)
            .finish()
    }
}

impl DataFusionEngine {
    /// Wraps an existing session context.
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            log_config: LogConfig::default(),
        }
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// The wrapped session context.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    async fn collect(&self, sql: &str, operation: &str) -> Result<Vec<RecordBatch>> {
        log_query!(self.log_config, sql, operation = operation, "Executing query");
        let df = self
            .ctx
            .sql(sql)
            .await
            .map_err(|e| classify_error(operation, e))?;
        df.collect().await.map_err(|e| classify_error(operation, e))
    }
}

#[async_trait]
impl TableEngine for DataFusionEngine {
    fn dialect(&self) -> Dialect {
        Dialect::DataFusion
    }

    #[instrument(skip(self), fields(engine = "DataFusion"))]
    async fn fetch_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let reference = TableReference::partial(schema, table);
        let provider = self.ctx.table_provider(reference).await.map_err(|e| {
            TermError::schema_lookup_with_source(
                format!("{schema}.{table}"),
                format!("table is not registered: {e}"),
                Box::new(e),
            )
        })?;

        let columns: Vec<ColumnDescriptor> = provider
            .schema()
            .fields()
            .iter()
            .enumerate()
            .map(|(idx, field)| describe_field(idx, field))
            .collect();

        debug!(
            table.schema = schema,
            table.name = table,
            columns = columns.len(),
            "Loaded column metadata"
        );
        Ok(columns)
    }

    #[instrument(skip(self, filter), fields(engine = "DataFusion", filtered = filter.is_some()))]
    async fn execute_count(
        &self,
        schema: &str,
        table: &str,
        filter: Option<&str>,
    ) -> Result<u64> {
        let sql = self.dialect().count_sql(schema, table, filter)?;
        let row = self.execute_row(&sql).await?;
        count_from_row(&row, "row count")
    }

    async fn execute_row(&self, sql: &str) -> Result<Vec<Option<i64>>> {
        let batches = self.collect(sql, "query").await?;
        first_row_as_i64(&batches)
    }

    #[instrument(skip(self, value_column), fields(engine = "DataFusion", column = %value_column.name))]
    async fn fetch_column_values(
        &self,
        schema: &str,
        table: &str,
        key_column: &str,
        value_column: &ColumnDescriptor,
    ) -> Result<Vec<KeyedValue>> {
        let dialect = self.dialect();
        let sql = format!(
            "SELECT {}, {} FROM {}",
            dialect.quote_introspected(key_column),
            dialect.quote_introspected(&value_column.name),
            dialect.qualified_table(schema, table)?
        );
        let batches = self.collect(&sql, "column values").await?;

        let mut values = Vec::new();
        for batch in batches.iter().filter(|b| b.num_rows() > 0) {
            let keys = as_strings(batch.column(0))?;
            let cells = to_cells(batch.column(1))?;
            values.extend(
                keys.into_iter()
                    .zip(cells)
                    .filter_map(|(key, value)| keyed(key, value)),
            );
        }

        log_column!(
            self.log_config,
            table.name = table,
            column = %value_column.name,
            rows = values.len(),
            "Fetched column values"
        );
        Ok(values)
    }
}

/// Builds a column descriptor from an Arrow field.
///
/// Arrow carries no declared character length or default, so those stay
/// `None`; decimal precision and scale come from the type itself.
fn describe_field(idx: usize, field: &Field) -> ColumnDescriptor {
    let data_type = field.data_type();
    let mut column = ColumnDescriptor::new(field.name().clone(), SemanticType::from_arrow(data_type))
        .nullable(field.is_nullable())
        .at_position(idx as u32 + 1);
    column.native_type = data_type.to_string();

    match data_type {
        DataType::Decimal128(precision, scale) | DataType::Decimal256(precision, scale) => {
            // Negative scales are not representable as declared SQL scale
            column.with_precision(u32::from(*precision), (*scale).max(0) as u32)
        }
        _ => column,
    }
}

/// Maps DataFusion failures onto the error taxonomy.
///
/// Resource exhaustion and I/O failures are treated as transient.
fn classify_error(operation: &str, err: DataFusionError) -> TermError {
    let transient = matches!(
        err.find_root(),
        DataFusionError::ResourcesExhausted(_) | DataFusionError::IoError(_)
    );
    if transient {
        TermError::transient(operation, err.to_string())
    } else {
        TermError::connection_with_source(operation, err.to_string(), Box::new(err))
    }
}

fn first_row_as_i64(batches: &[RecordBatch]) -> Result<Vec<Option<i64>>> {
    let Some(batch) = batches.iter().find(|b| b.num_rows() > 0) else {
        return Ok(Vec::new());
    };

    batch
        .columns()
        .iter()
        .map(|column| {
            let ints = cast(column.as_ref(), &DataType::Int64)?;
            let ints = ints
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| TermError::Internal("Failed to extract integer value".into()))?;
            Ok((!ints.is_null(0)).then(|| ints.value(0)))
        })
        .collect()
}

fn as_strings(array: &ArrayRef) -> Result<Vec<Option<String>>> {
    let strings = cast(array.as_ref(), &DataType::Utf8)?;
    let strings = strings
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| TermError::Internal("Failed to render values as text".into()))?;
    Ok(strings.iter().map(|v| v.map(str::to_string)).collect())
}

fn to_cells(array: &ArrayRef) -> Result<Vec<CellValue>> {
    match array.data_type() {
        dt if dt.is_numeric() => {
            let floats = cast(array.as_ref(), &DataType::Float64)?;
            let floats = floats
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| TermError::Internal("Failed to read numeric values".into()))?;
            Ok(floats.iter().map(CellValue::from).collect())
        }
        DataType::Boolean => {
            let bools = array
                .as_any()
                .downcast_ref::<BooleanArray>()
                .ok_or_else(|| TermError::Internal("Failed to read boolean values".into()))?;
            Ok(bools.iter().map(CellValue::from).collect())
        }
        _ => Ok(as_strings(array)?
            .into_iter()
            .map(CellValue::from)
            .collect()),
    }
}
