//! Fixtures shared by unit tests: in-memory DataFusion tables and a
//! scripted engine for failure paths.

use crate::core::{ColumnDescriptor, KeyedValue, TableDescriptor};
use crate::engine::{DataFusionEngine, Dialect, TableEngine};
use crate::error::{ErrorClass, Result, TermError};
use arrow::array::{Decimal128Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use std::collections::HashMap;
use std::sync::Arc;

/// `public.orders`: five rows, `phone` NULL twice, three amounts above 20.
pub async fn orders_context() -> SessionContext {
    let ctx = SessionContext::new();
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("customer", DataType::Utf8, true),
        Field::new("amount", DataType::Float64, true),
        Field::new("phone", DataType::Utf8, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5])),
            Arc::new(StringArray::from(vec!["alice", "bob", "carol", "dave", "erin"])),
            Arc::new(Float64Array::from(vec![10.0, 15.0, 25.0, 30.0, 40.0])),
            Arc::new(StringArray::from(vec![
                Some("555-0100"),
                None,
                Some("555-0102"),
                None,
                Some("555-0104"),
            ])),
        ],
    )
    .unwrap();

    let table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    ctx.register_table("orders", Arc::new(table)).unwrap();
    ctx
}

/// `public.prices` with `price DECIMAL(10,2) NOT NULL`.
pub async fn price_table_context() -> SessionContext {
    let ctx = SessionContext::new();
    let schema = Arc::new(Schema::new(vec![
        Field::new("sku", DataType::Utf8, false),
        Field::new("price", DataType::Decimal128(10, 2), false),
    ]));

    let prices = Decimal128Array::from(vec![1999_i128, 500, 12050])
        .with_precision_and_scale(10, 2)
        .unwrap();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec!["A-1", "B-2", "C-3"])),
            Arc::new(prices),
        ],
    )
    .unwrap();

    let table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    ctx.register_table("prices", Arc::new(table)).unwrap();
    ctx
}

/// Descriptor for `public.orders` on a fresh context.
pub async fn orders_table() -> TableDescriptor {
    let engine = Arc::new(DataFusionEngine::new(orders_context().await));
    TableDescriptor::new(engine, "public", "orders").unwrap()
}

/// An engine answering from canned values.
///
/// NULL counts default to `(0, count)` for columns without a script.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    columns: Vec<ColumnDescriptor>,
    columns_error: Option<(ErrorClass, String)>,
    count: u64,
    count_error: Option<(ErrorClass, String)>,
    null_counts: HashMap<String, (i64, i64)>,
    values: Vec<KeyedValue>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(mut self, columns: Vec<ColumnDescriptor>) -> Self {
        self.columns = columns;
        self
    }

    pub fn failing_columns(mut self, err: TermError) -> Self {
        self.columns_error = Some((err.class(), err.to_string()));
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn failing_count(mut self, err: TermError) -> Self {
        self.count_error = Some((err.class(), err.to_string()));
        self
    }

    pub fn with_null_counts(mut self, column: &str, nulls: i64, total: i64) -> Self {
        self.null_counts.insert(column.to_string(), (nulls, total));
        self
    }

    pub fn with_values(mut self, values: Vec<KeyedValue>) -> Self {
        self.values = values;
        self
    }
}

fn rebuild((class, message): &(ErrorClass, String)) -> TermError {
    match class {
        ErrorClass::Configuration => TermError::configuration(message.clone()),
        ErrorClass::SchemaLookup => TermError::schema_lookup("scripted", message.clone()),
        ErrorClass::Connection => TermError::connection("scripted", message.clone()),
        ErrorClass::Transient => TermError::transient("scripted", message.clone()),
        ErrorClass::Internal => TermError::Internal(message.clone()),
    }
}

#[async_trait]
impl TableEngine for ScriptedEngine {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    async fn fetch_columns(&self, _schema: &str, _table: &str) -> Result<Vec<ColumnDescriptor>> {
        match &self.columns_error {
            Some(err) => Err(rebuild(err)),
            None => Ok(self.columns.clone()),
        }
    }

    async fn execute_count(
        &self,
        _schema: &str,
        _table: &str,
        _filter: Option<&str>,
    ) -> Result<u64> {
        match &self.count_error {
            Some(err) => Err(rebuild(err)),
            None => Ok(self.count),
        }
    }

    async fn execute_row(&self, sql: &str) -> Result<Vec<Option<i64>>> {
        if let Some(err) = &self.count_error {
            return Err(rebuild(err));
        }
        let scripted = self
            .null_counts
            .iter()
            .find(|(column, _)| sql.contains(&format!("COUNT(\"{column}\")")))
            .map(|(_, counts)| *counts);
        let (nulls, total) = scripted.unwrap_or((0, self.count as i64));
        Ok(vec![Some(nulls), Some(total)])
    }

    async fn fetch_column_values(
        &self,
        _schema: &str,
        _table: &str,
        _key_column: &str,
        _value_column: &ColumnDescriptor,
    ) -> Result<Vec<KeyedValue>> {
        Ok(self.values.clone())
    }
}
