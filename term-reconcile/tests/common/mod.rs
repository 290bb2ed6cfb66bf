//! Shared fixtures for integration tests.

#![allow(dead_code)]

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use std::collections::HashMap;
use std::sync::Arc;
use term_reconcile::core::{ColumnDescriptor, KeyedValue, TableDescriptor};
use term_reconcile::engine::{DataFusionEngine, Dialect, TableEngine};
use term_reconcile::error::Result;

/// Registers a single-batch in-memory table in the default schema.
pub fn register(ctx: &SessionContext, name: &str, fields: Vec<Field>, columns: Vec<ArrayRef>) {
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    ctx.register_table(name, Arc::new(table)).unwrap();
}

/// Wraps a context in a descriptor for `public.<table>`.
pub fn descriptor(ctx: SessionContext, table: &str) -> TableDescriptor {
    TableDescriptor::new(Arc::new(DataFusionEngine::new(ctx)), "public", table).unwrap()
}

/// `customers(id BIGINT NOT NULL, name TEXT)` with `rows` rows and no NULLs.
pub fn customers(rows: i64) -> SessionContext {
    let ctx = SessionContext::new();
    register(
        &ctx,
        "customers",
        vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
        ],
        vec![
            Arc::new(Int64Array::from((1..=rows).collect::<Vec<_>>())),
            Arc::new(StringArray::from(
                (1..=rows).map(|i| format!("customer-{i}")).collect::<Vec<_>>(),
            )),
        ],
    );
    ctx
}

/// `contacts(id, phone)` where the first `nulls` phones are NULL.
pub fn contacts(rows: i64, nulls: i64) -> SessionContext {
    let ctx = SessionContext::new();
    let phones: Vec<Option<String>> = (1..=rows)
        .map(|i| (i > nulls).then(|| format!("555-{i:04}")))
        .collect();
    register(
        &ctx,
        "contacts",
        vec![
            Field::new("id", DataType::Int64, false),
            Field::new("phone", DataType::Utf8, true),
        ],
        vec![
            Arc::new(Int64Array::from((1..=rows).collect::<Vec<_>>())),
            Arc::new(StringArray::from(phones)),
        ],
    );
    ctx
}

/// `ledger(id, amount)` from explicit amounts.
pub fn ledger(amounts: Vec<Option<f64>>) -> SessionContext {
    let ctx = SessionContext::new();
    let ids: Vec<i64> = (1..=amounts.len() as i64).collect();
    register(
        &ctx,
        "ledger",
        vec![
            Field::new("id", DataType::Int64, false),
            Field::new("amount", DataType::Float64, true),
        ],
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(Float64Array::from(amounts)),
        ],
    );
    ctx
}

/// An engine with fixed answers, standing in for a remote database.
#[derive(Debug, Default)]
pub struct FixedEngine {
    pub columns: Vec<ColumnDescriptor>,
    pub count: u64,
    /// column name -> (null_count, total)
    pub null_counts: HashMap<String, (i64, i64)>,
    pub values: Vec<KeyedValue>,
}

impl FixedEngine {
    pub fn with_count(count: u64) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    pub fn into_table(self, table: &str) -> TableDescriptor {
        TableDescriptor::new(Arc::new(self), "public", table).unwrap()
    }
}

#[async_trait]
impl TableEngine for FixedEngine {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    async fn fetch_columns(&self, _schema: &str, _table: &str) -> Result<Vec<ColumnDescriptor>> {
        Ok(self.columns.clone())
    }

    async fn execute_count(
        &self,
        _schema: &str,
        _table: &str,
        _filter: Option<&str>,
    ) -> Result<u64> {
        Ok(self.count)
    }

    async fn execute_row(&self, sql: &str) -> Result<Vec<Option<i64>>> {
        let counts = self
            .null_counts
            .iter()
            .find(|(column, _)| sql.contains(&format!("COUNT(\"{column}\")")))
            .map(|(_, counts)| *counts)
            .unwrap_or((0, self.count as i64));
        Ok(vec![Some(counts.0), Some(counts.1)])
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
