//! Native PostgreSQL engine.

use super::{count_from_row, keyed, Dialect, TableEngine};
use crate::core::{CellValue, ColumnDescriptor, KeyedValue, SemanticType};
use crate::logging::LogConfig;
use crate::prelude::*;
use crate::security::SecureString;
use crate::{log_column, log_query};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, info, instrument, warn};

/// Connection parameters for [`PostgresEngine::connect`].
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: SecureString,
    /// Optional connect timeout; a timeout surfaces as a transient error
    pub connect_timeout: Option<Duration>,
}

impl PostgresConfig {
    /// Creates a configuration with the default port (5432).
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecureString>,
    ) -> Self {
        Self {
            host: host.into(),
            port: 5432,
            database: database.into(),
            username: username.into(),
            password: password.into(),
            connect_timeout: None,
        }
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

/// Engine over a single `tokio-postgres` client.
///
/// Column metadata is read from `information_schema.columns`, so declared
/// `VARCHAR` lengths, `NUMERIC` precision/scale and column defaults are all
/// available for schema comparison.
pub struct PostgresEngine {
    client: Client,
    log_config: LogConfig,
}

impl fmt::Debug for PostgresEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresEngine")
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

impl PostgresEngine {
    /// Wraps an already connected client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            log_config: LogConfig::default(),
        }
    }

    /// Opens a connection and drives it on the current tokio runtime.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.username)
            .password(config.password.expose());
        if let Some(timeout) = config.connect_timeout {
            pg_config.connect_timeout(timeout);
        }

        let (client, connection) = pg_config
            .connect(NoTls)
            .await
            .map_err(|e| classify_error("connect", e))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "PostgreSQL connection closed with error");
            }
        });

        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Connected to PostgreSQL"
        );
        Ok(Self::new(client))
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }
}

#[async_trait]
impl TableEngine for PostgresEngine {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    #[instrument(skip(self), fields(engine = "PostgreSQL"))]
    async fn fetch_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let query = r#"
            SELECT
                column_name::text,
                data_type::text,
                character_maximum_length::int4,
                numeric_precision::int4,
                numeric_scale::int4,
                is_nullable = 'YES',
                column_default::text,
                ordinal_position::int4
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
        "#;
        log_query!(self.log_config, query, operation = "fetch columns", "Executing query");

        let rows = self
            .client
            .query(query, &[&schema, &table])
            .await
            .map_err(|e| {
                TermError::schema_lookup_with_source(
                    format!("{schema}.{table}"),
                    e.to_string(),
                    Box::new(e),
                )
            })?;

        let columns: Vec<ColumnDescriptor> = rows.iter().map(describe_row).collect();
        debug!(
            table.schema = schema,
            table.name = table,
            columns = columns.len(),
            "Loaded column metadata"
        );
        Ok(columns)
    }

    #[instrument(skip(self, filter), fields(engine = "PostgreSQL", filtered = filter.is_some()))]
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
        log_query!(self.log_config, sql, operation = "query", "Executing query");
        let rows = self
            .client
            .query(sql, &[])
            .await
            .map_err(|e| classify_error("query", e))?;

        let Some(row) = rows.first() else {
            return Ok(Vec::new());
        };
        (0..row.len())
            .map(|idx| {
                row.try_get::<_, Option<i64>>(idx)
                    .map_err(|e| TermError::Internal(format!("column {idx} is not an integer: {e}")))
            })
            .collect()
    }

    #[instrument(skip(self, value_column), fields(engine = "PostgreSQL", column = %value_column.name))]
    async fn fetch_column_values(
        &self,
        schema: &str,
        table: &str,
        key_column: &str,
        value_column: &ColumnDescriptor,
    ) -> Result<Vec<KeyedValue>> {
        let dialect = self.dialect();
        let cast = value_cast(value_column);
        let sql = format!(
            "SELECT {}::text, {}{} FROM {}",
            dialect.quote_introspected(key_column),
            dialect.quote_introspected(&value_column.name),
            cast.suffix(),
            dialect.qualified_table(schema, table)?
        );
        log_query!(self.log_config, &sql, operation = "column values", "Executing query");

        let rows = self
            .client
            .query(sql.as_str(), &[])
            .await
            .map_err(|e| classify_error("column values", e))?;

        let values: Vec<KeyedValue> = rows
            .iter()
            .filter_map(|row| {
                let key: Option<String> = row.get(0);
                let value = match cast {
                    ValueCast::Float => CellValue::from(row.get::<_, Option<f64>>(1)),
                    ValueCast::Boolean | ValueCast::BitBoolean => {
                        CellValue::from(row.get::<_, Option<bool>>(1))
                    }
                    ValueCast::Text => CellValue::from(row.get::<_, Option<String>>(1)),
                };
                keyed(key, value)
            })
            .collect();

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

/// How a compared column is read back from PostgreSQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueCast {
    Float,
    Boolean,
    /// `bit` has no direct cast to boolean; it goes through `int`
    BitBoolean,
    Text,
}

impl ValueCast {
    fn suffix(self) -> &'static str {
        match self {
            ValueCast::Float => "::float8",
            ValueCast::Boolean => "::boolean",
            ValueCast::BitBoolean => "::int::boolean",
            ValueCast::Text => "::text",
        }
    }
}

fn value_cast(column: &ColumnDescriptor) -> ValueCast {
    match column.declared_type {
        t if t.is_numeric() => ValueCast::Float,
        SemanticType::Boolean
            if column
                .native_type
                .trim()
                .to_ascii_lowercase()
                .starts_with("bit") =>
        {
            ValueCast::BitBoolean
        }
        SemanticType::Boolean => ValueCast::Boolean,
        _ => ValueCast::Text,
    }
}

fn describe_row(row: &Row) -> ColumnDescriptor {
    let name: String = row.get(0);
    let native_type: String = row.get(1);
    let declared = SemanticType::from_native(&native_type);

    let mut column = ColumnDescriptor::from_native(name, native_type)
        .nullable(row.get::<_, bool>(5))
        .at_position(non_negative(row.get(7)).unwrap_or(0));
    column.max_length = non_negative(row.get(2));
    // information_schema reports binary precision for integers and floats;
    // only fixed-point precision is meaningful for comparison
    if declared == SemanticType::Decimal {
        column.numeric_precision = non_negative(row.get(3));
        column.numeric_scale = non_negative(row.get(4));
    }
    column.default_value = row.get(6);
    column
}

fn non_negative(value: Option<i32>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

/// Maps `tokio-postgres` failures onto the error taxonomy.
///
/// Closed connections, I/O failures, cancelled statements (statement
/// timeouts) and SQLSTATE class 08 are transient.
fn classify_error(operation: &str, err: tokio_postgres::Error) -> TermError {
    let io_failure = std::error::Error::source(&err)
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .is_some();
    let transient_state = err.code().is_some_and(|state| {
        *state == SqlState::QUERY_CANCELED || state.code().starts_with("08")
    });

    if err.is_closed() || io_failure || transient_state {
        TermError::transient(operation, err.to_string())
    } else {
        TermError::connection_with_source(operation, err.to_string(), Box::new(err))
    }
}
