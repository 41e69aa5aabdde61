//! PostgreSQL execution of compiled statements.

use crate::error::Error;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use ontoql_proto::{QueryResult, Value, ValueKind};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Column, Row, TypeInfo};
use tracing::debug;
use uuid::Uuid;

/// One decoded row, columns in select order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    columns: Vec<(String, Value)>,
}

impl Record {
    /// Get a column value by output alias.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Iterate over columns in select order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Consume into `(alias, value)` pairs.
    pub fn into_inner(self) -> Vec<(String, Value)> {
        self.columns
    }
}

/// Runs [`QueryResult`]s against a PostgreSQL pool.
///
/// Named placeholders are rewritten to positional ones before execution.
/// NULL parameters are sent as untyped text, so comparing them against
/// non-text columns needs an explicit cast in the statement.
#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fetch every row of a list or single query.
    pub async fn fetch_all(&self, query: &QueryResult) -> Result<Vec<Record>, Error> {
        let (sql, values) = query.to_positional()?;
        debug!(sql = %sql, params = values.len(), "Executing query");

        let rows = bind_all(sqlx::query(&sql), &values)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_row).collect()
    }

    /// Fetch at most one row.
    pub async fn fetch_optional(&self, query: &QueryResult) -> Result<Option<Record>, Error> {
        let (sql, values) = query.to_positional()?;
        debug!(sql = %sql, params = values.len(), "Executing query");

        let row = bind_all(sqlx::query(&sql), &values)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    /// Run a count query.
    pub async fn fetch_count(&self, query: &QueryResult) -> Result<i64, Error> {
        let (sql, values) = query.to_positional()?;
        debug!(sql = %sql, params = values.len(), "Executing count");

        let row = bind_all(sqlx::query(&sql), &values)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    /// Run an insert, update or delete; returns the number of affected rows.
    pub async fn execute(&self, query: &QueryResult) -> Result<u64, Error> {
        let (sql, values) = query.to_positional()?;
        debug!(sql = %sql, params = values.len(), "Executing statement");

        let result = bind_all(sqlx::query(&sql), &values)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    values: &[Value],
) -> Query<'q, Postgres, PgArguments> {
    for value in values {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::TypedNull(kind) => bind_null(query, *kind),
            Value::Bool(v) => query.bind(*v),
            Value::Int32(v) => query.bind(*v),
            Value::Int64(v) => query.bind(*v),
            Value::Decimal(v) => query.bind(*v),
            Value::String(v) => query.bind(v.clone()),
            Value::Uuid(v) => query.bind(*v),
            Value::Date(v) => query.bind(*v),
            Value::Timestamp(v) => query.bind(*v),
        };
    }
    query
}

fn bind_null<'q>(
    query: Query<'q, Postgres, PgArguments>,
    kind: ValueKind,
) -> Query<'q, Postgres, PgArguments> {
    match kind {
        ValueKind::Bool => query.bind(None::<bool>),
        ValueKind::Int32 => query.bind(None::<i32>),
        ValueKind::Int64 => query.bind(None::<i64>),
        ValueKind::Decimal => query.bind(None::<Decimal>),
        ValueKind::String => query.bind(None::<String>),
        ValueKind::Uuid => query.bind(None::<Uuid>),
        ValueKind::Date => query.bind(None::<NaiveDate>),
        ValueKind::Timestamp => query.bind(None::<DateTime<FixedOffset>>),
    }
}

fn decode_row(row: &PgRow) -> Result<Record, Error> {
    let mut columns = Vec::with_capacity(row.columns().len());
    for column in row.columns() {
        let idx = column.ordinal();
        let type_name = column.type_info().name();
        let value = match type_name {
            "BOOL" => row.try_get::<Option<bool>, _>(idx)?.into(),
            "INT2" => row.try_get::<Option<i16>, _>(idx)?.map(i32::from).into(),
            "INT4" => row.try_get::<Option<i32>, _>(idx)?.into(),
            "INT8" => row.try_get::<Option<i64>, _>(idx)?.into(),
            "NUMERIC" => row.try_get::<Option<Decimal>, _>(idx)?.into(),
            "UUID" => row.try_get::<Option<Uuid>, _>(idx)?.into(),
            "DATE" => row.try_get::<Option<NaiveDate>, _>(idx)?.into(),
            "TIMESTAMPTZ" => row.try_get::<Option<DateTime<FixedOffset>>, _>(idx)?.into(),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(idx)?
                .map(|ts| ts.and_utc().fixed_offset())
                .into(),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => {
                row.try_get::<Option<String>, _>(idx)?.into()
            }
            other => {
                return Err(Error::UnsupportedColumnType {
                    column: column.name().to_string(),
                    type_name: other.to_string(),
                })
            }
        };
        columns.push((column.name().to_string(), value));
    }
    Ok(Record { columns })
}
