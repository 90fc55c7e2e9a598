//! PostgreSQL destination store operations.
//!
//! The destination schema itself is an external collaborator: the engine
//! issues parameterized upserts keyed by table name and column set and reads
//! back generated ids, but never creates or alters the entity tables. Each
//! entity table is expected to carry a generated uuid `id` primary key and a
//! UNIQUE constraint on `bubble_id` (the natural-key safety net for re-runs).

use crate::config::TargetConfig;
use crate::error::{MigrateError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::{types::ToSql, NoTls};
use tracing::info;
use uuid::Uuid;

/// A SQL value produced by a transform function.
#[derive(Debug, Clone, PartialEq)]
pub enum DestValue {
    Null(NullType),
    Text(String),
    Bool(bool),
    I64(i64),
    F64(f64),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

/// Type hint for NULL values to ensure correct PostgreSQL encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullType {
    Text,
    Bool,
    I64,
    F64,
    Uuid,
    Timestamp,
}

static NULL_TEXT: Option<String> = None;
static NULL_BOOL: Option<bool> = None;
static NULL_I64: Option<i64> = None;
static NULL_F64: Option<f64> = None;
static NULL_UUID: Option<Uuid> = None;
static NULL_TIMESTAMP: Option<DateTime<Utc>> = None;

impl DestValue {
    /// Borrow this value as a dynamic query parameter.
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            DestValue::Text(v) => v,
            DestValue::Bool(v) => v,
            DestValue::I64(v) => v,
            DestValue::F64(v) => v,
            DestValue::Uuid(v) => v,
            DestValue::Timestamp(v) => v,
            DestValue::Null(NullType::Text) => &NULL_TEXT,
            DestValue::Null(NullType::Bool) => &NULL_BOOL,
            DestValue::Null(NullType::I64) => &NULL_I64,
            DestValue::Null(NullType::F64) => &NULL_F64,
            DestValue::Null(NullType::Uuid) => &NULL_UUID,
            DestValue::Null(NullType::Timestamp) => &NULL_TIMESTAMP,
        }
    }
}

/// One named column value in a destination row.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: &'static str,
    pub value: DestValue,
}

/// A destination-shaped row produced by a transform function.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRow {
    /// Destination table name.
    pub table: &'static str,

    /// Column values; always includes `bubble_id`.
    pub columns: Vec<Column>,
}

impl NewRow {
    /// Value of a named column, if present.
    pub fn value_of(&self, name: &str) -> Option<&DestValue> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.value)
    }

    /// The source id this row was derived from.
    pub fn bubble_id(&self) -> Option<&str> {
        match self.value_of("bubble_id") {
            Some(DestValue::Text(id)) => Some(id),
            _ => None,
        }
    }
}

/// Trait for destination store operations.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Insert the row, or update it in place when a row with the same
    /// `bubble_id` already exists. Returns the destination-assigned id
    /// either way, so a re-run after a crash between the destination write
    /// and the mapping write re-acquires the same row instead of
    /// duplicating it.
    async fn upsert(&self, row: &NewRow) -> Result<Uuid>;

    /// Rows whose FK column is still NULL but whose raw source reference is
    /// present: the second-pass linker's work list.
    async fn pending_links(
        &self,
        table: &str,
        id_column: &str,
        raw_column: &str,
    ) -> Result<Vec<(Uuid, String)>>;

    /// Fill in a resolved FK on one row.
    async fn set_link(
        &self,
        table: &str,
        id_column: &str,
        row_id: Uuid,
        destination_id: Uuid,
    ) -> Result<()>;
}

/// Build a pooled PostgreSQL connection from target configuration.
pub async fn connect_pool(config: &TargetConfig) -> Result<Pool> {
    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };
    let mgr = Manager::from_config(config.pg_config(), NoTls, mgr_config);
    let pool = Pool::builder(mgr)
        .max_size(config.max_connections)
        .build()
        .map_err(|e| MigrateError::pool(e.to_string(), "building target pool"))?;

    // Test connection
    let client = pool
        .get()
        .await
        .map_err(|e| MigrateError::pool(e.to_string(), "connecting to target"))?;
    client.simple_query("SELECT 1").await?;

    info!(
        "Connected to PostgreSQL: {}:{}/{}",
        config.host, config.port, config.database
    );

    Ok(pool)
}

/// PostgreSQL destination store implementation.
pub struct PgDestination {
    pool: Pool,
}

impl PgDestination {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Quote a PostgreSQL identifier.
    fn quote_ident(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e.to_string(), "getting target connection"))
    }

    fn upsert_sql(row: &NewRow) -> String {
        let cols: Vec<String> = row
            .columns
            .iter()
            .map(|c| Self::quote_ident(c.name))
            .collect();
        let placeholders: Vec<String> = (1..=row.columns.len()).map(|i| format!("${}", i)).collect();

        // Update every non-key column on conflict; when only bubble_id is
        // present the no-op assignment still makes RETURNING yield the row.
        let mut updates: Vec<String> = row
            .columns
            .iter()
            .filter(|c| c.name != "bubble_id")
            .map(|c| {
                let quoted = Self::quote_ident(c.name);
                format!("{} = EXCLUDED.{}", quoted, quoted)
            })
            .collect();
        if updates.is_empty() {
            updates.push("\"bubble_id\" = EXCLUDED.\"bubble_id\"".to_string());
        }

        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT (bubble_id) DO UPDATE SET {} RETURNING id",
            Self::quote_ident(row.table),
            cols.join(", "),
            placeholders.join(", "),
            updates.join(", ")
        )
    }
}

#[async_trait]
impl DestinationStore for PgDestination {
    async fn upsert(&self, row: &NewRow) -> Result<Uuid> {
        let sql = Self::upsert_sql(row);
        let params: Vec<&(dyn ToSql + Sync)> =
            row.columns.iter().map(|c| c.value.as_sql()).collect();

        let client = self.client().await?;
        let result = client.query_one(&sql, &params).await?;
        Ok(result.get(0))
    }

    async fn pending_links(
        &self,
        table: &str,
        id_column: &str,
        raw_column: &str,
    ) -> Result<Vec<(Uuid, String)>> {
        let sql = format!(
            "SELECT id, {raw} FROM {table} WHERE {id} IS NULL AND {raw} IS NOT NULL",
            table = Self::quote_ident(table),
            id = Self::quote_ident(id_column),
            raw = Self::quote_ident(raw_column),
        );

        let client = self.client().await?;
        let rows = client.query(&sql, &[]).await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get::<_, Uuid>(0), r.get::<_, String>(1)))
            .collect())
    }

    async fn set_link(
        &self,
        table: &str,
        id_column: &str,
        row_id: Uuid,
        destination_id: Uuid,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET {} = $1 WHERE id = $2",
            Self::quote_ident(table),
            Self::quote_ident(id_column),
        );

        let client = self.client().await?;
        client.execute(&sql, &[&destination_id, &row_id]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_sql_shape() {
        let row = NewRow {
            table: "tags",
            columns: vec![
                Column {
                    name: "bubble_id",
                    value: DestValue::Text("1688x1".into()),
                },
                Column {
                    name: "name",
                    value: DestValue::Text("solvents".into()),
                },
            ],
        };

        let sql = PgDestination::upsert_sql(&row);
        assert_eq!(
            sql,
            "INSERT INTO \"tags\" (\"bubble_id\", \"name\") VALUES ($1, $2) \
             ON CONFLICT (bubble_id) DO UPDATE SET \"name\" = EXCLUDED.\"name\" RETURNING id"
        );
    }

    #[test]
    fn test_upsert_sql_with_only_bubble_id_still_returns_row() {
        let row = NewRow {
            table: "tags",
            columns: vec![Column {
                name: "bubble_id",
                value: DestValue::Text("1688x1".into()),
            }],
        };

        let sql = PgDestination::upsert_sql(&row);
        assert!(sql.contains("DO UPDATE SET \"bubble_id\" = EXCLUDED.\"bubble_id\""));
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(PgDestination::quote_ident("plain"), "\"plain\"");
        assert_eq!(PgDestination::quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
