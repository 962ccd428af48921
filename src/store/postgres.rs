//! PostgreSQL store
//!
//! One `PgConnection` held for the whole run. Every batch of inserts runs
//! in its own transaction; constraint additions run in their own
//! transaction so a duplicate can be rolled back without losing anything
//! else.

use crate::catalog::ForeignKey;
use crate::error::{EtlError, Result};
use crate::schema::{add_constraint_sql, ConstraintOutcome, TableDescriptor};
use crate::store::RelationalStore;
use crate::types::{KeyValue, Row, SqlType, Value};
use crate::utils::Helpers;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgArguments, PgConnection};
use sqlx::query::Query;
use sqlx::{Connection, Postgres};
use std::collections::HashSet;

/// SQLSTATE for `duplicate_object`
const DUPLICATE_OBJECT: &str = "42710";

/// PostgreSQL-backed relational store
pub struct PostgresStore {
    conn: PgConnection,
}

impl PostgresStore {
    /// Open the single connection used for the run
    pub async fn connect(url: &str) -> Result<Self> {
        let conn = PgConnection::connect(url).await?;
        Ok(Self { conn })
    }

    /// Close the connection gracefully
    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

fn is_duplicate_object(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(DUPLICATE_OBJECT),
        _ => false,
    }
}

/// Bind a cell, typing nulls after the column
fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
    sql_type: SqlType,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Integer(v) => query.bind(*v),
        Value::Decimal(v) => query.bind(*v),
        Value::Boolean(v) => query.bind(v.to_string()),
        Value::Timestamp(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Null => match sql_type {
            SqlType::Int => query.bind(None::<i64>),
            SqlType::Numeric => query.bind(None::<f64>),
            SqlType::Timestamp => query.bind(None::<NaiveDateTime>),
            SqlType::Varchar => query.bind(None::<String>),
        },
    }
}

/// `SELECT DISTINCT` over a key column, cast to the Rust-side key type
fn fetch_keys_sql(table: &str, column: &str, sql_type: SqlType) -> String {
    let cast = match sql_type {
        SqlType::Int => "bigint",
        SqlType::Numeric => "float8",
        SqlType::Timestamp => "timestamp",
        SqlType::Varchar => "text",
    };
    let column = Helpers::quote_ident(column);
    format!(
        "SELECT DISTINCT {}::{} FROM {} WHERE {} IS NOT NULL",
        column,
        cast,
        Helpers::quote_ident(table),
        column
    )
}

#[async_trait]
impl RelationalStore for PostgresStore {
    async fn create_table(&mut self, table: &TableDescriptor) -> Result<()> {
        let sql = table.create_table_sql();
        log::debug!("{}", sql);
        sqlx::query(&sql).execute(&mut self.conn).await?;
        Ok(())
    }

    async fn add_foreign_key(&mut self, table: &str, fk: &ForeignKey) -> Result<ConstraintOutcome> {
        let sql = add_constraint_sql(table, fk);
        log::debug!("{}", sql);

        let mut tx = self.conn.begin().await?;
        match sqlx::query(&sql).execute(&mut *tx).await {
            Ok(_) => {
                tx.commit().await?;
                Ok(ConstraintOutcome::Added)
            }
            Err(err) if is_duplicate_object(&err) => {
                tx.rollback().await?;
                Ok(ConstraintOutcome::AlreadyExists)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn fetch_keys(&mut self, table: &TableDescriptor, column: &str) -> Result<HashSet<KeyValue>> {
        let sql_type = table
            .column_type(column)
            .ok_or_else(|| EtlError::MissingColumn {
                table: table.name.clone(),
                column: column.to_string(),
            })?;
        let sql = fetch_keys_sql(&table.name, column, sql_type);
        log::debug!("{}", sql);

        let conn = &mut self.conn;
        let keys: HashSet<KeyValue> = match sql_type {
            SqlType::Int => sqlx::query_scalar::<_, i64>(&sql)
                .fetch_all(conn)
                .await?
                .into_iter()
                .map(KeyValue::Integer)
                .collect(),
            SqlType::Numeric => sqlx::query_scalar::<_, f64>(&sql)
                .fetch_all(conn)
                .await?
                .into_iter()
                .filter_map(|v| Value::Decimal(v).key())
                .collect(),
            SqlType::Timestamp => sqlx::query_scalar::<_, NaiveDateTime>(&sql)
                .fetch_all(conn)
                .await?
                .into_iter()
                .map(KeyValue::Timestamp)
                .collect(),
            SqlType::Varchar => sqlx::query_scalar::<_, String>(&sql)
                .fetch_all(conn)
                .await?
                .into_iter()
                .map(KeyValue::Text)
                .collect(),
        };
        Ok(keys)
    }

    async fn insert_rows(&mut self, table: &TableDescriptor, rows: &[&Row]) -> Result<u64> {
        let sql = table.insert_sql();
        log::debug!("{} x{}", sql, rows.len());

        let mut tx = self.conn.begin().await?;
        let mut inserted = 0;
        for row in rows {
            let query = row
                .values
                .iter()
                .zip(&table.columns)
                .fold(sqlx::query(&sql), |query, (value, (_, sql_type))| {
                    bind_value(query, value, *sql_type)
                });
            inserted += query.execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }
}
