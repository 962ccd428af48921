//! MongoDB store
//!
//! Rows are written as documents keyed by column name, one collection per
//! table, with no schema and no deduplication.

use crate::error::Result;
use crate::store::DocumentStore;
use crate::types::{Table, Value};
use async_trait::async_trait;
use mongodb::bson::{doc, Bson, DateTime, Document};
use mongodb::{Client, Database};

/// MongoDB-backed document store
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Connect and check that the server answers
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database);
        database.run_command(doc! { "ping": 1 }).await?;
        Ok(Self { client, database })
    }

    /// Shut the client down, waiting for in-flight operations
    pub async fn close(self) {
        self.client.shutdown().await;
    }
}

/// BSON form of a cell, keeping its original type
pub fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Integer(v) => Bson::Int64(*v),
        Value::Decimal(v) => Bson::Double(*v),
        Value::Boolean(v) => Bson::Boolean(*v),
        Value::Timestamp(v) => Bson::DateTime(DateTime::from_millis(v.and_utc().timestamp_millis())),
        Value::Text(v) => Bson::String(v.clone()),
        Value::Null => Bson::Null,
    }
}

/// Documents for every row of a table
pub fn to_documents(table: &Table) -> Vec<Document> {
    table
        .rows
        .iter()
        .map(|row| {
            table
                .columns
                .iter()
                .zip(&row.values)
                .map(|(column, value)| (column.name.clone(), to_bson(value)))
                .collect()
        })
        .collect()
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_table(&mut self, table: &Table) -> Result<u64> {
        let documents = to_documents(table);
        if documents.is_empty() {
            return Ok(0);
        }
        let result = self
            .database
            .collection::<Document>(&table.name)
            .insert_many(documents)
            .await?;
        Ok(result.inserted_ids.len() as u64)
    }
}
