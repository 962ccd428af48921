//! In-memory stores
//!
//! Same observable semantics as the PostgreSQL and MongoDB stores:
//! `IF NOT EXISTS` table creation, named constraints that reject duplicates,
//! enforced primary and foreign keys, all-or-nothing batches, and
//! collections that accept anything.

use crate::catalog::ForeignKey;
use crate::error::{EtlError, Result};
use crate::schema::{constraint_name, ConstraintOutcome, TableDescriptor};
use crate::store::{DocumentStore, RelationalStore};
use crate::types::{KeyValue, Row, Table};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug)]
struct MemoryTable {
    descriptor: TableDescriptor,
    rows: Vec<Row>,
    primary_keys: HashSet<Vec<KeyValue>>,
}

impl MemoryTable {
    fn column_keys(&self, column: usize) -> HashSet<KeyValue> {
        self.rows
            .iter()
            .filter_map(|row| row.get_value(column).and_then(|v| v.key()))
            .collect()
    }
}

/// In-memory relational store
#[derive(Debug, Default)]
pub struct MemoryRelationalStore {
    tables: BTreeMap<String, MemoryTable>,
    constraints: BTreeMap<String, (String, ForeignKey)>,
}

impl MemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows stored in a table
    pub fn rows(&self, table: &str) -> Option<&[Row]> {
        self.tables.get(table).map(|t| t.rows.as_slice())
    }

    /// Number of rows stored in a table (0 for unknown tables)
    pub fn row_count(&self, table: &str) -> usize {
        self.rows(table).map_or(0, <[Row]>::len)
    }

    /// Names of the tables created so far
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Names of the constraints added so far
    pub fn constraint_names(&self) -> Vec<&str> {
        self.constraints.keys().map(String::as_str).collect()
    }

    fn table(&self, name: &str) -> Result<&MemoryTable> {
        self.tables
            .get(name)
            .ok_or_else(|| EtlError::Store(format!("relation {} does not exist", name)))
    }

    fn column(table: &MemoryTable, column: &str) -> Result<usize> {
        table.descriptor.column_index(column).ok_or_else(|| {
            EtlError::Store(format!(
                "column {} of relation {} does not exist",
                column, table.descriptor.name
            ))
        })
    }
}

#[async_trait]
impl RelationalStore for MemoryRelationalStore {
    async fn create_table(&mut self, table: &TableDescriptor) -> Result<()> {
        self.tables
            .entry(table.name.clone())
            .or_insert_with(|| MemoryTable {
                descriptor: table.clone(),
                rows: Vec::new(),
                primary_keys: HashSet::new(),
            });
        Ok(())
    }

    async fn add_foreign_key(&mut self, table: &str, fk: &ForeignKey) -> Result<ConstraintOutcome> {
        let name = constraint_name(table, fk);
        if self.constraints.contains_key(&name) {
            return Ok(ConstraintOutcome::AlreadyExists);
        }

        let dependent = self.table(table)?;
        Self::column(dependent, &fk.column)?;
        let referent = self.table(&fk.ref_table)?;
        let ref_index = Self::column(referent, &fk.ref_column)?;
        if referent.descriptor.primary_key_indices() != vec![ref_index] {
            return Err(EtlError::Store(format!(
                "there is no unique constraint matching given keys for referenced table {}",
                fk.ref_table
            )));
        }

        self.constraints
            .insert(name, (table.to_string(), fk.clone()));
        Ok(ConstraintOutcome::Added)
    }

    async fn fetch_keys(&mut self, table: &TableDescriptor, column: &str) -> Result<HashSet<KeyValue>> {
        let stored = self.table(&table.name)?;
        let index = Self::column(stored, column)?;
        Ok(stored.column_keys(index))
    }

    async fn insert_rows(&mut self, table: &TableDescriptor, rows: &[&Row]) -> Result<u64> {
        let stored = self.table(&table.name)?;
        let width = stored.descriptor.columns.len();
        let pk_indices = stored.descriptor.primary_key_indices();

        let mut checks = Vec::new();
        for (name, (owner, fk)) in &self.constraints {
            if owner != &table.name {
                continue;
            }
            let referent = self.table(&fk.ref_table)?;
            let ref_index = Self::column(referent, &fk.ref_column)?;
            checks.push((
                name.as_str(),
                Self::column(stored, &fk.column)?,
                referent.column_keys(ref_index),
            ));
        }

        let mut staged_keys = HashSet::new();
        let mut staged = Vec::new();
        for row in rows {
            if row.values.len() != width {
                return Err(EtlError::Store(format!(
                    "row has {} values but {} has {} columns",
                    row.values.len(),
                    table.name,
                    width
                )));
            }

            if !pk_indices.is_empty() {
                let key = pk_indices
                    .iter()
                    .map(|&i| row.values[i].key())
                    .collect::<Option<Vec<KeyValue>>>()
                    .ok_or_else(|| {
                        EtlError::Store(format!("null value in primary key of {}", table.name))
                    })?;
                if stored.primary_keys.contains(&key) || !staged_keys.insert(key.clone()) {
                    continue;
                }
                staged.push((Some(key), (*row).clone()));
            } else {
                staged.push((None, (*row).clone()));
            }

            for (name, index, referent_keys) in &checks {
                if let Some(key) = row.values[*index].key() {
                    if !referent_keys.contains(&key) {
                        return Err(EtlError::Store(format!(
                            "insert into {} violates foreign key constraint {}",
                            table.name, name
                        )));
                    }
                }
            }
        }

        let inserted = staged.len() as u64;
        if let Some(stored) = self.tables.get_mut(&table.name) {
            for (key, row) in staged {
                if let Some(key) = key {
                    stored.primary_keys.insert(key);
                }
                stored.rows.push(row);
            }
        }
        Ok(inserted)
    }
}

/// In-memory document store
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: BTreeMap<String, Vec<Row>>,
    failing: HashSet<String>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents stored in a collection
    pub fn documents(&self, collection: &str) -> Option<&[Row]> {
        self.collections.get(collection).map(|docs| docs.as_slice())
    }

    /// Number of documents in a collection (0 for unknown collections)
    pub fn document_count(&self, collection: &str) -> usize {
        self.documents(collection).map_or(0, <[Row]>::len)
    }

    /// Make every insert into `collection` fail
    pub fn fail_collection(&mut self, collection: &str) {
        self.failing.insert(collection.to_string());
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_table(&mut self, table: &Table) -> Result<u64> {
        if self.failing.contains(&table.name) {
            return Err(EtlError::Store(format!(
                "insert into collection {} rejected",
                table.name
            )));
        }
        self.collections
            .entry(table.name.clone())
            .or_default()
            .extend(table.rows.iter().cloned());
        Ok(table.rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PrimaryKey;
    use crate::types::{SqlType, Value};

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn items() -> TableDescriptor {
        TableDescriptor {
            name: "items".to_string(),
            columns: vec![
                ("order_id".to_string(), SqlType::Varchar),
                ("order_item_id".to_string(), SqlType::Int),
            ],
            primary_key: Some(PrimaryKey::Composite(vec![
                "order_id".to_string(),
                "order_item_id".to_string(),
            ])),
            foreign_keys: vec![],
        }
    }

    #[tokio::test]
    async fn test_composite_key_conflict_is_noop() {
        let mut store = MemoryRelationalStore::new();
        store.create_table(&items()).await.unwrap();

        let row = Row::new(vec![text("o1"), Value::Integer(1)]);
        assert_eq!(store.insert_rows(&items(), &[&row]).await.unwrap(), 1);
        assert_eq!(store.insert_rows(&items(), &[&row]).await.unwrap(), 0);

        let other = Row::new(vec![text("o1"), Value::Integer(2)]);
        assert_eq!(store.insert_rows(&items(), &[&other, &other]).await.unwrap(), 1);
        assert_eq!(store.row_count("items"), 2);
    }

    #[tokio::test]
    async fn test_create_table_if_not_exists() {
        let mut store = MemoryRelationalStore::new();
        store.create_table(&items()).await.unwrap();
        let row = Row::new(vec![text("o1"), Value::Integer(1)]);
        store.insert_rows(&items(), &[&row]).await.unwrap();

        store.create_table(&items()).await.unwrap();
        assert_eq!(store.row_count("items"), 1);
    }

    #[tokio::test]
    async fn test_null_primary_key_rejected() {
        let mut store = MemoryRelationalStore::new();
        store.create_table(&items()).await.unwrap();
        let row = Row::new(vec![Value::Null, Value::Integer(1)]);
        assert!(store.insert_rows(&items(), &[&row]).await.is_err());
        assert_eq!(store.row_count("items"), 0);
    }

    #[tokio::test]
    async fn test_enforces_foreign_key_atomically() {
        let orders = TableDescriptor {
            name: "orders".to_string(),
            columns: vec![("order_id".to_string(), SqlType::Varchar)],
            primary_key: Some(PrimaryKey::Single("order_id".to_string())),
            foreign_keys: vec![],
        };
        let mut store = MemoryRelationalStore::new();
        store.create_table(&orders).await.unwrap();
        store.create_table(&items()).await.unwrap();
        store
            .insert_rows(&orders, &[&Row::new(vec![text("o1")])])
            .await
            .unwrap();
        let fk = ForeignKey::new("order_id", "orders", "order_id");
        assert_eq!(
            store.add_foreign_key("items", &fk).await.unwrap(),
            ConstraintOutcome::Added
        );

        let good = Row::new(vec![text("o1"), Value::Integer(1)]);
        let bad = Row::new(vec![text("o9"), Value::Integer(1)]);
        assert!(store.insert_rows(&items(), &[&good, &bad]).await.is_err());
        assert_eq!(store.row_count("items"), 0);

        let keys = store.fetch_keys(&orders, "order_id").await.unwrap();
        assert!(keys.contains(&KeyValue::Text("o1".to_string())));
    }

    #[tokio::test]
    async fn test_foreign_key_needs_unique_referent() {
        let mut store = MemoryRelationalStore::new();
        store.create_table(&items()).await.unwrap();
        let fk = ForeignKey::new("order_id", "items", "order_id");
        assert!(store.add_foreign_key("items", &fk).await.is_err());
        assert!(store.constraint_names().is_empty());
    }

    #[tokio::test]
    async fn test_document_store_appends() {
        let mut table = Table::new("sellers".to_string(), vec![]);
        table.rows.push(Row::new(vec![text("s1")]));

        let mut store = MemoryDocumentStore::new();
        assert_eq!(store.insert_table(&table).await.unwrap(), 1);
        assert_eq!(store.insert_table(&table).await.unwrap(), 1);
        assert_eq!(store.document_count("sellers"), 2);

        store.fail_collection("sellers");
        assert!(store.insert_table(&table).await.is_err());
        assert_eq!(store.document_count("sellers"), 2);
    }
}
