//! Schema builder
//!
//! Turns a loaded table and its catalog keys into a [`TableDescriptor`] and
//! the `CREATE TABLE` statement for it.
//!
//! # Example
//!
//! ```rust
//! use olist_etl::catalog::{Catalog, PrimaryKey};
//! use olist_etl::schema::TableDescriptor;
//! use olist_etl::types::{Column, DataType, Table};
//!
//! let table = Table::new(
//!     "sellers".to_string(),
//!     vec![Column::new("seller_id".to_string(), DataType::Text)],
//! );
//! let mut catalog = Catalog::olist();
//! catalog.source_files = vec!["sellers.csv".to_string()];
//! catalog.foreign_keys.clear();
//! catalog.primary_keys.clear();
//! catalog
//!     .primary_keys
//!     .insert("sellers".to_string(), PrimaryKey::Single("seller_id".to_string()));
//!
//! let descriptor = TableDescriptor::from_table(&table, &catalog)?;
//! assert_eq!(
//!     descriptor.create_table_sql(),
//!     r#"CREATE TABLE IF NOT EXISTS "sellers" ("seller_id" VARCHAR, PRIMARY KEY ("seller_id"))"#
//! );
//! # Ok::<(), olist_etl::EtlError>(())
//! ```

use crate::catalog::{Catalog, ForeignKey, PrimaryKey};
use crate::error::{EtlError, Result};
use crate::types::{DataType, SqlType, Table};
use crate::utils::Helpers;

/// SQL type for an inferred data type
///
/// Precedence: whole numbers, other numbers, date/time, then text for
/// everything else (booleans included).
pub fn sql_type_for(data_type: DataType) -> SqlType {
    match data_type {
        DataType::Integer => SqlType::Int,
        DataType::Float => SqlType::Numeric,
        DataType::DateTime => SqlType::Timestamp,
        DataType::Boolean | DataType::Text => SqlType::Varchar,
    }
}

/// Relational shape of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    /// Table name
    pub name: String,

    /// Column names and declared types, in source order
    pub columns: Vec<(String, SqlType)>,

    /// Primary key, if configured
    pub primary_key: Option<PrimaryKey>,

    /// Outgoing foreign keys
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableDescriptor {
    /// Derive the descriptor of a loaded table
    ///
    /// # Returns
    /// `Err(MissingColumn)` if a configured key column is not in the table
    pub fn from_table(table: &Table, catalog: &Catalog) -> Result<Self> {
        let descriptor = Self {
            name: table.name.clone(),
            columns: table
                .columns
                .iter()
                .map(|c| (c.name.clone(), sql_type_for(c.data_type)))
                .collect(),
            primary_key: catalog.primary_key(&table.name).cloned(),
            foreign_keys: catalog.foreign_keys(&table.name).to_vec(),
        };

        let key_columns = descriptor
            .primary_key
            .iter()
            .flat_map(|k| k.columns())
            .chain(descriptor.foreign_keys.iter().map(|fk| fk.column.as_str()));
        for column in key_columns {
            if descriptor.column_type(column).is_none() {
                return Err(EtlError::MissingColumn {
                    table: descriptor.name.clone(),
                    column: column.to_string(),
                });
            }
        }

        Ok(descriptor)
    }

    /// Declared type of a column
    pub fn column_type(&self, column: &str) -> Option<SqlType> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, sql_type)| *sql_type)
    }

    /// Position of a column
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|(name, _)| name == column)
    }

    /// Positions of the primary key columns, empty when there is no key
    pub fn primary_key_indices(&self) -> Vec<usize> {
        self.primary_key
            .iter()
            .flat_map(|k| k.columns())
            .filter_map(|column| self.column_index(column))
            .collect()
    }

    /// Whether rows of this table are gated on referent rows
    pub fn is_constrained(&self) -> bool {
        !self.foreign_keys.is_empty()
    }

    /// `CREATE TABLE IF NOT EXISTS` statement
    pub fn create_table_sql(&self) -> String {
        let mut defs: Vec<String> = self
            .columns
            .iter()
            .map(|(name, sql_type)| format!("{} {}", Helpers::quote_ident(name), sql_type))
            .collect();

        if let Some(key) = &self.primary_key {
            let key_columns: Vec<String> =
                key.columns().into_iter().map(Helpers::quote_ident).collect();
            defs.push(format!("PRIMARY KEY ({})", key_columns.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            Helpers::quote_ident(&self.name),
            defs.join(", ")
        )
    }

    /// `INSERT ... ON CONFLICT DO NOTHING` statement with `$n` placeholders
    pub fn insert_sql(&self) -> String {
        let names: Vec<String> = self
            .columns
            .iter()
            .map(|(name, _)| Helpers::quote_ident(name))
            .collect();
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("${}", i)).collect();

        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT DO NOTHING",
            Helpers::quote_ident(&self.name),
            names.join(", "),
            placeholders.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DependentTable;
    use crate::types::Column;
    use std::collections::BTreeMap;

    fn items_table() -> Table {
        Table::new(
            "items".to_string(),
            vec![
                Column::new("order_id".to_string(), DataType::Text),
                Column::new("order_item_id".to_string(), DataType::Integer),
                Column::new("price".to_string(), DataType::Float),
                Column::new("shipping_limit_date".to_string(), DataType::DateTime),
                Column::new("gift".to_string(), DataType::Boolean),
            ],
        )
    }

    fn catalog(primary_key: Option<PrimaryKey>) -> Catalog {
        let mut primary_keys = BTreeMap::new();
        if let Some(key) = primary_key {
            primary_keys.insert("items".to_string(), key);
        }
        Catalog {
            source_files: vec!["items.csv".to_string(), "orders.csv".to_string()],
            primary_keys,
            foreign_keys: vec![DependentTable {
                table: "items".to_string(),
                references: vec![ForeignKey::new("order_id", "orders", "order_id")],
            }],
        }
    }

    #[test]
    fn test_sql_type_precedence() {
        assert_eq!(sql_type_for(DataType::Integer), SqlType::Int);
        assert_eq!(sql_type_for(DataType::Float), SqlType::Numeric);
        assert_eq!(sql_type_for(DataType::DateTime), SqlType::Timestamp);
        assert_eq!(sql_type_for(DataType::Boolean), SqlType::Varchar);
        assert_eq!(sql_type_for(DataType::Text), SqlType::Varchar);
    }

    #[test]
    fn test_descriptor_matches_source_columns() {
        let table = items_table();
        let descriptor = TableDescriptor::from_table(&table, &catalog(None)).unwrap();

        assert_eq!(descriptor.columns.len(), table.num_columns());
        for (column, (name, sql_type)) in table.columns.iter().zip(&descriptor.columns) {
            assert_eq!(&column.name, name);
            assert_eq!(sql_type_for(column.data_type), *sql_type);
        }
        assert!(descriptor.is_constrained());
    }

    #[test]
    fn test_create_table_composite_key() {
        let key = PrimaryKey::Composite(vec!["order_id".to_string(), "order_item_id".to_string()]);
        let descriptor = TableDescriptor::from_table(&items_table(), &catalog(Some(key))).unwrap();

        assert_eq!(
            descriptor.create_table_sql(),
            "CREATE TABLE IF NOT EXISTS \"items\" (\"order_id\" VARCHAR, \"order_item_id\" INT, \
             \"price\" NUMERIC, \"shipping_limit_date\" TIMESTAMP, \"gift\" VARCHAR, \
             PRIMARY KEY (\"order_id\", \"order_item_id\"))"
        );
        assert_eq!(descriptor.primary_key_indices(), vec![0, 1]);
    }

    #[test]
    fn test_create_table_without_key() {
        let descriptor = TableDescriptor::from_table(&items_table(), &catalog(None)).unwrap();
        let sql = descriptor.create_table_sql();

        assert!(!sql.contains("PRIMARY KEY"));
        assert!(descriptor.primary_key_indices().is_empty());
    }

    #[test]
    fn test_missing_key_column() {
        let key = PrimaryKey::Single("item_id".to_string());
        let err = TableDescriptor::from_table(&items_table(), &catalog(Some(key))).unwrap_err();
        assert!(matches!(err, EtlError::MissingColumn { column, .. } if column == "item_id"));
    }

    #[test]
    fn test_insert_sql() {
        let table = Table::new(
            "sellers".to_string(),
            vec![
                Column::new("seller_id".to_string(), DataType::Text),
                Column::new("zip".to_string(), DataType::Integer),
            ],
        );
        let mut catalog = catalog(None);
        catalog.source_files.push("sellers.csv".to_string());
        let descriptor = TableDescriptor::from_table(&table, &catalog).unwrap();

        assert_eq!(
            descriptor.insert_sql(),
            "INSERT INTO \"sellers\" (\"seller_id\", \"zip\") VALUES ($1, $2) ON CONFLICT DO NOTHING"
        );
        assert!(!descriptor.is_constrained());
    }
}
