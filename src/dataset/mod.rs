//! Source dataset module
//!
//! This module reads the source files into memory and holds them for the
//! rest of the run.
//!
//! The dataset module consists of:
//! - `loader`: CSV reading
//! - `inference`: per-column type inference and cell coercion
//!
//! A [`Dataset`] is built once by the loader and read-only afterwards.

pub mod inference;
pub mod loader;

pub use loader::DataLoader;

use crate::error::{EtlError, Result};
use crate::types::Table;

/// Loaded tables, in source file order
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    tables: Vec<Table>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table
    ///
    /// # Returns
    /// `Err` if a table with the same name was already loaded
    pub fn insert(&mut self, table: Table) -> Result<()> {
        if self.get(&table.name).is_some() {
            return Err(EtlError::Config(format!(
                "table {} is loaded twice",
                table.name
            )));
        }
        self.tables.push(table);
        Ok(())
    }

    /// Get a table by name
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Get a table by name, failing on unknown names
    pub fn require(&self, name: &str) -> Result<&Table> {
        self.get(name)
            .ok_or_else(|| EtlError::UnknownTable(name.to_string()))
    }

    /// Iterate over tables in load order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    /// Table names in load order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no table was loaded
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<Table> for Dataset {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, DataType};

    fn table(name: &str) -> Table {
        Table::new(
            name.to_string(),
            vec![Column::new("id".to_string(), DataType::Text)],
        )
    }

    #[test]
    fn test_dataset_preserves_order() {
        let mut dataset = Dataset::new();
        dataset.insert(table("b")).unwrap();
        dataset.insert(table("a")).unwrap();
        assert_eq!(dataset.table_names(), vec!["b", "a"]);
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn test_dataset_rejects_duplicates() {
        let mut dataset = Dataset::new();
        dataset.insert(table("a")).unwrap();
        assert!(dataset.insert(table("a")).is_err());
    }

    #[test]
    fn test_dataset_require() {
        let dataset: Dataset = vec![table("a")].into_iter().collect();
        assert!(dataset.require("a").is_ok());
        assert!(matches!(
            dataset.require("z"),
            Err(EtlError::UnknownTable(_))
        ));
    }
}
