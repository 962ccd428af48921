//! Data loader
//!
//! This module reads the CSV source files into in-memory tables.
//!
//! # Example
//!
//! ```no_run
//! use olist_etl::dataset::DataLoader;
//!
//! let loader = DataLoader::new();
//! let dataset = loader.load_all("/app/dataset", &["olist_sellers_dataset.csv".to_string()])?;
//! assert!(dataset.get("olist_sellers_dataset").is_some());
//! # Ok::<(), olist_etl::EtlError>(())
//! ```

use crate::config::DEFAULT_DELIMITER;
use crate::dataset::inference::{coerce, infer_data_type};
use crate::dataset::Dataset;
use crate::error::{EtlError, Result};
use crate::types::{Column, Row, Table};
use crate::utils::Helpers;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Data loader
///
/// Reads header-first CSV files. Any unreadable or malformed file is fatal.
#[derive(Debug, Clone)]
pub struct DataLoader {
    delimiter: u8,
}

impl DataLoader {
    /// Create a new comma-delimited data loader
    pub fn new() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
        }
    }

    /// Use a different field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load every file, in order, from `base_path`
    ///
    /// Tables are keyed by the file name without its extension.
    pub fn load_all<P: AsRef<Path>>(&self, base_path: P, files: &[String]) -> Result<Dataset> {
        let mut dataset = Dataset::new();
        for file in files {
            let path = base_path.as_ref().join(file);
            let table = self.load_csv(&path)?;
            log::info!(
                "loaded {} -> {} ({} rows)",
                file,
                table.name,
                table.num_rows()
            );
            dataset.insert(table)?;
        }
        Ok(dataset)
    }

    /// Load one CSV file into a table named after the file stem
    pub fn load_csv(&self, path: &Path) -> Result<Table> {
        let name = Helpers::table_name_for(path);
        let file = File::open(path).map_err(|source| EtlError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_reader(&name, file)
    }

    /// Load CSV data from any reader
    pub fn load_reader<R: Read>(&self, name: &str, reader: R) -> Result<Table> {
        let csv_error = |source: csv::Error| EtlError::Csv {
            name: name.to_string(),
            source,
        };

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Err(EtlError::EmptySource(name.to_string()));
        }

        let records = reader
            .records()
            .collect::<std::result::Result<Vec<StringRecord>, _>>()
            .map_err(csv_error)?;

        let columns: Vec<Column> = headers
            .into_iter()
            .enumerate()
            .map(|(index, header)| {
                let data_type =
                    infer_data_type(records.iter().map(|r| r.get(index).unwrap_or("")));
                Column::new(header, data_type)
            })
            .collect();

        let mut table = Table::new(name.to_string(), columns);
        table.rows = records
            .iter()
            .map(|record| {
                Row::new(
                    record
                        .iter()
                        .zip(&table.columns)
                        .map(|(cell, column)| coerce(cell, column.data_type))
                        .collect(),
                )
            })
            .collect();

        Ok(table)
    }
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}
