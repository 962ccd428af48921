//! Loaders and their reports
//!
//! - `relational`: constrained and unconstrained inserts
//! - `document`: raw collection dumps

pub mod document;
pub mod relational;

pub use document::DocumentLoader;
pub use relational::RelationalLoader;

use serde::Serialize;

/// Outcome of loading one table into the relational store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableLoadReport {
    pub table: String,

    /// Rows in the source table
    pub rows_read: usize,

    /// Rows actually stored by this run
    pub inserted: u64,

    /// Rows skipped because their primary key was already present
    pub duplicates: u64,

    /// Rows skipped because a referenced value was missing
    pub dropped_missing_reference: usize,

    /// Rows skipped because a primary-key cell was empty
    pub dropped_null_key: usize,
}

impl TableLoadReport {
    pub fn new(
        table: &str,
        rows_read: usize,
        inserted: u64,
        dropped_missing_reference: usize,
        dropped_null_key: usize,
    ) -> Self {
        let attempted = rows_read.saturating_sub(dropped_missing_reference + dropped_null_key) as u64;
        Self {
            table: table.to_string(),
            rows_read,
            inserted,
            duplicates: attempted.saturating_sub(inserted),
            dropped_missing_reference,
            dropped_null_key,
        }
    }
}

/// Outcome of loading one table into the document store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub collection: String,
    pub inserted: u64,
    pub error: Option<String>,
}

impl CollectionReport {
    pub fn inserted(collection: &str, inserted: u64) -> Self {
        Self {
            collection: collection.to_string(),
            inserted,
            error: None,
        }
    }

    pub fn failed(collection: &str, error: String) -> Self {
        Self {
            collection: collection.to_string(),
            inserted: 0,
            error: Some(error),
        }
    }
}
