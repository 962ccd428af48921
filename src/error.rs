//! Error types
//!
//! Every fatal condition of a run is an [`EtlError`]. Conditions the loader
//! recovers from (existing constraints, duplicate keys, missing referents,
//! failed collection batches) are reported through the load reports instead.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, EtlError>;

/// Fatal loader errors
#[derive(Error, Debug)]
pub enum EtlError {
    /// A source file could not be opened or read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source file is not well-formed CSV
    #[error("malformed CSV in {name}: {source}")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },

    /// A source file has no header row
    #[error("source {0} is empty")]
    EmptySource(String),

    /// The key catalog is inconsistent with itself or with the dataset
    #[error("invalid catalog: {0}")]
    Config(String),

    /// A configured key column does not exist in its table
    #[error("table {table} has no column {column}")]
    MissingColumn { table: String, column: String },

    /// A table referenced by the load was never loaded or created
    #[error("unknown table {0}")]
    UnknownTable(String),

    /// Relational store failure
    #[error("postgres: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Document store failure
    #[error("mongodb: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// Contract violation inside the in-memory stores
    #[error("store: {0}")]
    Store(String),
}
