//! Destination stores
//!
//! The loaders talk to the two destinations through [`RelationalStore`] and
//! [`DocumentStore`]:
//! - `postgres`: PostgreSQL over one `sqlx` connection
//! - `mongo`: MongoDB through the official driver
//! - `memory`: in-process stores with the same semantics, used by
//!   `load --dry-run` and the tests

pub mod memory;
pub mod mongo;
pub mod postgres;

pub use memory::{MemoryDocumentStore, MemoryRelationalStore};
pub use mongo::MongoStore;
pub use postgres::PostgresStore;

use crate::catalog::ForeignKey;
use crate::error::Result;
use crate::schema::{ConstraintOutcome, TableDescriptor};
use crate::types::{KeyValue, Row, Table};
use async_trait::async_trait;
use std::collections::HashSet;

/// Relational destination
#[async_trait]
pub trait RelationalStore: Send {
    /// Create the table unless it already exists
    async fn create_table(&mut self, table: &TableDescriptor) -> Result<()>;

    /// Add a foreign-key constraint to `table`
    ///
    /// An existing constraint of the same name is reported as
    /// [`ConstraintOutcome::AlreadyExists`] and leaves the store unchanged.
    async fn add_foreign_key(&mut self, table: &str, fk: &ForeignKey) -> Result<ConstraintOutcome>;

    /// Distinct non-null values currently stored in `table.column`
    async fn fetch_keys(&mut self, table: &TableDescriptor, column: &str) -> Result<HashSet<KeyValue>>;

    /// Insert rows, skipping primary-key conflicts, and commit them together
    ///
    /// # Returns
    /// Number of rows actually inserted
    async fn insert_rows(&mut self, table: &TableDescriptor, rows: &[&Row]) -> Result<u64>;
}

/// Document destination
#[async_trait]
pub trait DocumentStore: Send {
    /// Insert every row of `table` into the like-named collection
    ///
    /// # Returns
    /// Number of documents inserted
    async fn insert_table(&mut self, table: &Table) -> Result<u64>;
}
