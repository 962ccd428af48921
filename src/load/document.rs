//! Document loader
//!
//! Dumps every table, unfiltered, into its collection. A failed collection
//! is reported and the remaining tables are still loaded.

use crate::dataset::Dataset;
use crate::load::CollectionReport;
use crate::store::DocumentStore;

/// Inserts whole tables through a document store
pub struct DocumentLoader<'a, S: DocumentStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: DocumentStore + ?Sized> DocumentLoader<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Load every table of the dataset, in dataset order
    pub async fn load_all(&mut self, dataset: &Dataset) -> Vec<CollectionReport> {
        let mut reports = Vec::with_capacity(dataset.len());
        for table in dataset.tables() {
            if table.rows.is_empty() {
                log::info!("collection {} skipped: no rows", table.name);
                reports.push(CollectionReport::inserted(&table.name, 0));
                continue;
            }

            match self.store.insert_table(table).await {
                Ok(inserted) => {
                    log::info!("inserted {} documents into {}", inserted, table.name);
                    reports.push(CollectionReport::inserted(&table.name, inserted));
                }
                Err(err) => {
                    log::error!("collection {} failed: {}", table.name, err);
                    reports.push(CollectionReport::failed(&table.name, err.to_string()));
                }
            }
        }
        reports
    }
}
