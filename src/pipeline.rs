//! Load pipeline
//!
//! Runs the phases in their required order:
//! 1. create every table
//! 2. add every foreign-key constraint
//! 3. insert unconstrained tables, then dependent tables after their referents
//! 4. dump every table into the document store
//!
//! # Example
//!
//! ```no_run
//! use olist_etl::config::LoadConfig;
//! use olist_etl::pipeline::Pipeline;
//! use olist_etl::store::{MemoryDocumentStore, MemoryRelationalStore};
//!
//! # async fn run() -> olist_etl::Result<()> {
//! let pipeline = Pipeline::from_config(&LoadConfig::default())?;
//! let report = pipeline
//!     .run(&mut MemoryRelationalStore::new(), &mut MemoryDocumentStore::new())
//!     .await?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

use crate::catalog::{Catalog, LoadPlan};
use crate::config::LoadConfig;
use crate::dataset::{DataLoader, Dataset};
use crate::error::{EtlError, Result};
use crate::load::{CollectionReport, DocumentLoader, RelationalLoader, TableLoadReport};
use crate::schema::{add_constraint_sql, AppliedConstraint, ConstraintApplier, TableDescriptor};
use crate::store::{DocumentStore, RelationalStore};
use crate::utils::Helpers;
use serde::Serialize;
use std::fmt;
use std::time::Instant;

/// Result of a full run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub constraints: Vec<AppliedConstraint>,
    pub tables: Vec<TableLoadReport>,
    pub collections: Vec<CollectionReport>,
}

impl RunReport {
    /// Relational report of a table
    pub fn table(&self, name: &str) -> Option<&TableLoadReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    /// Document report of a collection
    pub fn collection(&self, name: &str) -> Option<&CollectionReport> {
        self.collections.iter().find(|c| c.collection == name)
    }

    /// Collections whose batch insert failed
    pub fn failed_collections(&self) -> Vec<&CollectionReport> {
        self.collections.iter().filter(|c| c.error.is_some()).collect()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<40} {:>9} {:>9} {:>10} {:>8} {:>9} {:>10}",
            "table", "read", "inserted", "duplicate", "dropped", "null key", "documents"
        )?;
        for table in &self.tables {
            let documents = match self.collection(&table.table) {
                Some(c) if c.error.is_some() => "failed".to_string(),
                Some(c) => c.inserted.to_string(),
                None => "-".to_string(),
            };
            writeln!(
                f,
                "{:<40} {:>9} {:>9} {:>10} {:>8} {:>9} {:>10}",
                table.table,
                table.rows_read,
                table.inserted,
                table.duplicates,
                table.dropped_missing_reference,
                table.dropped_null_key,
                documents
            )?;
        }
        Ok(())
    }
}

/// A loaded dataset with its derived schema and load order
#[derive(Debug, Clone)]
pub struct Pipeline {
    dataset: Dataset,
    descriptors: Vec<TableDescriptor>,
    plan: LoadPlan,
}

impl Pipeline {
    /// Load the configured source files and prepare the pipeline
    ///
    /// The catalog is validated before any file is read.
    pub fn from_config(config: &LoadConfig) -> Result<Self> {
        config.catalog.validate()?;
        let dataset = DataLoader::new()
            .with_delimiter(config.delimiter)
            .load_all(&config.dataset_dir, &config.catalog.source_files)?;
        Self::from_validated(&config.catalog, dataset)
    }

    /// Derive descriptors and load order for an already loaded dataset
    ///
    /// The dataset must hold exactly the catalog's tables.
    pub fn new(catalog: &Catalog, dataset: Dataset) -> Result<Self> {
        catalog.validate()?;
        Self::from_validated(catalog, dataset)
    }

    fn from_validated(catalog: &Catalog, dataset: Dataset) -> Result<Self> {
        let names = catalog.table_names();
        for name in &names {
            dataset.require(name)?;
        }
        if let Some(extra) = dataset.tables().find(|t| !names.contains(&t.name)) {
            return Err(EtlError::Config(format!(
                "table {} is not in the catalog",
                extra.name
            )));
        }

        let descriptors = dataset
            .tables()
            .map(|table| TableDescriptor::from_table(table, catalog))
            .collect::<Result<Vec<_>>>()?;
        let plan = catalog.load_plan()?;

        Ok(Self {
            dataset,
            descriptors,
            plan,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn descriptors(&self) -> &[TableDescriptor] {
        &self.descriptors
    }

    pub fn plan(&self) -> &LoadPlan {
        &self.plan
    }

    /// Statements issued by the schema phases, in order
    pub fn ddl(&self) -> Vec<String> {
        let creates = self.descriptors.iter().map(TableDescriptor::create_table_sql);
        let constraints = self.descriptors.iter().flat_map(|d| {
            d.foreign_keys
                .iter()
                .map(move |fk| add_constraint_sql(&d.name, fk))
        });
        creates.chain(constraints).collect()
    }

    fn descriptor(&self, name: &str) -> Result<&TableDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| EtlError::UnknownTable(name.to_string()))
    }

    /// Create every table, then add every constraint
    pub async fn create_schema<R>(&self, store: &mut R) -> Result<Vec<AppliedConstraint>>
    where
        R: RelationalStore + ?Sized,
    {
        for descriptor in &self.descriptors {
            store.create_table(descriptor).await?;
            log::info!("table {} ready", descriptor.name);
        }
        ConstraintApplier::apply(store, &self.descriptors).await
    }

    /// Insert rows into the relational store, referents first
    pub async fn load_relational<R>(&self, store: &mut R) -> Result<Vec<TableLoadReport>>
    where
        R: RelationalStore + ?Sized,
    {
        let mut loader = RelationalLoader::new(store);
        let mut reports = Vec::with_capacity(self.descriptors.len());

        let order = self.plan.unconstrained.iter().chain(&self.plan.constrained);
        for name in order {
            let table = self.dataset.require(name)?;
            let descriptor = self.descriptor(name)?;
            let report = if descriptor.is_constrained() {
                loader
                    .load_constrained(descriptor, table, &self.descriptors)
                    .await?
            } else {
                loader.load_unconstrained(descriptor, table).await?
            };
            reports.push(report);
        }
        Ok(reports)
    }

    /// Dump every table into the document store
    pub async fn load_documents<D>(&self, store: &mut D) -> Vec<CollectionReport>
    where
        D: DocumentStore + ?Sized,
    {
        DocumentLoader::new(store).load_all(&self.dataset).await
    }

    /// Run every phase against both stores
    pub async fn run<R, D>(&self, relational: &mut R, documents: &mut D) -> Result<RunReport>
    where
        R: RelationalStore + ?Sized,
        D: DocumentStore + ?Sized,
    {
        let started = Instant::now();
        let constraints = self.create_schema(relational).await?;
        log::info!(
            "schema ready: {} tables, {} constraints ({})",
            self.descriptors.len(),
            constraints.len(),
            Helpers::format_duration_from(started.elapsed())
        );

        let phase = Instant::now();
        let tables = self.load_relational(relational).await?;
        log::info!(
            "relational store loaded ({})",
            Helpers::format_duration_from(phase.elapsed())
        );

        let phase = Instant::now();
        let collections = self.load_documents(documents).await;
        log::info!(
            "document store loaded ({})",
            Helpers::format_duration_from(phase.elapsed())
        );

        log::info!(
            "run finished in {}",
            Helpers::format_duration_from(started.elapsed())
        );
        Ok(RunReport {
            constraints,
            tables,
            collections,
        })
    }
}
