//! olist_etl: one-shot loader of the Olist e-commerce CSV datasets
//!
//! This library reads the Olist CSV files, infers a relational schema from
//! them, and loads them into PostgreSQL (with primary and foreign keys) and
//! into MongoDB (raw documents, one collection per file).
//!
//! # Example
//!
//! ```no_run
//! use olist_etl::config::LoadConfig;
//! use olist_etl::pipeline::Pipeline;
//! use olist_etl::store::{MongoStore, PostgresStore};
//!
//! # async fn run() -> olist_etl::Result<()> {
//! let config = LoadConfig::default();
//! let pipeline = Pipeline::from_config(&config)?;
//!
//! let mut postgres = PostgresStore::connect(&config.postgres_url).await?;
//! let mut mongo = MongoStore::connect(&config.mongo_url, &config.mongo_database).await?;
//! let report = pipeline.run(&mut postgres, &mut mongo).await?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

/// olist_etl version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Main modules
pub mod error;
pub mod types;

pub mod catalog;
pub mod config;
pub mod dataset;
pub mod load;
pub mod pipeline;
pub mod schema;
pub mod store;
pub mod utils;

// Re-export main types for convenience
pub use catalog::Catalog;
pub use error::{EtlError, Result};
pub use pipeline::{Pipeline, RunReport};
