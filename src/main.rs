//! olist_etl CLI
//!
//! Command-line interface for loading the Olist datasets.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use olist_etl::config::{
    LoadConfig, DEFAULT_DATASET_DIR, DEFAULT_MONGO_DATABASE, DEFAULT_MONGO_URL,
    DEFAULT_POSTGRES_URL,
};
use olist_etl::store::{MemoryDocumentStore, MemoryRelationalStore, MongoStore, PostgresStore};
use olist_etl::utils::Logger;
use olist_etl::{Pipeline, RunReport};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "olist_etl")]
#[command(about = "Load the Olist e-commerce datasets into PostgreSQL and MongoDB", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Directory containing the CSV files
    #[arg(short, long, env = "OLIST_DATASET_DIR", default_value = DEFAULT_DATASET_DIR)]
    dataset_dir: PathBuf,

    /// Field delimiter of the CSV files
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// JSON catalog replacing the built-in Olist key configuration
    #[arg(short, long)]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every dataset into both stores
    Load {
        #[command(flatten)]
        source: SourceArgs,

        /// PostgreSQL connection URL
        #[arg(long, env = "OLIST_POSTGRES_URL", default_value = DEFAULT_POSTGRES_URL)]
        postgres_url: String,

        /// MongoDB connection string
        #[arg(long, env = "OLIST_MONGO_URL", default_value = DEFAULT_MONGO_URL)]
        mongo_url: String,

        /// MongoDB database name
        #[arg(long, env = "OLIST_MONGO_DB", default_value = DEFAULT_MONGO_DATABASE)]
        mongo_db: String,

        /// Run against in-memory stores instead of the servers
        #[arg(long)]
        dry_run: bool,

        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the DDL the load would issue
    Ddl {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the table load order
    Plan {
        #[command(flatten)]
        source: SourceArgs,
    },
}

impl SourceArgs {
    fn config(&self) -> anyhow::Result<LoadConfig> {
        let delimiter = u8::try_from(self.delimiter)
            .map_err(|_| anyhow::anyhow!("delimiter must be a single-byte character"))?;
        let config = LoadConfig {
            dataset_dir: self.dataset_dir.clone(),
            delimiter,
            ..LoadConfig::default()
        };
        match &self.catalog {
            Some(path) => config
                .with_catalog_file(path)
                .with_context(|| format!("loading catalog {}", path.display())),
            None => Ok(config),
        }
    }
}

fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    Logger::init_with_level(Logger::level_for_verbosity(cli.verbose));

    match cli.command {
        Commands::Load {
            source,
            postgres_url,
            mongo_url,
            mongo_db,
            dry_run,
            json,
        } => {
            let config = LoadConfig {
                postgres_url,
                mongo_url,
                mongo_database: mongo_db,
                ..source.config()?
            };
            let pipeline = Pipeline::from_config(&config).context("loading datasets")?;

            let report = if dry_run {
                log::info!("dry run: loading into in-memory stores");
                let mut relational = MemoryRelationalStore::new();
                let mut documents = MemoryDocumentStore::new();
                pipeline.run(&mut relational, &mut documents).await?
            } else {
                log::info!("connecting to PostgreSQL");
                let mut postgres = PostgresStore::connect(&config.postgres_url)
                    .await
                    .context("connecting to PostgreSQL")?;
                log::info!("connecting to MongoDB");
                let mut mongo = MongoStore::connect(&config.mongo_url, &config.mongo_database)
                    .await
                    .context("connecting to MongoDB")?;

                let report = pipeline.run(&mut postgres, &mut mongo).await?;
                postgres.close().await?;
                mongo.close().await;
                report
            };

            print_report(&report, json)?;
            let failed = report.failed_collections();
            if !failed.is_empty() {
                bail!("{} collection(s) failed to load", failed.len());
            }
            log::info!("ETL finished");
        }
        Commands::Ddl { source } => {
            let pipeline = Pipeline::from_config(&source.config()?)?;
            for statement in pipeline.ddl() {
                println!("{};", statement);
            }
        }
        Commands::Plan { source } => {
            let config = source.config()?;
            config.catalog.validate()?;
            let plan = config.catalog.load_plan()?;
            for table in &plan.unconstrained {
                println!("{}", table);
            }
            for table in &plan.constrained {
                let references: Vec<String> = config
                    .catalog
                    .foreign_keys(table)
                    .iter()
                    .map(|fk| format!("{}.{}", fk.ref_table, fk.ref_column))
                    .collect();
                println!("{} -> {}", table, references.join(", "));
            }
        }
    }

    Ok(())
}
