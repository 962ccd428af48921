//! Key catalog
//!
//! The catalog names the source files and the keys of every table. Keys are
//! configuration, never inferred from data. The built-in [`Catalog::olist`]
//! describes the Olist e-commerce dataset; [`Catalog::from_path`] reads the
//! same structure from JSON.
//!
//! ```json
//! {
//!   "source_files": ["sellers.csv", "orders.csv"],
//!   "primary_keys": { "sellers": "seller_id", "orders": ["order_id", "seller_id"] },
//!   "foreign_keys": [
//!     { "table": "orders",
//!       "references": [{ "column": "seller_id", "ref_table": "sellers", "ref_column": "seller_id" }] }
//!   ]
//! }
//! ```

use crate::error::{EtlError, Result};
use crate::utils::Helpers;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Primary key definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    /// One column
    Single(String),

    /// Ordered column list
    Composite(Vec<String>),
}

impl PrimaryKey {
    /// Key columns in declaration order
    pub fn columns(&self) -> Vec<&str> {
        match self {
            PrimaryKey::Single(column) => vec![column.as_str()],
            PrimaryKey::Composite(columns) => columns.iter().map(String::as_str).collect(),
        }
    }
}

/// Outgoing foreign-key reference of a dependent table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Column in the dependent table
    pub column: String,

    /// Referent table
    pub ref_table: String,

    /// Column in the referent table
    pub ref_column: String,
}

impl ForeignKey {
    pub fn new(column: &str, ref_table: &str, ref_column: &str) -> Self {
        Self {
            column: column.to_string(),
            ref_table: ref_table.to_string(),
            ref_column: ref_column.to_string(),
        }
    }
}

/// A dependent table and its foreign keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentTable {
    pub table: String,
    pub references: Vec<ForeignKey>,
}

/// Order in which tables receive rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    /// Tables without foreign keys, in source order
    pub unconstrained: Vec<String>,

    /// Dependent tables, each after all of its referents
    pub constrained: Vec<String>,
}

/// Source files and key configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Source file names, in load order
    pub source_files: Vec<String>,

    /// Primary key per table; tables without an entry get no key
    #[serde(default)]
    pub primary_keys: BTreeMap<String, PrimaryKey>,

    /// Foreign keys per dependent table, in constraint order
    #[serde(default)]
    pub foreign_keys: Vec<DependentTable>,
}

impl Catalog {
    /// The Olist e-commerce dataset
    pub fn olist() -> Self {
        fn single(column: &str) -> PrimaryKey {
            PrimaryKey::Single(column.to_string())
        }
        fn composite(columns: &[&str]) -> PrimaryKey {
            PrimaryKey::Composite(columns.iter().map(|c| c.to_string()).collect())
        }

        let primary_keys = [
            ("olist_customers_dataset", single("customer_id")),
            ("olist_orders_dataset", single("order_id")),
            (
                "olist_order_items_dataset",
                composite(&["order_id", "order_item_id"]),
            ),
            ("olist_products_dataset", single("product_id")),
            ("olist_sellers_dataset", single("seller_id")),
            (
                "olist_order_payments_dataset",
                composite(&["order_id", "payment_sequential"]),
            ),
            ("olist_order_reviews_dataset", single("review_id")),
            (
                "product_category_name_translation",
                single("product_category_name"),
            ),
            (
                "olist_geolocation_dataset",
                single("geolocation_zip_code_prefix"),
            ),
        ]
        .into_iter()
        .map(|(table, key)| (table.to_string(), key))
        .collect();

        let orders_ref = || ForeignKey::new("order_id", "olist_orders_dataset", "order_id");
        let foreign_keys = vec![
            DependentTable {
                table: "olist_orders_dataset".to_string(),
                references: vec![ForeignKey::new(
                    "customer_id",
                    "olist_customers_dataset",
                    "customer_id",
                )],
            },
            DependentTable {
                table: "olist_order_items_dataset".to_string(),
                references: vec![
                    orders_ref(),
                    ForeignKey::new("product_id", "olist_products_dataset", "product_id"),
                    ForeignKey::new("seller_id", "olist_sellers_dataset", "seller_id"),
                ],
            },
            DependentTable {
                table: "olist_order_payments_dataset".to_string(),
                references: vec![orders_ref()],
            },
            DependentTable {
                table: "olist_order_reviews_dataset".to_string(),
                references: vec![orders_ref()],
            },
        ];

        Self {
            source_files: [
                "olist_customers_dataset.csv",
                "olist_orders_dataset.csv",
                "olist_order_items_dataset.csv",
                "olist_products_dataset.csv",
                "olist_sellers_dataset.csv",
                "olist_order_payments_dataset.csv",
                "olist_order_reviews_dataset.csv",
                "product_category_name_translation.csv",
                "olist_geolocation_dataset.csv",
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
            primary_keys,
            foreign_keys,
        }
    }

    /// Read and validate a catalog from a JSON file
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| EtlError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog: Catalog = serde_json::from_str(&contents)
            .map_err(|e| EtlError::Config(format!("{}: {}", path.display(), e)))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Table names derived from the source files, in load order
    pub fn table_names(&self) -> Vec<String> {
        self.source_files
            .iter()
            .map(|f| Helpers::table_name_for(Path::new(f)))
            .collect()
    }

    /// Primary key configured for a table
    pub fn primary_key(&self, table: &str) -> Option<&PrimaryKey> {
        self.primary_keys.get(table)
    }

    /// Foreign keys configured for a table (empty for unconstrained tables)
    pub fn foreign_keys(&self, table: &str) -> &[ForeignKey] {
        self.foreign_keys
            .iter()
            .find(|d| d.table == table)
            .map(|d| d.references.as_slice())
            .unwrap_or(&[])
    }

    /// Check the catalog for internal consistency
    ///
    /// Every table named by a key must come from a source file, and each
    /// dependent table may be listed once.
    pub fn validate(&self) -> Result<()> {
        if self.source_files.is_empty() {
            return Err(EtlError::Config("no source files".to_string()));
        }

        let mut tables = HashSet::new();
        for name in self.table_names() {
            if name.is_empty() {
                return Err(EtlError::Config("source file without a name".to_string()));
            }
            if !tables.insert(name.clone()) {
                return Err(EtlError::Config(format!(
                    "table {} comes from more than one source file",
                    name
                )));
            }
        }

        let known = |table: &str, role: &str| {
            if tables.contains(table) {
                Ok(())
            } else {
                Err(EtlError::Config(format!(
                    "{} table {} has no source file",
                    role, table
                )))
            }
        };

        for (table, key) in &self.primary_keys {
            known(table, "primary key")?;
            if key.columns().is_empty() {
                return Err(EtlError::Config(format!(
                    "primary key of {} has no columns",
                    table
                )));
            }
        }

        let mut dependents = HashSet::new();
        for dependent in &self.foreign_keys {
            known(&dependent.table, "dependent")?;
            if !dependents.insert(dependent.table.as_str()) {
                return Err(EtlError::Config(format!(
                    "foreign keys of {} are listed twice",
                    dependent.table
                )));
            }
            for fk in &dependent.references {
                known(&fk.ref_table, "referent")?;
            }
        }

        Ok(())
    }

    /// Order tables so every referent is fully loaded before its dependents
    pub fn load_plan(&self) -> Result<LoadPlan> {
        let names = self.table_names();
        let unconstrained: Vec<String> = names
            .iter()
            .filter(|name| self.foreign_keys(name).is_empty())
            .cloned()
            .collect();

        let mut loaded: HashSet<&str> = unconstrained.iter().map(String::as_str).collect();
        let mut pending: Vec<&DependentTable> = self
            .foreign_keys
            .iter()
            .filter(|d| !d.references.is_empty())
            .collect();
        let mut constrained = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let ready = pending.iter().position(|d| {
                d.references
                    .iter()
                    .all(|fk| fk.ref_table != d.table && loaded.contains(fk.ref_table.as_str()))
            });
            match ready {
                Some(index) => {
                    let dependent = pending.remove(index);
                    loaded.insert(dependent.table.as_str());
                    constrained.push(dependent.table.clone());
                }
                None => {
                    let stuck: Vec<&str> = pending.iter().map(|d| d.table.as_str()).collect();
                    return Err(EtlError::Config(format!(
                        "foreign keys form a cycle through {}",
                        stuck.join(", ")
                    )));
                }
            }
        }

        Ok(LoadPlan {
            unconstrained,
            constrained,
        })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::olist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_table_catalog() -> Catalog {
        Catalog {
            source_files: vec!["orders.csv".to_string(), "sellers.csv".to_string()],
            primary_keys: BTreeMap::new(),
            foreign_keys: vec![DependentTable {
                table: "orders".to_string(),
                references: vec![ForeignKey::new("seller_id", "sellers", "seller_id")],
            }],
        }
    }

    #[test]
    fn test_olist_catalog_is_valid() {
        let catalog = Catalog::olist();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.table_names().len(), 9);
        assert_eq!(
            catalog.primary_key("olist_order_items_dataset"),
            Some(&PrimaryKey::Composite(vec![
                "order_id".to_string(),
                "order_item_id".to_string()
            ]))
        );
        assert_eq!(catalog.foreign_keys("olist_order_items_dataset").len(), 3);
        assert!(catalog.foreign_keys("olist_sellers_dataset").is_empty());
    }

    #[test]
    fn test_olist_load_plan() {
        let plan = Catalog::olist().load_plan().unwrap();
        assert_eq!(
            plan.unconstrained,
            vec![
                "olist_customers_dataset",
                "olist_products_dataset",
                "olist_sellers_dataset",
                "product_category_name_translation",
                "olist_geolocation_dataset",
            ]
        );
        assert_eq!(
            plan.constrained,
            vec![
                "olist_orders_dataset",
                "olist_order_items_dataset",
                "olist_order_payments_dataset",
                "olist_order_reviews_dataset",
            ]
        );
    }

    #[test]
    fn test_load_plan_orders_dependents() {
        let mut catalog = two_table_catalog();
        catalog.source_files.push("items.csv".to_string());
        // items listed before the orders table it depends on
        catalog.foreign_keys.insert(
            0,
            DependentTable {
                table: "items".to_string(),
                references: vec![ForeignKey::new("order_id", "orders", "order_id")],
            },
        );

        let plan = catalog.load_plan().unwrap();
        assert_eq!(plan.unconstrained, vec!["sellers"]);
        assert_eq!(plan.constrained, vec!["orders", "items"]);
    }

    #[test]
    fn test_load_plan_rejects_cycle() {
        let mut catalog = two_table_catalog();
        catalog.foreign_keys.push(DependentTable {
            table: "sellers".to_string(),
            references: vec![ForeignKey::new("order_id", "orders", "order_id")],
        });
        assert!(matches!(catalog.load_plan(), Err(EtlError::Config(_))));
    }

    #[test]
    fn test_validate_unknown_referent() {
        let mut catalog = two_table_catalog();
        catalog.foreign_keys[0].references[0].ref_table = "customers".to_string();
        let err = catalog.validate().unwrap_err();
        assert!(err.to_string().contains("customers"));
    }

    #[test]
    fn test_validate_unknown_dependent() {
        let mut catalog = two_table_catalog();
        catalog.foreign_keys[0].table = "payments".to_string();
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_from_path_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{
                "source_files": ["sellers.csv", "orders.csv"],
                "primary_keys": {"sellers": "seller_id", "orders": ["order_id", "seller_id"]},
                "foreign_keys": [{"table": "orders", "references": [
                    {"column": "seller_id", "ref_table": "sellers", "ref_column": "seller_id"}
                ]}]
            }"#,
        )
        .unwrap();

        let catalog = Catalog::from_path(&path).unwrap();
        assert_eq!(
            catalog.primary_key("sellers"),
            Some(&PrimaryKey::Single("seller_id".to_string()))
        );
        assert_eq!(
            catalog.primary_key("orders").map(|k| k.columns()),
            Some(vec!["order_id", "seller_id"])
        );
    }

    #[test]
    fn test_from_path_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Catalog::from_path(&path),
            Err(EtlError::Config(_))
        ));
    }
}
