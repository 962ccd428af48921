//! Constraint applier
//!
//! Adds the catalog's foreign keys once every table exists. A constraint
//! that is already present (a re-run) is not an error.

use crate::catalog::ForeignKey;
use crate::error::{EtlError, Result};
use crate::schema::TableDescriptor;
use crate::store::RelationalStore;
use crate::utils::Helpers;
use serde::Serialize;

/// Result of one constraint addition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintOutcome {
    Added,
    AlreadyExists,
}

/// Constraint identity: `fk_<table>_<column>`
pub fn constraint_name(table: &str, fk: &ForeignKey) -> String {
    format!("fk_{}_{}", table, fk.column)
}

/// `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY` statement
///
/// Deleting a referent nulls the referencing column; key updates cascade.
pub fn add_constraint_sql(table: &str, fk: &ForeignKey) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) \
         ON DELETE SET NULL ON UPDATE CASCADE",
        Helpers::quote_ident(table),
        Helpers::quote_ident(&constraint_name(table, fk)),
        Helpers::quote_ident(&fk.column),
        Helpers::quote_ident(&fk.ref_table),
        Helpers::quote_ident(&fk.ref_column)
    )
}

/// One attempted constraint and what happened to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedConstraint {
    pub table: String,
    pub foreign_key: ForeignKey,
    pub outcome: ConstraintOutcome,
}

/// Applies foreign-key constraints through a relational store
pub struct ConstraintApplier;

impl ConstraintApplier {
    /// Add every foreign key of every descriptor, in order
    ///
    /// All descriptors' tables (and their referents) must already exist.
    pub async fn apply<S>(store: &mut S, descriptors: &[TableDescriptor]) -> Result<Vec<AppliedConstraint>>
    where
        S: RelationalStore + ?Sized,
    {
        let mut applied = Vec::new();
        for descriptor in descriptors {
            for fk in &descriptor.foreign_keys {
                if !descriptors.iter().any(|d| d.name == fk.ref_table) {
                    return Err(EtlError::UnknownTable(fk.ref_table.clone()));
                }

                let outcome = store.add_foreign_key(&descriptor.name, fk).await?;
                match outcome {
                    ConstraintOutcome::Added => log::info!(
                        "foreign key added on {}: {} -> {}({})",
                        descriptor.name,
                        fk.column,
                        fk.ref_table,
                        fk.ref_column
                    ),
                    ConstraintOutcome::AlreadyExists => log::warn!(
                        "foreign key {} already exists, skipped",
                        constraint_name(&descriptor.name, fk)
                    ),
                }
                applied.push(AppliedConstraint {
                    table: descriptor.name.clone(),
                    foreign_key: fk.clone(),
                    outcome,
                });
            }
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRelationalStore;
    use crate::types::SqlType;

    fn descriptors() -> Vec<TableDescriptor> {
        vec![
            TableDescriptor {
                name: "sellers".to_string(),
                columns: vec![("seller_id".to_string(), SqlType::Varchar)],
                primary_key: Some(crate::catalog::PrimaryKey::Single("seller_id".to_string())),
                foreign_keys: vec![],
            },
            TableDescriptor {
                name: "orders".to_string(),
                columns: vec![
                    ("order_id".to_string(), SqlType::Varchar),
                    ("seller_id".to_string(), SqlType::Varchar),
                ],
                primary_key: Some(crate::catalog::PrimaryKey::Single("order_id".to_string())),
                foreign_keys: vec![ForeignKey::new("seller_id", "sellers", "seller_id")],
            },
        ]
    }

    #[test]
    fn test_add_constraint_sql() {
        let fk = ForeignKey::new("customer_id", "olist_customers_dataset", "customer_id");
        assert_eq!(
            add_constraint_sql("olist_orders_dataset", &fk),
            "ALTER TABLE \"olist_orders_dataset\" ADD CONSTRAINT \
             \"fk_olist_orders_dataset_customer_id\" FOREIGN KEY (\"customer_id\") \
             REFERENCES \"olist_customers_dataset\" (\"customer_id\") \
             ON DELETE SET NULL ON UPDATE CASCADE"
        );
    }

    #[tokio::test]
    async fn test_apply_twice_is_idempotent() {
        let descriptors = descriptors();
        let mut store = MemoryRelationalStore::new();
        for d in &descriptors {
            store.create_table(d).await.unwrap();
        }

        let first = ConstraintApplier::apply(&mut store, &descriptors).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].outcome, ConstraintOutcome::Added);

        let second = ConstraintApplier::apply(&mut store, &descriptors).await.unwrap();
        assert_eq!(second[0].outcome, ConstraintOutcome::AlreadyExists);
        assert_eq!(store.constraint_names(), vec!["fk_orders_seller_id"]);
    }

    #[tokio::test]
    async fn test_apply_requires_referent_descriptor() {
        let descriptors = descriptors();
        let mut store = MemoryRelationalStore::new();
        store.create_table(&descriptors[1]).await.unwrap();

        let err = ConstraintApplier::apply(&mut store, &descriptors[1..])
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::UnknownTable(t) if t == "sellers"));
    }
}
