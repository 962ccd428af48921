//! Relational loader
//!
//! Unconstrained tables are inserted as they are. Rows of dependent tables
//! are first checked against the key sets of their referent tables, read
//! once per foreign key, and dropped when any referenced value is missing.
//! Rows with an empty primary-key cell cannot be stored and are dropped from
//! every table.

use crate::error::{EtlError, Result};
use crate::load::TableLoadReport;
use crate::schema::TableDescriptor;
use crate::store::RelationalStore;
use crate::types::{Row, Table};

/// Inserts table rows through a relational store
pub struct RelationalLoader<'a, S: RelationalStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: RelationalStore + ?Sized> RelationalLoader<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Insert every row, skipping primary-key conflicts
    pub async fn load_unconstrained(
        &mut self,
        descriptor: &TableDescriptor,
        table: &Table,
    ) -> Result<TableLoadReport> {
        let (rows, null_keys) = keyed_rows(descriptor, table);
        let inserted = self.store.insert_rows(descriptor, &rows).await?;

        let report = TableLoadReport::new(&table.name, table.num_rows(), inserted, 0, null_keys);
        log::info!(
            "inserted {} rows into {} ({} duplicates)",
            report.inserted,
            report.table,
            report.duplicates
        );
        Ok(report)
    }

    /// Insert the rows whose foreign-key values all exist in their referents
    ///
    /// `referents` must hold the descriptor of every table referenced by
    /// `descriptor`, and those tables must already be fully loaded.
    pub async fn load_constrained(
        &mut self,
        descriptor: &TableDescriptor,
        table: &Table,
        referents: &[TableDescriptor],
    ) -> Result<TableLoadReport> {
        let mut checks = Vec::with_capacity(descriptor.foreign_keys.len());
        for fk in &descriptor.foreign_keys {
            let referent = referents
                .iter()
                .find(|d| d.name == fk.ref_table)
                .ok_or_else(|| EtlError::UnknownTable(fk.ref_table.clone()))?;
            let index = table
                .column_index(&fk.column)
                .ok_or_else(|| EtlError::MissingColumn {
                    table: table.name.clone(),
                    column: fk.column.clone(),
                })?;
            let keys = self.store.fetch_keys(referent, &fk.ref_column).await?;
            log::debug!(
                "{} keys of {}({}) cached for {}",
                keys.len(),
                fk.ref_table,
                fk.ref_column,
                table.name
            );
            checks.push((index, keys));
        }

        let (keyed, null_keys) = keyed_rows(descriptor, table);
        let rows: Vec<&Row> = keyed
            .into_iter()
            .filter(|row| {
                checks.iter().all(|(index, keys)| {
                    row.get_value(*index)
                        .and_then(|v| v.key())
                        .is_some_and(|key| keys.contains(&key))
                })
            })
            .collect();
        let dropped = table.num_rows() - null_keys - rows.len();
        let inserted = self.store.insert_rows(descriptor, &rows).await?;

        let report =
            TableLoadReport::new(&table.name, table.num_rows(), inserted, dropped, null_keys);
        if dropped > 0 {
            log::warn!(
                "{} rows of {} dropped for missing references",
                dropped,
                table.name
            );
        }
        log::info!(
            "inserted {} rows into {} ({} duplicates)",
            report.inserted,
            report.table,
            report.duplicates
        );
        Ok(report)
    }
}

/// Rows whose primary-key cells are all present, and how many were left out
fn keyed_rows<'t>(descriptor: &TableDescriptor, table: &'t Table) -> (Vec<&'t Row>, usize) {
    let key_indices = descriptor.primary_key_indices();
    let rows: Vec<&Row> = table
        .rows
        .iter()
        .filter(|row| {
            key_indices
                .iter()
                .all(|i| row.get_value(*i).is_some_and(|v| !v.is_null()))
        })
        .collect();

    let dropped = table.num_rows() - rows.len();
    if dropped > 0 {
        log::warn!(
            "{} rows of {} dropped for an empty primary key",
            dropped,
            table.name
        );
    }
    (rows, dropped)
}
