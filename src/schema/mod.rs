//! Relational schema module
//!
//! - `builder`: column type mapping, table descriptors and DDL
//! - `constraints`: foreign-key constraint statements and their application

pub mod builder;
pub mod constraints;

pub use builder::{sql_type_for, TableDescriptor};
pub use constraints::{
    add_constraint_sql, constraint_name, AppliedConstraint, ConstraintApplier, ConstraintOutcome,
};
