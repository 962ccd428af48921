//! Core types for tabular data
//!
//! This module defines the in-memory shape of a loaded source file:
//! - Tables, columns, and rows
//! - Inferred source data types and SQL column types
//! - Cell values and their hashable key projection

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// In-memory table loaded from one source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Table name (source file stem)
    pub name: String,

    /// Column definitions, in source order
    pub columns: Vec<Column>,

    /// Data rows
    pub rows: Vec<Row>,
}

impl Table {
    /// Create a new empty table
    pub fn new(name: String, columns: Vec<Column>) -> Self {
        Self {
            name,
            columns,
            rows: Vec::new(),
        }
    }

    /// Get number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Get number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Get the position of a column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,

    /// Data type inferred for the whole column
    pub data_type: DataType,
}

impl Column {
    /// Create a new column
    pub fn new(name: String, data_type: DataType) -> Self {
        Self { name, data_type }
    }
}

/// Data type inferred from the source cells of a column
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Whole numbers, no missing cells
    Integer,

    /// Any other numeric column (including whole numbers with gaps)
    Float,

    /// `True` / `False` flags
    Boolean,

    /// Date or date-time
    DateTime,

    /// Anything else
    Text,
}

/// Declared SQL column type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SqlType {
    Int,
    Numeric,
    Timestamp,
    Varchar,
}

impl SqlType {
    /// SQL spelling used in DDL
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Int => "INT",
            SqlType::Numeric => "NUMERIC",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Varchar => "VARCHAR",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Data row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Row {
    /// Row values, aligned with the table's columns
    pub values: Vec<Value>,
}

impl Row {
    /// Create a new row
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Get value at column index
    pub fn get_value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// Cell value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Text(String),
    Null,
}

impl Value {
    /// Whether the cell was missing in the source
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Hashable projection used for key lookups
    ///
    /// `Null` never matches a key. Booleans project to their text form
    /// because they are stored in `VARCHAR` columns.
    pub fn key(&self) -> Option<KeyValue> {
        match self {
            Value::Integer(v) => Some(KeyValue::Integer(*v)),
            // -0.0 and 0.0 compare equal in SQL
            Value::Decimal(v) if *v == 0.0 => Some(KeyValue::Decimal(0f64.to_bits())),
            Value::Decimal(v) => Some(KeyValue::Decimal(v.to_bits())),
            Value::Boolean(v) => Some(KeyValue::Text(v.to_string())),
            Value::Timestamp(v) => Some(KeyValue::Timestamp(*v)),
            Value::Text(v) => Some(KeyValue::Text(v.clone())),
            Value::Null => None,
        }
    }
}

/// Hashable, non-null key value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Integer(i64),
    /// IEEE-754 bits of the decimal value
    Decimal(u64),
    Timestamp(NaiveDateTime),
    Text(String),
}
