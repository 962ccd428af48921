//! Helper functions
//!
//! This module provides small naming and formatting helpers.
//!
//! # Example
//!
//! ```rust
//! use olist_etl::utils::Helpers;
//! use std::path::Path;
//!
//! let name = Helpers::table_name_for(Path::new("olist_orders_dataset.csv"));
//! assert_eq!(name, "olist_orders_dataset");
//! ```

use std::path::Path;
use std::time::Duration;

/// Helper functions
pub struct Helpers;

impl Helpers {
    /// Derive a table name from a source file path
    ///
    /// The name is the file name without its extension.
    pub fn table_name_for(path: &Path) -> String {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Format duration to human-readable string
    ///
    /// # Arguments
    /// * `nanos` - Duration in nanoseconds
    ///
    /// # Returns
    /// Formatted string (e.g., "1.23s", "500ms")
    pub fn format_duration(nanos: u64) -> String {
        let duration = Duration::from_nanos(nanos);
        let seconds = duration.as_secs();
        let millis = duration.as_millis();

        if seconds >= 1 {
            format!("{:.2}s", duration.as_secs_f64())
        } else if millis >= 1 {
            format!("{}ms", millis)
        } else {
            format!("{}ns", nanos)
        }
    }

    /// Format duration from Duration struct
    pub fn format_duration_from(duration: Duration) -> String {
        Self::format_duration(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
    }

    /// Quote a SQL identifier
    pub fn quote_ident(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_for() {
        assert_eq!(
            Helpers::table_name_for(Path::new("/app/dataset/olist_sellers_dataset.csv")),
            "olist_sellers_dataset"
        );
        assert_eq!(
            Helpers::table_name_for(Path::new("product_category_name_translation.csv")),
            "product_category_name_translation"
        );
        assert_eq!(Helpers::table_name_for(Path::new("noext")), "noext");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(Helpers::format_duration(1_500_000_000), "1.50s");
        assert_eq!(Helpers::format_duration(500_000_000), "500ms");
        assert_eq!(Helpers::format_duration(42), "42ns");
    }

    #[test]
    fn test_format_duration_from() {
        let formatted = Helpers::format_duration_from(Duration::from_secs(1));
        assert_eq!(formatted, "1.00s");
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(Helpers::quote_ident("order_id"), "\"order_id\"");
        assert_eq!(Helpers::quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
