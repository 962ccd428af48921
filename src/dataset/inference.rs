//! Column type inference
//!
//! A column's type is decided once from all of its cells, the way a
//! dataframe reader does it: whole numbers stay integers only while no cell
//! is missing, and an all-missing column is numeric.

use crate::types::{DataType, Value};
use chrono::{NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Whether a raw cell counts as missing
pub fn is_missing(cell: &str) -> bool {
    cell.trim().is_empty()
}

/// Infer the data type of a column from its raw cells
pub fn infer_data_type<'a, I>(cells: I) -> DataType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut any_missing = false;
    let mut all_integer = true;
    let mut all_numeric = true;
    let mut all_boolean = true;
    let mut all_datetime = true;

    for cell in cells {
        if is_missing(cell) {
            any_missing = true;
            continue;
        }
        let cell = cell.trim();
        if all_integer && parse_integer(cell).is_none() {
            all_integer = false;
        }
        if all_numeric && parse_float(cell).is_none() {
            all_numeric = false;
        }
        if all_boolean && parse_boolean(cell).is_none() {
            all_boolean = false;
        }
        if all_datetime && parse_datetime(cell).is_none() {
            all_datetime = false;
        }
        if !(all_integer || all_numeric || all_boolean || all_datetime) {
            return DataType::Text;
        }
    }

    if all_integer && !any_missing {
        DataType::Integer
    } else if all_numeric {
        DataType::Float
    } else if all_boolean && !any_missing {
        DataType::Boolean
    } else if all_datetime {
        DataType::DateTime
    } else {
        DataType::Text
    }
}

/// Convert a raw cell to a value of the column's type
///
/// Missing cells become `Null`. The column type was inferred from the same
/// cells, so a failed parse only happens for mismatched callers and yields
/// `Null` as well.
pub fn coerce(cell: &str, data_type: DataType) -> Value {
    if is_missing(cell) {
        return Value::Null;
    }
    let trimmed = cell.trim();
    let value = match data_type {
        DataType::Integer => parse_integer(trimmed).map(Value::Integer),
        DataType::Float => parse_float(trimmed).map(Value::Decimal),
        DataType::Boolean => parse_boolean(trimmed).map(Value::Boolean),
        DataType::DateTime => parse_datetime(trimmed).map(Value::Timestamp),
        DataType::Text => Some(Value::Text(cell.to_string())),
    };
    value.unwrap_or(Value::Null)
}

fn parse_integer(cell: &str) -> Option<i64> {
    cell.parse::<i64>().ok()
}

fn parse_float(cell: &str) -> Option<f64> {
    // Rust accepts "inf"/"nan" spellings; only plain decimal notation counts
    if !cell
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
    {
        return None;
    }
    cell.parse::<f64>().ok()
}

fn parse_boolean(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_datetime(cell: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(cell, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(cell, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_infer_integer() {
        assert_eq!(infer_data_type(["1", "2", "-3"]), DataType::Integer);
    }

    #[test]
    fn test_infer_integer_with_gap_is_float() {
        assert_eq!(infer_data_type(["1", "", "3"]), DataType::Float);
    }

    #[test]
    fn test_infer_float() {
        assert_eq!(infer_data_type(["58.90", "239.9", "1"]), DataType::Float);
        assert_eq!(infer_data_type(["", ""]), DataType::Float);
    }

    #[test]
    fn test_infer_datetime() {
        assert_eq!(
            infer_data_type(["2017-10-02 10:56:33", "", "2018-07-24"]),
            DataType::DateTime
        );
    }

    #[test]
    fn test_infer_boolean() {
        assert_eq!(infer_data_type(["True", "false"]), DataType::Boolean);
        assert_eq!(infer_data_type(["True", ""]), DataType::Text);
    }

    #[test]
    fn test_infer_text() {
        assert_eq!(
            infer_data_type(["e481f51cbdc54678b7cc49136f2d6af7", "12"]),
            DataType::Text
        );
        assert_eq!(infer_data_type(["nan", "inf"]), DataType::Text);
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce("42", DataType::Integer), Value::Integer(42));
        assert_eq!(coerce("", DataType::Integer), Value::Null);
        assert_eq!(coerce("19.9", DataType::Float), Value::Decimal(19.9));
        assert_eq!(coerce("TRUE", DataType::Boolean), Value::Boolean(true));
        assert_eq!(
            coerce("sao paulo", DataType::Text),
            Value::Text("sao paulo".to_string())
        );

        let expected = NaiveDate::from_ymd_opt(2017, 10, 2)
            .and_then(|d| d.and_hms_opt(10, 56, 33))
            .unwrap();
        assert_eq!(
            coerce("2017-10-02 10:56:33", DataType::DateTime),
            Value::Timestamp(expected)
        );
    }

    proptest! {
        #[test]
        fn prop_whole_numbers_are_integer(values in prop::collection::vec(any::<i64>(), 1..20)) {
            let cells: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            prop_assert_eq!(infer_data_type(cells.iter().map(String::as_str)), DataType::Integer);
        }

        #[test]
        fn prop_inferred_type_coerces_every_cell(values in prop::collection::vec("[a-z0-9 ]{0,8}", 1..20)) {
            let data_type = infer_data_type(values.iter().map(String::as_str));
            for cell in &values {
                let value = coerce(cell, data_type);
                prop_assert_eq!(value.is_null(), is_missing(cell));
            }
        }
    }
}
