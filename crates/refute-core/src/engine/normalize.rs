//! Turning SQLite values into comparable JSON cells.

use crate::model::{ComparisonMode, Row};
use rusqlite::types::ValueRef;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Normalizes one cell. Text stays text, integers and finite reals become
/// numbers, non-finite reals become null. Blobs decode as UTF-8 when valid
/// and otherwise render as an SQL hex literal.
pub fn normalize_cell(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => Value::String(format!("X'{}'", hex::encode_upper(b))),
        },
    }
}

/// A fully materialized query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    /// The single cell of a one-row, one-column result.
    pub fn scalar(&self) -> Option<Value> {
        match (self.columns.len(), self.rows.as_slice()) {
            (1, [row]) => row.first().cloned(),
            _ => None,
        }
    }
}

fn canonical(row: &Row) -> String {
    // serializing a Vec<Value> cannot fail
    serde_json::to_string(row).unwrap_or_default()
}

fn bag(rows: &[Row]) -> HashMap<String, usize> {
    let mut counts = HashMap::with_capacity(rows.len());
    for row in rows {
        *counts.entry(canonical(row)).or_insert(0) += 1;
    }
    counts
}

fn distinct(rows: &[Row]) -> HashSet<String> {
    rows.iter().map(canonical).collect()
}

/// Integer and real cells holding the same value are equal.
fn cells_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x == y || matches!((x.as_f64(), y.as_f64()), (Some(p), Some(q)) if p == q)
        }
        _ => a == b,
    }
}

fn rows_equal(a: &Row, b: &Row) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| cells_equal(x, y))
}

/// Compares two results. With `check_columns` the column names must match
/// exactly, in order.
///
/// The multiset and set modes key rows by their canonical JSON, so `3` and
/// `3.0` are different rows there. Sequence comparison goes cell by cell
/// and treats them as equal.
pub fn results_equal(a: &ResultSet, b: &ResultSet, mode: ComparisonMode, check_columns: bool) -> bool {
    if check_columns && a.columns != b.columns {
        return false;
    }
    match mode {
        ComparisonMode::OrderSensitive => {
            a.rows.len() == b.rows.len()
                && a.rows.iter().zip(&b.rows).all(|(x, y)| rows_equal(x, y))
        }
        ComparisonMode::OrderInsensitive => {
            a.rows.len() == b.rows.len() && bag(&a.rows) == bag(&b.rows)
        }
        ComparisonMode::Set => distinct(&a.rows) == distinct(&b.rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rs(columns: &[&str], rows: Vec<Row>) -> ResultSet {
        ResultSet {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn test_normalize_cells() {
        assert_eq!(normalize_cell(ValueRef::Null), Value::Null);
        assert_eq!(normalize_cell(ValueRef::Integer(7)), json!(7));
        assert_eq!(normalize_cell(ValueRef::Real(1.5)), json!(1.5));
        assert_eq!(normalize_cell(ValueRef::Real(f64::NAN)), Value::Null);
        assert_eq!(normalize_cell(ValueRef::Real(f64::INFINITY)), Value::Null);
        assert_eq!(normalize_cell(ValueRef::Text(b"abc")), json!("abc"));
        assert_eq!(normalize_cell(ValueRef::Blob(b"hi")), json!("hi"));
        assert_eq!(
            normalize_cell(ValueRef::Blob(&[0xff, 0x00, 0x1a])),
            json!("X'FF001A'")
        );
    }

    #[test]
    fn test_reordered_rows() {
        let a = rs(&["x"], vec![vec![json!(1)], vec![json!(2)], vec![json!(2)]]);
        let b = rs(&["x"], vec![vec![json!(2)], vec![json!(1)], vec![json!(2)]]);
        assert!(results_equal(&a, &b, ComparisonMode::OrderInsensitive, true));
        assert!(!results_equal(&a, &b, ComparisonMode::OrderSensitive, true));
    }

    #[test]
    fn test_multiset_counts_duplicates() {
        let a = rs(&["x"], vec![vec![json!(1)], vec![json!(1)], vec![json!(2)]]);
        let b = rs(&["x"], vec![vec![json!(1)], vec![json!(2)], vec![json!(2)]]);
        assert!(!results_equal(&a, &b, ComparisonMode::OrderInsensitive, true));
    }

    #[test]
    fn test_set_mode_ignores_duplicates() {
        let a = rs(&["n"], vec![vec![json!("a")], vec![json!("a")], vec![json!("b")]]);
        let b = rs(&["n"], vec![vec![json!("b")], vec![json!("a")]]);
        assert!(results_equal(&a, &b, ComparisonMode::Set, true));
        assert!(!results_equal(&a, &b, ComparisonMode::OrderInsensitive, true));

        let c = rs(&["n"], vec![vec![json!("a")]]);
        assert!(!results_equal(&a, &c, ComparisonMode::Set, true));
    }

    #[test]
    fn test_sequence_compares_numbers_by_value() {
        let ints = rs(&["s"], vec![vec![json!(3), json!("x")]]);
        let reals = rs(&["s"], vec![vec![json!(3.0), json!("x")]]);
        assert!(results_equal(&ints, &reals, ComparisonMode::OrderSensitive, true));
        assert!(!results_equal(&ints, &reals, ComparisonMode::OrderInsensitive, true));

        let other = rs(&["s"], vec![vec![json!(3.5), json!("x")]]);
        assert!(!results_equal(&ints, &other, ComparisonMode::OrderSensitive, true));
        let text = rs(&["s"], vec![vec![json!("3"), json!("x")]]);
        assert!(!results_equal(&ints, &text, ComparisonMode::OrderSensitive, true));
    }

    #[test]
    fn test_column_names() {
        let a = rs(&["x"], vec![vec![json!(1)]]);
        let b = rs(&["y"], vec![vec![json!(1)]]);
        assert!(!results_equal(&a, &b, ComparisonMode::OrderInsensitive, true));
        assert!(results_equal(&a, &b, ComparisonMode::OrderInsensitive, false));
    }

    #[test]
    fn test_text_and_number_differ() {
        let a = rs(&["x"], vec![vec![json!(1)]]);
        let b = rs(&["x"], vec![vec![json!("1")]]);
        assert!(!results_equal(&a, &b, ComparisonMode::OrderInsensitive, true));
    }

    #[test]
    fn test_scalar_only_for_single_cell() {
        assert_eq!(rs(&["x"], vec![vec![json!(3)]]).scalar(), Some(json!(3)));
        assert_eq!(rs(&["x"], vec![]).scalar(), None);
        assert_eq!(
            rs(&["x", "y"], vec![vec![json!(3), json!(4)]]).scalar(),
            None
        );
        assert_eq!(
            rs(&["x"], vec![vec![json!(3)], vec![json!(4)]]).scalar(),
            None
        );
    }
}
