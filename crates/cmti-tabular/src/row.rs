//! Typed cells and rows: the tabular side of the mapping.
//!
//! A [`Row`] maps column names to [`Cell`]s. Blank cells are never stored, so
//! "unset" always means "absent". Rows serialize as flat JSON objects.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single scalar value.
///
/// Deserialization is untagged: JSON `null`, booleans and numbers map to the
/// obvious variants, strings shaped like `YYYY-MM-DD` become dates and every
/// other string is text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
  #[default]
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  Date(NaiveDate),
  Text(String),
}

static NULL: Cell = Cell::Null;

impl Cell {
  /// Null, whitespace-only text, or NaN.
  pub fn is_blank(&self) -> bool {
    match self {
      Cell::Null => true,
      Cell::Text(s) => s.trim().is_empty(),
      Cell::Float(f) => f.is_nan(),
      _ => false,
    }
  }

  /// Render as trimmed text. Blank cells yield `None`.
  pub fn as_text(&self) -> Option<String> {
    match self {
      Cell::Null => None,
      Cell::Text(s) => {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_owned())
      }
      Cell::Bool(b) => Some(b.to_string()),
      Cell::Int(i) => Some(i.to_string()),
      Cell::Float(f) if f.is_nan() => None,
      Cell::Float(f) => Some(f.to_string()),
      Cell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
    }
  }

  /// Numeric value. Text is accepted only when it is a plain number.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Cell::Int(i) => Some(*i as f64),
      Cell::Float(f) if !f.is_nan() => Some(*f),
      Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|f| !f.is_nan()),
      _ => None,
    }
  }

  /// Integer value; floats round to the nearest integer.
  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Cell::Int(i) => Some(*i),
      Cell::Float(f) if f.is_finite() => Some(f.round() as i64),
      Cell::Text(s) => {
        let s = s.trim();
        s.parse::<i64>().ok().or_else(|| {
          s.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as i64)
        })
      }
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Cell::Bool(b) => Some(*b),
      Cell::Int(0) => Some(false),
      Cell::Int(1) => Some(true),
      _ => None,
    }
  }

  pub fn as_date(&self) -> Option<NaiveDate> {
    match self {
      Cell::Date(d) => Some(*d),
      _ => None,
    }
  }
}

impl From<&str> for Cell {
  fn from(s: &str) -> Self { Cell::Text(s.to_owned()) }
}

impl From<String> for Cell {
  fn from(s: String) -> Self { Cell::Text(s) }
}

impl From<&String> for Cell {
  fn from(s: &String) -> Self { Cell::Text(s.clone()) }
}

impl From<bool> for Cell {
  fn from(b: bool) -> Self { Cell::Bool(b) }
}

impl From<i64> for Cell {
  fn from(i: i64) -> Self { Cell::Int(i) }
}

impl From<i32> for Cell {
  fn from(i: i32) -> Self { Cell::Int(i64::from(i)) }
}

impl From<f64> for Cell {
  fn from(f: f64) -> Self { Cell::Float(f) }
}

impl From<NaiveDate> for Cell {
  fn from(d: NaiveDate) -> Self { Cell::Date(d) }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
  fn from(v: Option<T>) -> Self { v.map_or(Cell::Null, Into::into) }
}

// ─── Row ─────────────────────────────────────────────────────────────────────

/// A mapping from column name to cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
  from = "BTreeMap<String, Cell>",
  into = "BTreeMap<String, Cell>"
)]
pub struct Row {
  cells: BTreeMap<String, Cell>,
}

impl Row {
  pub fn new() -> Self { Self::default() }

  /// The cell in `column`, or [`Cell::Null`] when absent.
  pub fn get(&self, column: &str) -> &Cell {
    self.cells.get(column).unwrap_or(&NULL)
  }

  pub fn is_set(&self, column: &str) -> bool { !self.get(column).is_blank() }

  /// Store `value` under `column`. Blank values clear the column instead.
  pub fn set(&mut self, column: impl Into<String>, value: impl Into<Cell>) {
    let column = column.into();
    let value = value.into();
    if value.is_blank() {
      self.cells.remove(&column);
    } else {
      self.cells.insert(column, value);
    }
  }

  pub fn remove(&mut self, column: &str) -> Option<Cell> {
    self.cells.remove(column)
  }

  pub fn text(&self, column: &str) -> Option<String> {
    self.get(column).as_text()
  }

  pub fn float(&self, column: &str) -> Option<f64> { self.get(column).as_f64() }

  pub fn int(&self, column: &str) -> Option<i64> { self.get(column).as_i64() }

  /// A year-like integer that fits in `i32`.
  pub fn year(&self, column: &str) -> Option<i32> {
    self.int(column).and_then(|i| i32::try_from(i).ok())
  }

  pub fn bool(&self, column: &str) -> Option<bool> {
    self.get(column).as_bool()
  }

  pub fn date(&self, column: &str) -> Option<NaiveDate> {
    self.get(column).as_date()
  }

  /// Right-biased union: every column set in `other` but unset here is
  /// copied over. Columns already set here are left alone.
  pub fn merge_absent(&mut self, other: &Row) {
    for (column, cell) in &other.cells {
      if !cell.is_blank() && !self.is_set(column) {
        self.cells.insert(column.clone(), cell.clone());
      }
    }
  }

  /// Like [`Row::merge_absent`], restricted to `columns`.
  pub fn fill_from(&mut self, other: &Row, columns: &[&str]) {
    for column in columns {
      if !self.is_set(column) && other.is_set(column) {
        self.set(*column, other.get(column).clone());
      }
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
    self.cells.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn columns(&self) -> impl Iterator<Item = &str> {
    self.cells.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize { self.cells.len() }

  pub fn is_empty(&self) -> bool { self.cells.is_empty() }
}

impl<K: Into<String>, V: Into<Cell>> FromIterator<(K, V)> for Row {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut row = Row::new();
    for (column, value) in iter {
      row.set(column, value);
    }
    row
  }
}

impl From<BTreeMap<String, Cell>> for Row {
  fn from(cells: BTreeMap<String, Cell>) -> Self { cells.into_iter().collect() }
}

impl From<Row> for BTreeMap<String, Cell> {
  fn from(row: Row) -> Self { row.cells }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_values_are_not_stored() {
    let mut row = Row::new();
    row.set("A", "  ");
    row.set("B", Cell::Null);
    row.set("C", f64::NAN);
    row.set("D", "x");
    assert_eq!(row.len(), 1);
    assert!(!row.is_set("A"));
    assert_eq!(row.get("missing"), &Cell::Null);
  }

  #[test]
  fn right_biased_merge_keeps_existing_values() {
    let mut primary: Row = [("Name", "Big Mine"), ("Status", "Active")]
      .into_iter()
      .collect();
    let facility: Row = [("Status", "Closed"), ("Hazard_Class", "High")]
      .into_iter()
      .collect();

    primary.merge_absent(&facility);
    assert_eq!(primary.text("Status").as_deref(), Some("Active"));
    assert_eq!(primary.text("Hazard_Class").as_deref(), Some("High"));
  }

  #[test]
  fn fill_from_is_restricted() {
    let mut child = Row::new();
    let parent: Row = [("Latitude", 45.0), ("Shaft_Depth", 300.0)]
      .into_iter()
      .collect();
    child.fill_from(&parent, &["Latitude"]);
    assert_eq!(child.float("Latitude"), Some(45.0));
    assert!(!child.is_set("Shaft_Depth"));
  }

  #[test]
  fn json_cells_are_typed() {
    let row: Row = serde_json::from_str(
      r#"{"a": 1, "b": 2.5, "c": "2024-03-01", "d": "text", "e": true, "f": null}"#,
    )
    .unwrap();
    assert_eq!(row.get("a"), &Cell::Int(1));
    assert_eq!(row.get("b"), &Cell::Float(2.5));
    assert_eq!(
      row.date("c"),
      Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
    );
    assert_eq!(row.text("d").as_deref(), Some("text"));
    assert_eq!(row.bool("e"), Some(true));
    assert!(!row.is_set("f"));
    assert_eq!(row.len(), 5);
  }

  #[test]
  fn numeric_accessors_coerce() {
    let row: Row = [
      ("i", Cell::Int(7)),
      ("f", Cell::Float(6.6)),
      ("t", Cell::Text(" 12 ".into())),
    ]
    .into_iter()
    .collect();
    assert_eq!(row.float("i"), Some(7.0));
    assert_eq!(row.int("f"), Some(7));
    assert_eq!(row.int("t"), Some(12));
    assert_eq!(row.text("i").as_deref(), Some("7"));
  }
}
