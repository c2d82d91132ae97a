//! Column-level type coercion and unit normalisation.
//!
//! Every declared column gets a [`Converter`]. A converter either produces a
//! clean value or a [`CellError`]; [`Normalizer::normalize_row`] turns every
//! error into the column default, logs it, and records a [`CellIssue`] so a
//! single bad cell never stops a row.
//!
//! Unit handling is deliberately lossy: an unknown unit or an impossible
//! conversion leaves the raw value in place for the numeric fallback to chew
//! on rather than failing.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::{
  columns::{LONGITUDE, UTM_ZONE},
  row::{Cell, Row},
  schema::{ColumnSpec, ColumnType, Schema, UnitSpec},
  units,
};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CellError {
  #[error("not a number: {0:?}")]
  NotNumeric(String),

  #[error("not a date: {0:?}")]
  NotADate(String),

  #[error("not a boolean: {0:?}")]
  NotABoolean(String),
}

/// A cell that fell back to its column default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellIssue {
  pub row:     usize,
  pub column:  String,
  pub value:   Cell,
  pub message: String,
}

// ─── Converter ───────────────────────────────────────────────────────────────

/// The conversion function for one column.
#[derive(Debug, Clone, Copy)]
pub struct Converter<'a> {
  spec:   &'a ColumnSpec,
  schema: &'a Schema,
  as_of:  NaiveDate,
}

impl Converter<'_> {
  pub fn column(&self) -> &str { &self.spec.name }

  /// The value an empty or unconvertible cell becomes. Date columns without
  /// an explicit default take the normaliser's `as_of` date.
  pub fn default_value(&self) -> Cell {
    match (&self.spec.ty, &self.spec.default) {
      (ColumnType::Date, Cell::Null) => Cell::Date(self.as_of),
      (_, default) => default.clone(),
    }
  }

  /// Convert one cell.
  pub fn convert(&self, cell: &Cell) -> Result<Cell, CellError> {
    if cell.is_blank() || self.schema.is_null_token(cell) {
      return Ok(self.default_value());
    }
    match self.spec.ty {
      ColumnType::Text => Ok(cell.as_text().map_or(Cell::Null, Cell::Text)),
      ColumnType::Float => self.number(cell).map(Cell::Float),
      ColumnType::Integer => self
        .number(cell)
        .map(|f| Cell::Int(f.round() as i64)),
      ColumnType::Boolean => boolean(cell).map(Cell::Bool),
      ColumnType::Date => date(cell).map(Cell::Date),
    }
  }

  fn number(&self, cell: &Cell) -> Result<f64, CellError> {
    match cell {
      Cell::Int(_) | Cell::Float(_) => {
        let value = cell.as_f64().unwrap_or_default();
        Ok(self.with_implicit_unit(value))
      }
      Cell::Text(s) => self
        .unit_aware(s)
        .or_else(|| units::extract_number(s))
        .ok_or_else(|| CellError::NotNumeric(s.clone())),
      other => Err(CellError::NotNumeric(
        other.as_text().unwrap_or_default(),
      )),
    }
  }

  /// Bare numbers are converted from the declared implicit unit, if any.
  fn with_implicit_unit(&self, value: f64) -> f64 {
    match &self.spec.unit {
      Some(UnitSpec {
        target,
        implicit: Some(implicit),
      }) => units::convert(value, implicit, target).unwrap_or(value),
      _ => value,
    }
  }

  /// Parse `s` as a quantity and convert it to the column's target unit.
  ///
  /// `None` means "leave it to the fallback": no number up front, or a unit
  /// that is unknown or of the wrong dimension.
  fn unit_aware(&self, s: &str) -> Option<f64> {
    let quantity = units::parse_quantity(s)?;
    let Some(spec) = &self.spec.unit else {
      return quantity.unit.is_none().then_some(quantity.magnitude);
    };
    match quantity.unit.as_deref().or(spec.implicit.as_deref()) {
      Some(unit) => units::convert(quantity.magnitude, unit, &spec.target).ok(),
      None => Some(quantity.magnitude),
    }
  }
}

fn boolean(cell: &Cell) -> Result<bool, CellError> {
  if let Some(b) = cell.as_bool() {
    return Ok(b);
  }
  let text = cell.as_text().unwrap_or_default();
  match text.to_ascii_lowercase().as_str() {
    "true" | "yes" | "y" | "1" | "t" => Ok(true),
    "false" | "no" | "n" | "0" | "f" => Ok(false),
    _ => Err(CellError::NotABoolean(text)),
  }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%d/%m/%Y"];

fn date(cell: &Cell) -> Result<NaiveDate, CellError> {
  if let Some(d) = cell.as_date() {
    return Ok(d);
  }
  let text = cell.as_text().unwrap_or_default();
  // Timestamps: keep the leading date.
  let head = text.split(['T', ' ']).next().unwrap_or_default();
  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(head, fmt).ok())
    .ok_or(CellError::NotADate(text))
}

/// UTM zone for a longitude in decimal degrees.
pub fn lon_to_utm_zone(longitude: f64) -> i32 {
  (((longitude + 180.0) / 6.0) % 60.0).ceil() as i32
}

// ─── Normalizer ──────────────────────────────────────────────────────────────

/// Rows that passed the required-column check, with their input position.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
  pub rows:     Vec<(usize, Row)>,
  /// Input position and the required columns each rejected row lacked.
  pub rejected: Vec<(usize, Vec<String>)>,
  pub issues:   Vec<CellIssue>,
}

/// Applies a [`Schema`] to rows.
///
/// `as_of` stands in for any missing date, which keeps normalisation
/// reproducible.
#[derive(Debug, Clone)]
pub struct Normalizer {
  schema: Schema,
  as_of:  NaiveDate,
}

impl Normalizer {
  pub fn new(schema: Schema, as_of: NaiveDate) -> Self { Self { schema, as_of } }

  pub fn schema(&self) -> &Schema { &self.schema }

  pub fn as_of(&self) -> NaiveDate { self.as_of }

  pub fn converter(&self, column: &str) -> Option<Converter<'_>> {
    self.schema.column(column).map(|spec| self.converter_for(spec))
  }

  fn converter_for<'a>(&'a self, spec: &'a ColumnSpec) -> Converter<'a> {
    Converter {
      spec,
      schema: &self.schema,
      as_of: self.as_of,
    }
  }

  /// Required columns that are empty in `row`.
  pub fn missing_required(&self, row: &Row) -> Vec<String> {
    self
      .schema
      .required()
      .iter()
      .filter(|c| {
        let cell = row.get(c);
        cell.is_blank() || self.schema.is_null_token(cell)
      })
      .cloned()
      .collect()
  }

  /// Convert every declared column of `row`. Undeclared columns pass through
  /// untouched. `index` is only used to attribute issues.
  pub fn normalize_row(&self, index: usize, mut row: Row) -> (Row, Vec<CellIssue>) {
    let mut issues = Vec::new();

    for spec in self.schema.columns() {
      let converter = self.converter_for(spec);
      let raw = row.get(&spec.name).clone();
      let value = match converter.convert(&raw) {
        Ok(value) => value,
        Err(err) => {
          tracing::warn!(
            row = index,
            column = %spec.name,
            error = %err,
            "cell replaced by column default"
          );
          issues.push(CellIssue {
            row:     index,
            column:  spec.name.clone(),
            value:   raw,
            message: err.to_string(),
          });
          converter.default_value()
        }
      };
      row.set(spec.name.as_str(), value);
    }

    if self.schema.column(UTM_ZONE).is_some() && !row.is_set(UTM_ZONE) {
      if let Some(longitude) = row.float(LONGITUDE) {
        row.set(UTM_ZONE, i64::from(lon_to_utm_zone(longitude)));
      }
    }

    (row, issues)
  }

  /// Check required columns, then normalise every surviving row.
  pub fn normalize_batch(&self, rows: impl IntoIterator<Item = Row>) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for (index, row) in rows.into_iter().enumerate() {
      let missing = self.missing_required(&row);
      if !missing.is_empty() {
        tracing::warn!(row = index, ?missing, "row missing required columns");
        batch.rejected.push((index, missing));
        continue;
      }
      let (row, issues) = self.normalize_row(index, row);
      batch.rows.push((index, row));
      batch.issues.extend(issues);
    }
    batch
  }
}
