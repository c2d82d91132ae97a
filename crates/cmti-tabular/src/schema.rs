//! Column declarations: semantic type, default and target unit per column.

use serde::{Deserialize, Serialize};

use crate::{columns::*, row::Cell};

/// Semantic type a column is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
  Integer,
  Float,
  Text,
  Date,
  Boolean,
}

/// Unit registration for a numeric column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
  /// Unit values are converted into.
  pub target:   String,
  /// Unit assumed for bare numbers. Without one, bare numbers are taken to
  /// be in `target` already.
  pub implicit: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
  pub name:    String,
  pub ty:      ColumnType,
  pub default: Cell,
  pub unit:    Option<UnitSpec>,
}

impl ColumnSpec {
  pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
    Self {
      name: name.into(),
      ty,
      default: Cell::Null,
      unit: None,
    }
  }

  pub fn text(name: impl Into<String>) -> Self { Self::new(name, ColumnType::Text) }

  pub fn float(name: impl Into<String>) -> Self { Self::new(name, ColumnType::Float) }

  pub fn integer(name: impl Into<String>) -> Self {
    Self::new(name, ColumnType::Integer)
  }

  pub fn date(name: impl Into<String>) -> Self { Self::new(name, ColumnType::Date) }

  pub fn boolean(name: impl Into<String>) -> Self {
    Self::new(name, ColumnType::Boolean)
  }

  pub fn with_default(mut self, default: impl Into<Cell>) -> Self {
    self.default = default.into();
    self
  }

  pub fn with_unit(mut self, target: impl Into<String>) -> Self {
    self.unit = Some(UnitSpec {
      target:   target.into(),
      implicit: None,
    });
    self
  }

  pub fn with_implicit_unit(
    mut self,
    target: impl Into<String>,
    implicit: impl Into<String>,
  ) -> Self {
    self.unit = Some(UnitSpec {
      target:   target.into(),
      implicit: Some(implicit.into()),
    });
    self
  }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

/// The declared columns of one row layout.
#[derive(Debug, Clone, Default)]
pub struct Schema {
  columns:     Vec<ColumnSpec>,
  required:    Vec<String>,
  null_tokens: Vec<String>,
}

impl Schema {
  pub fn new(columns: Vec<ColumnSpec>) -> Self {
    Self {
      columns,
      ..Self::default()
    }
  }

  /// Rows missing any of `columns` are rejected before hydration.
  pub fn with_required(mut self, columns: &[&str]) -> Self {
    self.required = columns.iter().map(|c| (*c).to_owned()).collect();
    self
  }

  /// Text values that mean "empty" in this layout (e.g. `"Null"`).
  pub fn with_null_tokens(mut self, tokens: &[&str]) -> Self {
    self.null_tokens = tokens.iter().map(|t| (*t).to_owned()).collect();
    self
  }

  pub fn columns(&self) -> &[ColumnSpec] { &self.columns }

  pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
    self.columns.iter().find(|c| c.name == name)
  }

  pub fn required(&self) -> &[String] { &self.required }

  pub fn null_tokens(&self) -> &[String] { &self.null_tokens }

  pub fn is_null_token(&self, cell: &Cell) -> bool {
    match cell {
      Cell::Text(s) => self.null_tokens.iter().any(|t| t == s.trim()),
      _ => false,
    }
  }

  /// The canonical worksheet layout.
  ///
  /// Classification columns default to `"Unknown"`; every other column
  /// defaults to empty. Quantities are stored in km², m³, m, t, and kg (troy
  /// ounces for Au and Ag).
  pub fn worksheet() -> Self {
    let unknown = |name: &str| ColumnSpec::text(name).with_default(UNKNOWN);

    let mut columns = vec![
      ColumnSpec::text(SITE_NAME),
      ColumnSpec::text(SITE_TYPE),
      ColumnSpec::text(CMTI_ID),
      ColumnSpec::text(SITE_ALIASES),
      ColumnSpec::text(PARENT),
      ColumnSpec::text(PARENT_ID),
      ColumnSpec::date(LAST_REVISED),
      ColumnSpec::text(DATUM).with_default("NAD83"),
      ColumnSpec::integer(UTM_ZONE),
      ColumnSpec::integer(EASTING),
      ColumnSpec::integer(NORTHING),
      ColumnSpec::float(LATITUDE),
      ColumnSpec::float(LONGITUDE),
      ColumnSpec::text(COUNTRY).with_default(CANADA),
      ColumnSpec::text(PROVINCE_TERRITORY),
      ColumnSpec::text(NTS_AREA),
      ColumnSpec::text(MINING_DISTRICT),
      unknown(MINE_TYPE),
      unknown(MINING_METHOD),
      unknown(MINE_STATUS),
      ColumnSpec::text(OWNER_OPERATOR),
      ColumnSpec::text(PAST_OWNERS),
      unknown(DEV_STAGE),
      ColumnSpec::text(DS_COMMENTS),
      unknown(SITE_ACCESS),
      ColumnSpec::text(SA_COMMENTS),
      ColumnSpec::float(SHAFT_DEPTH).with_unit("m"),
      ColumnSpec::integer(CONSTRUCTION_YEAR),
      ColumnSpec::integer(YEAR_OPENED),
      ColumnSpec::integer(YEAR_CLOSED),
      ColumnSpec::float(RESERVES_RESOURCES),
      ColumnSpec::text(SEDAR),
      ColumnSpec::text(NOTES),
      ColumnSpec::text(OREBODY_TYPE),
      ColumnSpec::text(OREBODY_CLASS),
      ColumnSpec::text(ORE_MINERALS),
      ColumnSpec::text(PROCESSING_METHOD),
      ColumnSpec::float(ORE_PROCESSED).with_unit("t"),
      ColumnSpec::text(ORE_PROCESSED_UNIT),
      unknown(HAZARD_CLASS),
      ColumnSpec::text(HAZARD_SYSTEM),
      ColumnSpec::text(NOAMI_STATUS),
      ColumnSpec::text(NOAMI_SITE_CLASS),
      ColumnSpec::text(PRP_RATING),
      ColumnSpec::text(REHAB_PLAN),
      ColumnSpec::text(EWS),
      ColumnSpec::text(EWS_RATING),
      ColumnSpec::float(TAILINGS_AREA).with_unit("km2"),
      ColumnSpec::float(TAILINGS_AREA_FROM_IMAGES).with_unit("km2"),
      ColumnSpec::text(TAILINGS_AREA_NOTES),
      ColumnSpec::float(TAILINGS_VOLUME).with_unit("m3"),
      ColumnSpec::float(TAILINGS_CAPACITY).with_unit("m3"),
      ColumnSpec::float(CURRENT_MAX_HEIGHT).with_unit("m"),
      ColumnSpec::text(TAILINGS_STORAGE_METHOD),
      ColumnSpec::text(RAISE_TYPE),
      ColumnSpec::boolean(ACID_GENERATING),
      ColumnSpec::text(TREATMENT),
      ColumnSpec::text(RATING_INDEX),
      ColumnSpec::text(STABILITY_CONCERNS),
    ];

    for slot in 1..=COMMODITY_SLOTS {
      columns.push(ColumnSpec::text(commodity(slot)));
    }
    for slot in 2..=OREBODY_SLOTS {
      columns.extend(orebody(slot).map(ColumnSpec::text));
    }
    for slot in 1..=SOURCE_SLOTS {
      columns.push(ColumnSpec::text(source(slot)));
      columns.push(ColumnSpec::text(source_id(slot)));
      columns.push(ColumnSpec::text(source_link(slot)));
    }
    for symbol in QUANTIFIED_COMMODITIES {
      let unit = quantity_unit(symbol);
      columns.push(ColumnSpec::float(grade(symbol)));
      columns.push(ColumnSpec::float(produced(symbol)).with_unit(unit));
      columns.push(ColumnSpec::float(contained(symbol)).with_unit(unit));
    }

    Self::new(columns).with_required(&[SITE_NAME, SITE_TYPE, LATITUDE, LONGITUDE])
  }
}
