//! Source adapters: external table layouts → worksheet-shaped rows.
//!
//! Each source is described by a static [`SourceProfile`] (column renames,
//! constants, commodity and reference columns) plus a small hook for the
//! quirks a rename table cannot express. The worksheet itself is the
//! identity mapping.

use std::sync::OnceLock;

use chrono::Datelike as _;
use cmti_core::commodity::CommodityTables;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{
  columns::*,
  row::{Cell, Row},
  units,
};

/// The table layouts rows can arrive in.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Display,
  EnumString,
  EnumIter,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum SourceKind {
  /// The canonical worksheet.
  Worksheet,
  /// Ontario Mineral Inventory.
  Omi,
  /// Orphaned and abandoned mines inventory.
  Oam,
  /// British Columbia abandoned and historic mines.
  Bcahm,
  /// Nova Scotia mine tailings database.
  Nsmtd,
}

/// A reference a source row carries about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceMap {
  pub source:      &'static str,
  pub id_column:   &'static str,
  pub link_column: Option<&'static str>,
}

/// Declarative part of a source mapping.
#[derive(Debug, Clone, Copy)]
pub struct SourceProfile {
  /// `(source column, worksheet column)` copied as-is.
  pub columns:     &'static [(&'static str, &'static str)],
  /// `(source column, worksheet column, unit)`: bare numbers get `unit`
  /// attached so the normaliser can convert them.
  pub quantities:  &'static [(&'static str, &'static str, &'static str)],
  /// Worksheet values written when the source leaves the column empty.
  pub constants:   &'static [(&'static str, &'static str)],
  /// Columns holding one commodity or a comma-separated list.
  pub commodities: &'static [&'static str],
  pub references:  &'static [ReferenceMap],
  /// Text values the source writes for "no value".
  pub null_tokens: &'static [&'static str],
}

const MINE_CONSTANTS: &[(&str, &str)] = &[(SITE_TYPE, SITE_TYPE_MINE), (COUNTRY, CANADA)];

static WORKSHEET: SourceProfile = SourceProfile {
  columns:     &[],
  quantities:  &[],
  constants:   &[],
  commodities: &[],
  references:  &[],
  null_tokens: &[],
};

static OMI: SourceProfile = SourceProfile {
  columns:     &[
    ("NAME", SITE_NAME),
    ("LATITUDE", LATITUDE),
    ("LONGITUDE", LONGITUDE),
    ("RGP_DIST", MINING_DISTRICT),
    ("STATUS", MINE_STATUS),
    ("ALL_NAMES", SITE_ALIASES),
  ],
  quantities:  &[],
  constants:   &[(PROVINCE_TERRITORY, "ON")],
  commodities: &["P_COMMOD", "S_COMMOD"],
  references:  &[ReferenceMap {
    source:      "OMI",
    id_column:   "MDI_IDENT",
    link_column: Some("DETAIL"),
  }],
  null_tokens: &[],
};

static OAM: SourceProfile = SourceProfile {
  columns:     &[
    ("Name", SITE_NAME),
    ("Lat_DD", LATITUDE),
    ("Long_DD", LONGITUDE),
    ("Jurisdiction", PROVINCE_TERRITORY),
    ("Status", MINE_STATUS),
    ("Mine_Type", MINE_TYPE),
    ("Last_Operator", PAST_OWNERS),
  ],
  quantities:  &[],
  constants:   &[],
  commodities: &[],
  references:  &[ReferenceMap {
    source:      "OAM",
    id_column:   "OID",
    link_column: Some("URL"),
  }],
  null_tokens: &[],
};

static BCAHM: SourceProfile = SourceProfile {
  columns:     &[
    ("NAME1", SITE_NAME),
    ("NAME2", SITE_ALIASES),
    ("LATITUDE", LATITUDE),
    ("LONGITUDE", LONGITUDE),
    ("UTM_ZONE", UTM_ZONE),
    ("UTM_NORT", NORTHING),
    ("UTM_EAST", EASTING),
    ("First_Year", YEAR_OPENED),
    ("Last_Year", YEAR_CLOSED),
    ("NTSMAP_C1", NTS_AREA),
    ("DEPOSITTYPE_D1", OREBODY_TYPE),
    ("DEPOSITCLASS_D1", OREBODY_CLASS),
    ("DEPOSITTYPE_D2", OREBODY_TYPE_2),
    ("DEPOSITCLASS_D2", OREBODY_CLASS_2),
  ],
  quantities:  &[],
  constants:   &[(PROVINCE_TERRITORY, "BC"), (MINE_STATUS, "Inactive")],
  commodities: &["COMMOD_C1", "COMMOD_C2", "COMMOD_C3"],
  references:  &[
    ReferenceMap {
      source:      "BCAHM",
      id_column:   "OBJECTID",
      link_column: None,
    },
    ReferenceMap {
      source:      "BC Minfile",
      id_column:   "MINFILNO",
      link_column: None,
    },
  ],
  null_tokens: &["Null"],
};

static NSMTD: SourceProfile = SourceProfile {
  columns:     &[
    ("Name", SITE_NAME),
    ("Latitude", LATITUDE),
    ("Longitude", LONGITUDE),
  ],
  quantities:  &[("AreaHa", TAILINGS_AREA, "ha"), ("Tonnes", ORE_PROCESSED, "t")],
  constants:   &[(PROVINCE_TERRITORY, "NS"), (MINE_STATUS, "Inactive")],
  commodities: &["Commodity"],
  references:  &[ReferenceMap {
    source:      "NSMTD",
    id_column:   "OBJECTID",
    link_column: None,
  }],
  null_tokens: &[],
};

impl SourceKind {
  pub fn profile(self) -> &'static SourceProfile {
    match self {
      SourceKind::Worksheet => &WORKSHEET,
      SourceKind::Omi => &OMI,
      SourceKind::Oam => &OAM,
      SourceKind::Bcahm => &BCAHM,
      SourceKind::Nsmtd => &NSMTD,
    }
  }

  /// Map a raw source row onto the worksheet layout.
  pub fn adapt(self, raw: &Row, tables: &CommodityTables) -> Row {
    if self == SourceKind::Worksheet {
      return raw.clone();
    }
    let profile = self.profile();
    let raw = strip_null_tokens(raw, profile.null_tokens);
    let mut row = Row::new();

    for (from, to) in profile.columns {
      if raw.is_set(from) {
        row.set(*to, raw.get(from).clone());
      }
    }
    for (from, to, unit) in profile.quantities {
      if raw.is_set(from) {
        row.set(*to, with_unit(raw.get(from), unit));
      }
    }

    let names = profile
      .commodities
      .iter()
      .flat_map(|column| split_list(&raw, column))
      .collect::<Vec<_>>();
    write_commodities(&mut row, &names);

    let mut slot = 0;
    for reference in profile.references {
      let Some(id) = raw.text(reference.id_column) else {
        continue;
      };
      slot += 1;
      row.set(source(slot), reference.source);
      row.set(source_id(slot), id);
      if let Some(link) = reference.link_column {
        row.set(source_link(slot), raw.get(link).clone());
      }
    }

    match self {
      SourceKind::Oam => oam(&raw, &mut row, tables),
      SourceKind::Nsmtd => nsmtd(&raw, &mut row),
      _ => {}
    }

    for (column, value) in MINE_CONSTANTS.iter().chain(profile.constants) {
      if !row.is_set(column) {
        row.set(*column, *value);
      }
    }
    row
  }
}

fn strip_null_tokens(raw: &Row, tokens: &[&str]) -> Row {
  if tokens.is_empty() {
    return raw.clone();
  }
  raw
    .iter()
    .filter(|(_, cell)| match cell {
      Cell::Text(s) => !tokens.contains(&s.trim()),
      _ => true,
    })
    .map(|(column, cell)| (column, cell.clone()))
    .collect()
}

/// Bare numbers become `"<number> <unit>"`; anything carrying its own unit,
/// or not numeric at all, is left alone.
fn with_unit(cell: &Cell, unit: &str) -> Cell {
  if let Some(value) = cell.as_f64() {
    return Cell::Text(format!("{value} {unit}"));
  }
  match cell {
    Cell::Text(s) if units::parse_quantity(s).is_some_and(|q| q.unit.is_none()) => {
      Cell::Text(format!("{} {unit}", s.trim()))
    }
    other => other.clone(),
  }
}

fn split_list(row: &Row, column: &str) -> Vec<String> {
  row
    .text(column)
    .map(|v| {
      v.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
    })
    .unwrap_or_default()
}

fn write_commodities(row: &mut Row, names: &[String]) {
  for (i, name) in names.iter().enumerate() {
    row.set(commodity(i + 1), name);
  }
}

/// A year from a date, a year number or text containing one.
fn year_of(cell: &Cell) -> Option<i64> {
  match cell {
    Cell::Date(d) => Some(i64::from(d.year())),
    other => other.as_i64().or_else(|| {
      other
        .as_text()
        .as_deref()
        .and_then(units::extract_number)
        .map(|f| f.trunc() as i64)
    }),
  }
}

/// `"BIG NICKEL MINE"` → `"Big Nickel Mine"`.
fn title_case(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut prev_alpha = false;
  for c in s.chars() {
    if prev_alpha {
      out.extend(c.to_lowercase());
    } else {
      out.extend(c.to_uppercase());
    }
    prev_alpha = c.is_alphabetic();
  }
  out
}

fn oam(raw: &Row, row: &mut Row, tables: &CommodityTables) {
  if let Some(name) = row.text(SITE_NAME) {
    row.set(SITE_NAME, title_case(&name));
  }
  row.set(CONSTRUCTION_YEAR, year_of(raw.get("Start_Date")));
  row.set(YEAR_CLOSED, year_of(raw.get("Last_Year")));

  // Rows carry either codes or full names.
  let mut names = split_list(raw, "Commodity_Code");
  if names.is_empty() {
    names = split_list(raw, "Commodity_Full_Name");
  }
  write_commodities(row, &names);

  let mined = raw.get("Mined_Quantity");
  if !mined.is_blank() {
    for name in &names {
      row.set(produced(&tables.to_symbol(name)), mined.clone());
    }
  }
}

fn year_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\b\d{4}\b").expect("year regex must compile"))
}

fn nsmtd(raw: &Row, row: &mut Row) {
  if let Some(name) = raw.text("Name") {
    let alias = name.split('(').next().unwrap_or_default().trim();
    if !alias.is_empty() && alias != name {
      row.set(SITE_ALIASES, alias);
    }
  }

  if let Some(dates) = raw.text("Dates") {
    let years: Vec<i64> = year_re()
      .find_iter(&dates)
      .filter_map(|m| m.as_str().parse().ok())
      .collect();
    row.set(YEAR_OPENED, years.iter().min().copied());
    row.set(YEAR_CLOSED, years.iter().max().copied());
  }
}
