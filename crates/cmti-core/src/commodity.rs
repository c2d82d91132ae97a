//! Commodity records and the read-only lookup tables used to classify them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ─── Classification ──────────────────────────────────────────────────────────

/// Broad class of a commodity.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(ascii_case_insensitive, serialize_all = "kebab-case")]
pub enum MetalClass {
  Metal,
  #[serde(alias = "nonmetal", alias = "Non-metal", alias = "non metal")]
  #[strum(serialize = "non-metal", serialize = "nonmetal")]
  NonMetal,
  /// Rare-earth element.
  #[serde(alias = "REE")]
  Ree,
}

/// Where a commodity quantity was reported and for which years.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
  pub source:     String,
  pub year_start: Option<i32>,
  pub year_end:   Option<i32>,
}

// ─── CommodityRecord ─────────────────────────────────────────────────────────

/// One commodity produced or present at a mine.
///
/// Units travel with the value because the canonical unit differs between
/// commodities (precious metals are tracked in troy ounces).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityRecord {
  pub symbol:         String,
  pub grade:          Option<f64>,
  pub produced:       Option<f64>,
  pub produced_unit:  Option<String>,
  pub contained:      Option<f64>,
  pub contained_unit: Option<String>,
  pub is_critical:    bool,
  pub metal_class:    Option<MetalClass>,
  pub provenance:     Option<Provenance>,
}

impl CommodityRecord {
  pub fn new(symbol: impl Into<String>) -> Self {
    Self {
      symbol:         symbol.into(),
      grade:          None,
      produced:       None,
      produced_unit:  None,
      contained:      None,
      contained_unit: None,
      is_critical:    false,
      metal_class:    None,
      provenance:     None,
    }
  }
}

// ─── Lookup tables ───────────────────────────────────────────────────────────

/// Read-only commodity lookups, loaded once by the caller.
///
/// `names` maps symbol → full name (`"Cu" → "Copper"`). The critical list and
/// metal classes may be keyed by either form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommodityTables {
  pub critical_minerals: BTreeSet<String>,
  pub metal_classes:     BTreeMap<String, MetalClass>,
  pub names:             BTreeMap<String, String>,
}

impl CommodityTables {
  /// Canonical symbol for a commodity given by symbol or full name.
  ///
  /// Input is capitalised first (`"COPPER"` → `"Copper"`). Names with no
  /// known symbol come back capitalised but otherwise unchanged.
  pub fn to_symbol(&self, raw: &str) -> String {
    let value = capitalize(raw.trim());
    if self.names.contains_key(&value) {
      return value;
    }
    self
      .names
      .iter()
      .find(|(_, name)| name.eq_ignore_ascii_case(&value))
      .map(|(symbol, _)| symbol.clone())
      .unwrap_or(value)
  }

  /// Full name for a symbol, or the input when the symbol is unknown.
  pub fn to_name(&self, symbol: &str) -> String {
    self
      .names
      .get(symbol)
      .cloned()
      .unwrap_or_else(|| symbol.to_owned())
  }

  pub fn is_critical(&self, symbol: &str) -> bool {
    let name = self.to_name(symbol);
    self
      .critical_minerals
      .iter()
      .any(|c| c.eq_ignore_ascii_case(symbol) || c.eq_ignore_ascii_case(&name))
  }

  pub fn metal_class(&self, symbol: &str) -> Option<MetalClass> {
    self
      .metal_classes
      .get(symbol)
      .or_else(|| self.metal_classes.get(&self.to_name(symbol)))
      .copied()
  }

  /// Fill the classification fields of `record` from these tables.
  pub fn classify(&self, record: &mut CommodityRecord) {
    record.is_critical = self.is_critical(&record.symbol);
    record.metal_class = self.metal_class(&record.symbol);
  }
}

/// Uppercase the first character and lowercase the rest.
fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first
      .to_uppercase()
      .chain(chars.flat_map(char::to_lowercase))
      .collect(),
    None => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tables() -> CommodityTables {
    CommodityTables {
      critical_minerals: ["Copper".to_owned(), "Ni".to_owned()].into(),
      metal_classes:     [
        ("Cu".to_owned(), MetalClass::Metal),
        ("Gypsum".to_owned(), MetalClass::NonMetal),
      ]
      .into(),
      names:             [
        ("Cu".to_owned(), "Copper".to_owned()),
        ("Au".to_owned(), "Gold".to_owned()),
        ("Ni".to_owned(), "Nickel".to_owned()),
      ]
      .into(),
    }
  }

  #[test]
  fn converts_names_to_symbols() {
    let t = tables();
    assert_eq!(t.to_symbol("Copper"), "Cu");
    assert_eq!(t.to_symbol("COPPER"), "Cu");
    assert_eq!(t.to_symbol("cu"), "Cu");
    assert_eq!(t.to_symbol("Au"), "Au");
    assert_eq!(t.to_symbol("limestone"), "Limestone");
    assert_eq!(t.to_name("Au"), "Gold");
    assert_eq!(t.to_name("Limestone"), "Limestone");
  }

  #[test]
  fn classifies_by_symbol_or_name() {
    let t = tables();
    let mut cu = CommodityRecord::new("Cu");
    t.classify(&mut cu);
    assert!(cu.is_critical);
    assert_eq!(cu.metal_class, Some(MetalClass::Metal));

    let mut ni = CommodityRecord::new("Ni");
    t.classify(&mut ni);
    assert!(ni.is_critical);
    assert_eq!(ni.metal_class, None);

    let mut au = CommodityRecord::new("Au");
    t.classify(&mut au);
    assert!(!au.is_critical);
  }

  #[test]
  fn tables_deserialize_with_defaults() {
    let t: CommodityTables = serde_json::from_str(
      r#"{ "metal_classes": { "La": "REE", "Cu": "metal", "Salt": "nonmetal" } }"#,
    )
    .unwrap();
    assert!(t.critical_minerals.is_empty());
    assert_eq!(t.metal_classes["La"], MetalClass::Ree);
    assert_eq!(t.metal_classes["Salt"], MetalClass::NonMetal);
  }

  #[test]
  fn metal_class_parses_from_text() {
    assert_eq!("Metal".parse::<MetalClass>().unwrap(), MetalClass::Metal);
    assert_eq!("non-metal".parse::<MetalClass>().unwrap(), MetalClass::NonMetal);
    assert_eq!(MetalClass::Ree.to_string(), "ree");
  }
}
