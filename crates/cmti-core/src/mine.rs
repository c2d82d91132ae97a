//! The `Mine` root entity and the small records it owns outright.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  commodity::CommodityRecord,
  facility::TailingsFacility,
  identifier::SiteId,
  jurisdiction::Jurisdiction,
  owner::OwnerAssociation,
};

// ─── Owned records ───────────────────────────────────────────────────────────

/// An alternate name for a mine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
  pub name: String,
}

/// A citation of an external source describing the mine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
  pub source:    String,
  pub source_id: Option<String>,
  pub link:      Option<String>,
}

impl Reference {
  pub fn new(source: impl Into<String>) -> Self {
    Self {
      source:    source.into(),
      source_id: None,
      link:      None,
    }
  }
}

/// Deposit description for a mine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orebody {
  pub ore_type:  Option<String>,
  pub ore_class: Option<String>,
  pub minerals:  Option<String>,
}

// ─── Attribute groups ────────────────────────────────────────────────────────

/// Where the mine is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub latitude:        Option<f64>,
  pub longitude:       Option<f64>,
  pub datum:           Option<String>,
  pub utm_zone:        Option<i32>,
  pub easting:         Option<i64>,
  pub northing:        Option<i64>,
  pub nts_area:        Option<String>,
  pub mining_district: Option<String>,
}

/// Classification, history and free-text notes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MineDetails {
  pub last_revised:         Option<NaiveDate>,
  pub mine_type:            Option<String>,
  pub mining_method:        Option<String>,
  pub mine_status:          Option<String>,
  pub development_stage:    Option<String>,
  pub development_comments: Option<String>,
  pub site_access:          Option<String>,
  pub site_access_comments: Option<String>,
  pub shaft_depth:          Option<f64>,
  pub construction_year:    Option<i32>,
  pub year_opened:          Option<i32>,
  pub year_closed:          Option<i32>,
  pub reserves_resources:   Option<f64>,
  pub sedar:                Option<String>,
  pub processing_method:    Option<String>,
  pub ore_processed:        Option<f64>,
  pub ore_processed_unit:   Option<String>,
  pub notes:                Option<String>,
}

// ─── Mine ────────────────────────────────────────────────────────────────────

/// A mine site and everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mine {
  pub site_id:      SiteId,
  pub name:         String,
  pub jurisdiction: Jurisdiction,
  pub location:     Location,
  pub details:      MineDetails,
  pub commodities:  Vec<CommodityRecord>,
  pub aliases:      Vec<Alias>,
  pub owners:       Vec<OwnerAssociation>,
  pub references:   Vec<Reference>,
  pub orebodies:    Vec<Orebody>,
  pub facilities:   Vec<TailingsFacility>,
}

impl Mine {
  pub fn new(
    site_id: SiteId,
    name: impl Into<String>,
    jurisdiction: Jurisdiction,
  ) -> Self {
    Self {
      site_id,
      name: name.into(),
      jurisdiction,
      location: Location::default(),
      details: MineDetails::default(),
      commodities: Vec::new(),
      aliases: Vec::new(),
      owners: Vec::new(),
      references: Vec::new(),
      orebodies: Vec::new(),
      facilities: Vec::new(),
    }
  }

  pub fn has_commodity(&self, symbol: &str) -> bool {
    self.commodities.iter().any(|c| c.symbol == symbol)
  }

  /// Add a commodity record; symbols are unique per mine.
  pub fn add_commodity(&mut self, record: CommodityRecord) -> Result<()> {
    if self.has_commodity(&record.symbol) {
      return Err(Error::DuplicateCommodity {
        mine:   self.site_id,
        symbol: record.symbol,
      });
    }
    self.commodities.push(record);
    Ok(())
  }

  /// Add an alias unless it is already present. Returns whether it was added.
  pub fn add_alias(&mut self, name: impl Into<String>) -> bool {
    let name = name.into();
    if self.aliases.iter().any(|a| a.name == name) {
      return false;
    }
    self.aliases.push(Alias { name });
    true
  }

  pub fn default_facility(&self) -> Option<&TailingsFacility> {
    self.facilities.iter().find(|f| f.is_default())
  }

  /// Attach a facility, refusing a second default.
  pub fn attach_facility(&mut self, facility: TailingsFacility) -> Result<()> {
    if facility.is_default() && self.default_facility().is_some() {
      return Err(Error::DuplicateDefaultFacility(self.site_id));
    }
    self.facilities.push(facility);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn mine() -> Mine {
    let id = SiteId::new(Jurisdiction::Ontario, 1).unwrap();
    Mine::new(id, "Big Mine", Jurisdiction::Ontario)
  }

  #[test]
  fn duplicate_commodity_is_rejected() {
    let mut m = mine();
    m.add_commodity(CommodityRecord::new("Cu")).unwrap();
    let err = m.add_commodity(CommodityRecord::new("Cu")).unwrap_err();
    assert!(matches!(err, Error::DuplicateCommodity { .. }));
    assert_eq!(m.commodities.len(), 1);
  }

  #[test]
  fn aliases_are_deduplicated() {
    let mut m = mine();
    assert!(m.add_alias("Old Shaft"));
    assert!(!m.add_alias("Old Shaft"));
    assert_eq!(m.aliases.len(), 1);
  }

  #[test]
  fn second_default_facility_is_rejected() {
    let mut m = mine();
    m.attach_facility(TailingsFacility::default_for(&m.name.clone(), m.site_id))
      .unwrap();
    m.attach_facility(TailingsFacility::named("East Pond", None))
      .unwrap();
    let err = m
      .attach_facility(TailingsFacility::default_for("Big Mine", m.site_id))
      .unwrap_err();
    assert!(matches!(err, Error::DuplicateDefaultFacility(_)));
    assert_eq!(m.facilities.len(), 2);
  }
}
