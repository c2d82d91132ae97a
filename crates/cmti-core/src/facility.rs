//! Tailings facilities and the impoundments they own.
//!
//! Every mine carries exactly one default facility, and every facility
//! exactly one default impoundment. A default record stands in for the
//! parent when nothing more specific is known; it is folded into its parent's
//! row on export instead of getting a row of its own. The designation is
//! fixed at construction and checked whenever a record is attached.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, identifier::SiteId};

/// Whether a facility or impoundment is its parent's implicit stand-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Designation {
  Default,
  Named,
}

// ─── Impoundment ─────────────────────────────────────────────────────────────

/// A single tailings containment within a facility.
///
/// Quantities are stored in the worksheet's canonical units: area in km²,
/// volume and capacity in m³, height in m.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impoundment {
  pub impoundment_id:     Uuid,
  pub site_id:            Option<SiteId>,
  pub name:               String,
  pub designation:        Designation,
  pub area:               Option<f64>,
  pub area_from_images:   Option<f64>,
  pub area_notes:         Option<String>,
  pub volume:             Option<f64>,
  pub capacity:           Option<f64>,
  pub max_height:         Option<f64>,
  pub storage_method:     Option<String>,
  pub raise_type:         Option<String>,
  pub acid_generating:    Option<bool>,
  pub treatment:          Option<String>,
  pub rating_index:       Option<String>,
  pub stability_concerns: Option<String>,
}

impl Impoundment {
  fn blank(name: String, designation: Designation) -> Self {
    Self {
      impoundment_id: Uuid::new_v4(),
      site_id: None,
      name,
      designation,
      area: None,
      area_from_images: None,
      area_notes: None,
      volume: None,
      capacity: None,
      max_height: None,
      storage_method: None,
      raise_type: None,
      acid_generating: None,
      treatment: None,
      rating_index: None,
      stability_concerns: None,
    }
  }

  /// The default impoundment for a parent named `parent_name`.
  pub fn default_for(parent_name: &str) -> Self {
    Self::blank(
      format!("{parent_name}_defaultImpoundment"),
      Designation::Default,
    )
  }

  pub fn named(name: impl Into<String>, site_id: Option<SiteId>) -> Self {
    Self {
      site_id,
      ..Self::blank(name.into(), Designation::Named)
    }
  }

  pub fn is_default(&self) -> bool { self.designation == Designation::Default }
}

// ─── TailingsFacility ────────────────────────────────────────────────────────

/// A tailings storage facility (TSF), associated with one or more mines.
///
/// A facility belongs to the mine it was first attached to. Any further
/// mines it serves are listed in `associated_mines`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailingsFacility {
  pub facility_id:      Uuid,
  pub site_id:          Option<SiteId>,
  pub name:             String,
  pub designation:      Designation,
  pub status:           Option<String>,
  pub hazard_class:     Option<String>,
  pub hazard_system:    Option<String>,
  pub noami_status:     Option<String>,
  pub noami_site_class: Option<String>,
  pub prp_rating:       Option<String>,
  pub rehab_plan:       Option<String>,
  pub ews:              Option<String>,
  pub ews_rating:       Option<String>,
  pub latitude:         Option<f64>,
  pub longitude:        Option<f64>,
  #[serde(default)]
  pub associated_mines: Vec<SiteId>,
  pub impoundments:     Vec<Impoundment>,
}

impl TailingsFacility {
  fn blank(name: String, designation: Designation) -> Self {
    Self {
      facility_id: Uuid::new_v4(),
      site_id: None,
      name,
      designation,
      status: None,
      hazard_class: None,
      hazard_system: None,
      noami_status: None,
      noami_site_class: None,
      prp_rating: None,
      rehab_plan: None,
      ews: None,
      ews_rating: None,
      latitude: None,
      longitude: None,
      associated_mines: Vec::new(),
      impoundments: Vec::new(),
    }
  }

  /// The default facility for a mine; shares the mine's identifier.
  pub fn default_for(mine_name: &str, mine_id: SiteId) -> Self {
    Self {
      site_id: Some(mine_id),
      ..Self::blank(format!("defaultTSF_{mine_name}"), Designation::Default)
    }
  }

  pub fn named(name: impl Into<String>, site_id: Option<SiteId>) -> Self {
    Self {
      site_id,
      ..Self::blank(name.into(), Designation::Named)
    }
  }

  pub fn is_default(&self) -> bool { self.designation == Designation::Default }

  /// Record that the facility also serves `mine`. Returns whether the
  /// association is new. `owner` is the mine the facility belongs to.
  pub fn associate_mine(&mut self, owner: SiteId, mine: SiteId) -> bool {
    if mine == owner || self.associated_mines.contains(&mine) {
      return false;
    }
    self.associated_mines.push(mine);
    true
  }

  pub fn default_impoundment(&self) -> Option<&Impoundment> {
    self.impoundments.iter().find(|i| i.is_default())
  }

  /// Attach an impoundment, refusing a second default.
  pub fn attach_impoundment(&mut self, impoundment: Impoundment) -> Result<()> {
    if impoundment.is_default() && self.default_impoundment().is_some() {
      return Err(Error::DuplicateDefaultImpoundment(self.name.clone()));
    }
    self.impoundments.push(impoundment);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::jurisdiction::Jurisdiction;

  #[test]
  fn default_names_derive_from_parent() {
    let id = SiteId::new(Jurisdiction::Ontario, 1).unwrap();
    let tsf = TailingsFacility::default_for("Big Mine", id);
    assert_eq!(tsf.name, "defaultTSF_Big Mine");
    assert_eq!(tsf.site_id, Some(id));
    assert!(tsf.is_default());

    let imp = Impoundment::default_for("Big Mine");
    assert_eq!(imp.name, "Big Mine_defaultImpoundment");
    assert!(imp.is_default());
  }

  #[test]
  fn second_default_impoundment_is_rejected() {
    let mut tsf = TailingsFacility::named("North Pond", None);
    tsf.attach_impoundment(Impoundment::default_for("North Pond")).unwrap();
    tsf.attach_impoundment(Impoundment::named("Cell A", None)).unwrap();
    tsf.attach_impoundment(Impoundment::named("Cell B", None)).unwrap();

    let err = tsf
      .attach_impoundment(Impoundment::default_for("North Pond"))
      .unwrap_err();
    assert!(matches!(err, Error::DuplicateDefaultImpoundment(_)));
    assert_eq!(tsf.impoundments.len(), 3);
  }

  #[test]
  fn associations_skip_owner_and_repeats() {
    let owner = SiteId::new(Jurisdiction::Ontario, 1).unwrap();
    let other = SiteId::new(Jurisdiction::Ontario, 2).unwrap();
    let mut tsf = TailingsFacility::named("Shared Pond", None);

    assert!(!tsf.associate_mine(owner, owner));
    assert!(tsf.associate_mine(owner, other));
    assert!(!tsf.associate_mine(owner, other));
    assert_eq!(tsf.associated_mines, [other]);
  }
}
