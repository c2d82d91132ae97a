//! The `MineStore` trait.
//!
//! Implemented by storage backends (e.g. `cmti-store-sqlite`). The row
//! pipeline in `cmti-tabular` depends on this abstraction only.

use std::future::Future;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{
  facility::{Designation, Impoundment, TailingsFacility},
  identifier::SiteId,
  mine::Mine,
};

/// The kind of site a row describes.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum SiteKind {
  #[strum(to_string = "Mine")]
  Mine,
  #[strum(to_string = "TSF", serialize = "Tailings Facility")]
  #[serde(rename = "TSF")]
  Tsf,
  #[strum(to_string = "Impoundment")]
  Impoundment,
}

/// A facility located by identifier, with the mine it hangs off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityRef {
  pub facility_id:      Uuid,
  /// The mine the facility belongs to.
  pub mine_id:          SiteId,
  /// Further mines the facility serves, in association order.
  pub associated_mines: Vec<SiteId>,
  pub name:             String,
  pub designation:      Designation,
}

impl FacilityRef {
  /// Whether the facility is already linked to `mine`, as owner or not.
  pub fn serves(&self, mine: SiteId) -> bool {
    self.mine_id == mine || self.associated_mines.contains(&mine)
  }
}

/// Abstraction over a mine inventory backend.
///
/// Inserting a mine writes its whole graph as one unit. Non-default
/// facilities and impoundments arrive later and are attached to a parent
/// found by identifier. Identifiers of named facilities and impoundments are
/// unique. Nothing is ever deleted through this interface.
pub trait MineStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a mine with every record it owns. Fails if the identifier is
  /// already taken; a failed insert leaves nothing behind.
  fn insert_mine(
    &self,
    mine: Mine,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Attach a facility (and its impoundments) to an existing mine. Every
  /// mine in the facility's `associated_mines` must exist as well.
  fn attach_facility(
    &self,
    mine_id: SiteId,
    facility: TailingsFacility,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Link an existing facility to a further existing mine. Linking a
  /// facility to its own mine, or twice to the same mine, is refused.
  fn associate_facility(
    &self,
    mine_id: SiteId,
    facility_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Attach an impoundment to an existing facility.
  fn attach_impoundment(
    &self,
    facility_id: Uuid,
    impoundment: Impoundment,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Load a mine and its full graph. Returns `None` if not found.
  fn get_mine(
    &self,
    id: SiteId,
  ) -> impl Future<Output = Result<Option<Mine>, Self::Error>> + Send + '_;

  /// Locate a facility by identifier. A named facility wins over a default
  /// facility that shares its mine's identifier.
  fn find_facility(
    &self,
    id: SiteId,
  ) -> impl Future<Output = Result<Option<FacilityRef>, Self::Error>> + Send + '_;

  /// All mines, ordered by identifier.
  fn list_mines(
    &self,
  ) -> impl Future<Output = Result<Vec<Mine>, Self::Error>> + Send + '_;

  /// Every site identifier in the store (mines, facilities, impoundments).
  fn site_ids(
    &self,
  ) -> impl Future<Output = Result<Vec<SiteId>, Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn site_kind_parses_row_labels() {
    assert_eq!("Mine".parse::<SiteKind>().unwrap(), SiteKind::Mine);
    assert_eq!("tsf".parse::<SiteKind>().unwrap(), SiteKind::Tsf);
    assert_eq!(
      "Impoundment".parse::<SiteKind>().unwrap(),
      SiteKind::Impoundment
    );
    assert_eq!(SiteKind::Tsf.to_string(), "TSF");
    assert!("Quarry".parse::<SiteKind>().is_err());
  }

  #[test]
  fn facility_ref_serves_owner_and_associated_mines() {
    let id = |n| SiteId::new(crate::jurisdiction::Jurisdiction::Ontario, n).unwrap();
    let found = FacilityRef {
      facility_id:      Uuid::new_v4(),
      mine_id:          id(1),
      associated_mines: vec![id(2)],
      name:             "Shared Pond".into(),
      designation:      Designation::Named,
    };
    assert!(found.serves(id(1)));
    assert!(found.serves(id(2)));
    assert!(!found.serves(id(3)));
  }
}
