//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use cmti_core::{
  commodity::{CommodityRecord, MetalClass, Provenance},
  facility::{Designation, Impoundment, TailingsFacility},
  identifier::SiteId,
  jurisdiction::Jurisdiction,
  mine::{Mine, Orebody, Reference},
  owner::{Owner, OwnerAssociation},
  store::MineStore,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn id(n: u32) -> SiteId { SiteId::new(Jurisdiction::Ontario, n).unwrap() }

/// A mine carrying its default facility and default impoundment.
fn mine(n: u32, name: &str) -> Mine {
  let mut mine = Mine::new(id(n), name, Jurisdiction::Ontario);
  let mut facility = TailingsFacility::default_for(name, id(n));
  facility
    .attach_impoundment(Impoundment::default_for(&facility.name))
    .unwrap();
  mine.attach_facility(facility).unwrap();
  mine
}

fn full_mine() -> Mine {
  let mut m = mine(1, "Big Mine");
  m.location.latitude = Some(48.5);
  m.location.longitude = Some(-81.25);
  m.location.utm_zone = Some(17);
  m.details.last_revised = NaiveDate::from_ymd_opt(2024, 3, 1);
  m.details.mine_status = Some("Active".into());
  m.details.year_opened = Some(1912);

  let mut au = CommodityRecord::new("Au");
  au.produced = Some(1_250_000.0);
  au.produced_unit = Some("oz".into());
  au.metal_class = Some(MetalClass::Metal);
  au.provenance = Some(Provenance {
    source:     "OMI".into(),
    year_start: None,
    year_end:   None,
  });
  m.add_commodity(au).unwrap();
  m.add_commodity(CommodityRecord::new("Cu")).unwrap();

  m.add_alias("Old Big");
  m.add_alias("Big Pit");
  m.owners.push(OwnerAssociation::current(Owner::new("Acme Mining")));
  m.owners.push(OwnerAssociation::past(Owner::new("Prior Corp")));
  m.references.push(Reference {
    source:    "OMI".into(),
    source_id: Some("MDI123".into()),
    link:      None,
  });
  m.orebodies.push(Orebody {
    ore_type:  Some("Lode".into()),
    ore_class: None,
    minerals:  Some("Quartz".into()),
  });

  let facility = &mut m.facilities[0];
  facility.hazard_class = Some("High".into());
  facility.impoundments[0].area = Some(0.5);
  m
}

// ─── Mines ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_full_graph() {
  let s = store().await;
  let original = full_mine();
  s.insert_mine(original.clone()).await.unwrap();

  let fetched = s.get_mine(id(1)).await.unwrap().expect("mine stored");
  assert_eq!(fetched, original);
}

#[tokio::test]
async fn get_mine_missing_returns_none() {
  let s = store().await;
  assert!(s.get_mine(id(404)).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_mine_is_an_integrity_error() {
  let s = store().await;
  s.insert_mine(mine(1, "First")).await.unwrap();

  let err = s.insert_mine(mine(1, "Second")).await.unwrap_err();
  assert!(matches!(err, Error::Integrity(_)), "got {err:?}");

  let kept = s.get_mine(id(1)).await.unwrap().unwrap();
  assert_eq!(kept.name, "First");
}

#[tokio::test]
async fn failed_insert_leaves_nothing_behind() {
  let s = store().await;
  let mut bad = mine(2, "Doubled");
  // Bypass the in-memory check to hit the database rule.
  bad.facilities.push(TailingsFacility::default_for("Doubled", id(2)));

  let err = s.insert_mine(bad).await.unwrap_err();
  assert!(matches!(err, Error::Integrity(_)), "got {err:?}");
  assert!(s.get_mine(id(2)).await.unwrap().is_none());
  assert!(s.site_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn list_mines_is_ordered_by_identifier() {
  let s = store().await;
  s.insert_mine(mine(3, "Third")).await.unwrap();
  s.insert_mine(mine(1, "First")).await.unwrap();
  s.insert_mine(mine(2, "Second")).await.unwrap();

  let names: Vec<_> = s
    .list_mines()
    .await
    .unwrap()
    .into_iter()
    .map(|m| m.name)
    .collect();
  assert_eq!(names, ["First", "Second", "Third"]);
}

#[tokio::test]
async fn owners_resolved_by_name_are_shared() {
  let s = store().await;
  let owner = Owner::new("Acme Mining");

  let mut a = mine(1, "A");
  a.owners.push(OwnerAssociation::current(owner.clone()));
  let mut b = mine(2, "B");
  b.owners.push(OwnerAssociation::past(owner.clone()));
  s.insert_mine(a).await.unwrap();
  s.insert_mine(b).await.unwrap();

  let b = s.get_mine(id(2)).await.unwrap().unwrap();
  assert_eq!(b.owners.len(), 1);
  assert_eq!(b.owners[0].owner, owner);
  assert!(!b.owners[0].is_current_owner);
}

// ─── Facilities ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn attach_facility_appends_after_default() {
  let s = store().await;
  s.insert_mine(mine(1, "Big Mine")).await.unwrap();

  let mut tsf = TailingsFacility::named("East Pond", Some(id(20)));
  tsf
    .attach_impoundment(Impoundment::default_for("East Pond"))
    .unwrap();
  s.attach_facility(id(1), tsf).await.unwrap();

  let fetched = s.get_mine(id(1)).await.unwrap().unwrap();
  let names: Vec<_> = fetched.facilities.iter().map(|f| f.name.as_str()).collect();
  assert_eq!(names, ["defaultTSF_Big Mine", "East Pond"]);
  assert_eq!(fetched.facilities[1].impoundments.len(), 1);
}

#[tokio::test]
async fn attach_facility_to_missing_mine_fails() {
  let s = store().await;
  let err = s
    .attach_facility(id(9), TailingsFacility::named("Orphan", Some(id(10))))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::MineNotFound(m) if m == id(9)));
}

#[tokio::test]
async fn second_default_facility_is_refused() {
  let s = store().await;
  s.insert_mine(mine(1, "Big Mine")).await.unwrap();

  let err = s
    .attach_facility(id(1), TailingsFacility::default_for("Big Mine", id(1)))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Integrity(_)), "got {err:?}");
  assert_eq!(s.get_mine(id(1)).await.unwrap().unwrap().facilities.len(), 1);
}

#[tokio::test]
async fn find_facility_by_own_and_mine_identifier() {
  let s = store().await;
  s.insert_mine(mine(1, "Big Mine")).await.unwrap();
  s.attach_facility(id(1), TailingsFacility::named("East Pond", Some(id(20))))
    .await
    .unwrap();

  let by_mine = s.find_facility(id(1)).await.unwrap().unwrap();
  assert_eq!(by_mine.designation, Designation::Default);
  assert_eq!(by_mine.mine_id, id(1));

  let by_own = s.find_facility(id(20)).await.unwrap().unwrap();
  assert_eq!(by_own.name, "East Pond");
  assert_eq!(by_own.designation, Designation::Named);
  assert_eq!(by_own.mine_id, id(1));

  assert!(s.find_facility(id(99)).await.unwrap().is_none());
}

#[tokio::test]
async fn find_facility_prefers_named_over_default() {
  let s = store().await;
  s.insert_mine(mine(1, "Big Mine")).await.unwrap();
  s.attach_facility(id(1), TailingsFacility::named("Same Id", Some(id(1))))
    .await
    .unwrap();

  let found = s.find_facility(id(1)).await.unwrap().unwrap();
  assert_eq!(found.name, "Same Id");
}

#[tokio::test]
async fn named_facility_identifiers_are_unique() {
  let s = store().await;
  s.insert_mine(mine(1, "Big Mine")).await.unwrap();
  s.insert_mine(mine(2, "Other Mine")).await.unwrap();
  s.attach_facility(id(1), TailingsFacility::named("East Pond", Some(id(20))))
    .await
    .unwrap();

  for parent in [id(1), id(2)] {
    let err = s
      .attach_facility(parent, TailingsFacility::named("East Pond", Some(id(20))))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Integrity(_)), "got {err:?}");
  }
  assert_eq!(s.get_mine(id(1)).await.unwrap().unwrap().facilities.len(), 2);
  assert_eq!(s.get_mine(id(2)).await.unwrap().unwrap().facilities.len(), 1);
}

#[tokio::test]
async fn facility_attached_with_associated_mines() {
  let s = store().await;
  s.insert_mine(mine(1, "Big Mine")).await.unwrap();
  s.insert_mine(mine(2, "Small Mine")).await.unwrap();

  let mut shared = TailingsFacility::named("Shared Pond", Some(id(20)));
  shared.associate_mine(id(1), id(2));
  s.attach_facility(id(1), shared).await.unwrap();

  let found = s.find_facility(id(20)).await.unwrap().unwrap();
  assert_eq!(found.mine_id, id(1));
  assert_eq!(found.associated_mines, [id(2)]);

  let big = s.get_mine(id(1)).await.unwrap().unwrap();
  assert_eq!(big.facilities[1].associated_mines, [id(2)]);
}

#[tokio::test]
async fn facility_with_missing_associated_mine_is_not_written() {
  let s = store().await;
  s.insert_mine(mine(1, "Big Mine")).await.unwrap();

  let mut shared = TailingsFacility::named("Shared Pond", Some(id(20)));
  shared.associate_mine(id(1), id(7));
  let err = s.attach_facility(id(1), shared).await.unwrap_err();
  assert!(matches!(err, Error::MineNotFound(m) if m == id(7)), "got {err:?}");
  assert!(s.find_facility(id(20)).await.unwrap().is_none());
}

#[tokio::test]
async fn associate_facility_links_further_mines() {
  let s = store().await;
  s.insert_mine(mine(1, "Big Mine")).await.unwrap();
  s.insert_mine(mine(2, "Small Mine")).await.unwrap();
  s.insert_mine(mine(3, "Third Mine")).await.unwrap();
  s.attach_facility(id(1), TailingsFacility::named("East Pond", Some(id(20))))
    .await
    .unwrap();
  let pond = s.find_facility(id(20)).await.unwrap().unwrap();
  assert!(pond.associated_mines.is_empty());

  s.associate_facility(id(3), pond.facility_id).await.unwrap();
  s.associate_facility(id(2), pond.facility_id).await.unwrap();

  let pond = s.find_facility(id(20)).await.unwrap().unwrap();
  assert_eq!(pond.associated_mines, [id(3), id(2)]);
  assert!(pond.serves(id(1)) && pond.serves(id(2)));

  let again = s.associate_facility(id(2), pond.facility_id).await.unwrap_err();
  assert!(matches!(again, Error::Integrity(_)), "got {again:?}");
  let owner = s.associate_facility(id(1), pond.facility_id).await.unwrap_err();
  assert!(matches!(owner, Error::Integrity(_)), "got {owner:?}");
  let no_mine = s.associate_facility(id(9), pond.facility_id).await.unwrap_err();
  assert!(matches!(no_mine, Error::MineNotFound(m) if m == id(9)));
  let missing = Uuid::new_v4();
  let no_facility = s.associate_facility(id(2), missing).await.unwrap_err();
  assert!(matches!(no_facility, Error::FacilityNotFound(f) if f == missing));
}

// ─── Impoundments ────────────────────────────────────────────────────────────

#[tokio::test]
async fn attach_impoundment_appends() {
  let s = store().await;
  s.insert_mine(mine(1, "Big Mine")).await.unwrap();
  let facility = s.find_facility(id(1)).await.unwrap().unwrap();

  s.attach_impoundment(facility.facility_id, Impoundment::named("Cell 1", Some(id(30))))
    .await
    .unwrap();

  let fetched = s.get_mine(id(1)).await.unwrap().unwrap();
  let names: Vec<_> = fetched.facilities[0]
    .impoundments
    .iter()
    .map(|i| i.name.as_str())
    .collect();
  assert_eq!(names, ["defaultTSF_Big Mine_defaultImpoundment", "Cell 1"]);
}

#[tokio::test]
async fn attach_impoundment_to_missing_facility_fails() {
  let s = store().await;
  let missing = Uuid::new_v4();
  let err = s
    .attach_impoundment(missing, Impoundment::named("Cell 1", None))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::FacilityNotFound(f) if f == missing));
}

#[tokio::test]
async fn second_default_impoundment_is_refused() {
  let s = store().await;
  s.insert_mine(mine(1, "Big Mine")).await.unwrap();
  let facility = s.find_facility(id(1)).await.unwrap().unwrap();

  let err = s
    .attach_impoundment(facility.facility_id, Impoundment::default_for("again"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Integrity(_)), "got {err:?}");
}

#[tokio::test]
async fn impoundment_identifiers_are_unique() {
  let s = store().await;
  s.insert_mine(mine(1, "Big Mine")).await.unwrap();
  let facility = s.find_facility(id(1)).await.unwrap().unwrap();
  s.attach_impoundment(facility.facility_id, Impoundment::named("Cell 1", Some(id(30))))
    .await
    .unwrap();

  let err = s
    .attach_impoundment(facility.facility_id, Impoundment::named("Cell 1", Some(id(30))))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Integrity(_)), "got {err:?}");

  // Unidentified impoundments are not subject to the rule.
  for name in ["Cell 2", "Cell 3"] {
    s.attach_impoundment(facility.facility_id, Impoundment::named(name, None))
      .await
      .unwrap();
  }
  let fetched = s.get_mine(id(1)).await.unwrap().unwrap();
  assert_eq!(fetched.facilities[0].impoundments.len(), 4);
}

// ─── Identifiers ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn site_ids_cover_every_level() {
  let s = store().await;
  s.insert_mine(mine(1, "Big Mine")).await.unwrap();
  s.attach_facility(id(1), TailingsFacility::named("East Pond", Some(id(20))))
    .await
    .unwrap();
  let tsf = s.find_facility(id(20)).await.unwrap().unwrap();
  s.attach_impoundment(tsf.facility_id, Impoundment::named("Cell 1", Some(id(30))))
    .await
    .unwrap();

  assert_eq!(s.site_ids().await.unwrap(), [id(1), id(20), id(30)]);
}
