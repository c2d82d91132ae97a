//! Graph → rows.
//!
//! A mine flattens into one primary row, plus one row for every named
//! facility and every named impoundment. Default facilities and impoundments
//! never get rows of their own: their fields are merged into the row of
//! their parent, without overwriting anything the parent already set.

use std::collections::BTreeSet;

use cmti_core::{
  facility::{Impoundment, TailingsFacility},
  identifier::SiteId,
  mine::Mine,
};

use crate::{columns::*, normalize::lon_to_utm_zone, row::Row, units};

/// Flatten `mine` with the standard slot counts.
pub fn dehydrate(mine: &Mine) -> Vec<Row> {
  dehydrate_with(mine, COMMODITY_SLOTS, SOURCE_SLOTS)
}

/// Flatten `mine`, writing at most `commodity_slots` commodities and
/// `source_slots` references onto the primary row. Anything past either
/// limit is dropped silently.
pub fn dehydrate_with(
  mine: &Mine,
  commodity_slots: usize,
  source_slots: usize,
) -> Vec<Row> {
  let base = mine_row(mine);
  let mut primary = base.clone();
  let mut children = Vec::new();

  for facility in &mine.facilities {
    if facility.is_default() {
      primary.merge_absent(&facility_fields(facility));
      let rows = impoundment_rows(facility, &mut primary, &base);
      children.extend(rows);
    } else {
      let mut row = named_facility_row(mine, facility, &base);
      let rows = impoundment_rows(facility, &mut row, &base);
      children.push(row);
      children.extend(rows);
    }
  }

  write_commodities(mine, &mut primary, commodity_slots);
  write_references(mine, &mut primary, source_slots);

  let mut rows = Vec::with_capacity(children.len() + 1);
  rows.push(primary);
  rows.extend(children);
  rows
}

fn id_text(id: Option<SiteId>) -> Option<String> { id.map(|id| id.to_string()) }

/// Join names with `", "`, dropping the `"Unknown"` sentinel and repeats.
fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> Option<String> {
  let mut seen = BTreeSet::new();
  let kept: Vec<&str> = names
    .map(str::trim)
    .filter(|n| !n.is_empty() && !n.eq_ignore_ascii_case(UNKNOWN))
    .filter(|n| seen.insert(*n))
    .collect();
  (!kept.is_empty()).then(|| kept.join(", "))
}

// ─── Mine ────────────────────────────────────────────────────────────────────

fn mine_row(mine: &Mine) -> Row {
  let mut row = Row::new();
  row.set(SITE_NAME, &mine.name);
  row.set(SITE_TYPE, SITE_TYPE_MINE);
  row.set(CMTI_ID, mine.site_id.to_string());
  row.set(PROVINCE_TERRITORY, mine.jurisdiction.code());
  row.set(COUNTRY, CANADA);

  let loc = &mine.location;
  row.set(LATITUDE, loc.latitude);
  row.set(LONGITUDE, loc.longitude);
  row.set(DATUM, loc.datum.clone());
  row.set(UTM_ZONE, loc.utm_zone);
  row.set(EASTING, loc.easting);
  row.set(NORTHING, loc.northing);
  row.set(NTS_AREA, loc.nts_area.clone());
  row.set(MINING_DISTRICT, loc.mining_district.clone());

  let d = &mine.details;
  row.set(LAST_REVISED, d.last_revised);
  row.set(MINE_TYPE, d.mine_type.clone());
  row.set(MINING_METHOD, d.mining_method.clone());
  row.set(MINE_STATUS, d.mine_status.clone());
  row.set(DEV_STAGE, d.development_stage.clone());
  row.set(DS_COMMENTS, d.development_comments.clone());
  row.set(SITE_ACCESS, d.site_access.clone());
  row.set(SA_COMMENTS, d.site_access_comments.clone());
  row.set(SHAFT_DEPTH, d.shaft_depth);
  row.set(CONSTRUCTION_YEAR, d.construction_year);
  row.set(YEAR_OPENED, d.year_opened);
  row.set(YEAR_CLOSED, d.year_closed);
  row.set(RESERVES_RESOURCES, d.reserves_resources);
  row.set(SEDAR, d.sedar.clone());
  row.set(PROCESSING_METHOD, d.processing_method.clone());
  row.set(ORE_PROCESSED, d.ore_processed);
  row.set(ORE_PROCESSED_UNIT, d.ore_processed_unit.clone());
  row.set(NOTES, d.notes.clone());

  row.set(
    SITE_ALIASES,
    join_names(mine.aliases.iter().map(|a| a.name.as_str())),
  );
  row.set(
    OWNER_OPERATOR,
    join_names(
      mine
        .owners
        .iter()
        .filter(|o| o.is_current_owner)
        .map(|o| o.owner.name.as_str()),
    ),
  );
  row.set(
    PAST_OWNERS,
    join_names(
      mine
        .owners
        .iter()
        .filter(|o| !o.is_current_owner)
        .map(|o| o.owner.name.as_str()),
    ),
  );

  for (i, ore) in mine.orebodies.iter().take(OREBODY_SLOTS).enumerate() {
    let [ore_type, ore_class, minerals] = orebody(i + 1);
    row.set(ore_type, ore.ore_type.clone());
    row.set(ore_class, ore.ore_class.clone());
    row.set(minerals, ore.minerals.clone());
  }
  row
}

/// Commodity slots on the primary row, in record order. A symbol already in
/// an earlier slot is skipped.
fn write_commodities(mine: &Mine, row: &mut Row, slots: usize) {
  let mut seen = BTreeSet::new();
  let mut slot = 0;
  for record in &mine.commodities {
    if slot == slots {
      break;
    }
    if !seen.insert(record.symbol.as_str()) {
      continue;
    }
    slot += 1;
    let symbol = record.symbol.as_str();
    row.set(commodity(slot), symbol);
    row.set(grade(symbol), record.grade);
    row.set(
      produced(symbol),
      record
        .produced
        .map(|v| in_worksheet_unit(v, record.produced_unit.as_deref(), symbol)),
    );
    row.set(
      contained(symbol),
      record
        .contained
        .map(|v| in_worksheet_unit(v, record.contained_unit.as_deref(), symbol)),
    );
  }
}

/// Express a stored quantity in the worksheet unit for `symbol`.
fn in_worksheet_unit(value: f64, unit: Option<&str>, symbol: &str) -> f64 {
  let target = quantity_unit(symbol);
  match unit {
    Some(unit) if unit != target => {
      units::convert(value, unit, target).unwrap_or(value)
    }
    _ => value,
  }
}

fn write_references(mine: &Mine, row: &mut Row, slots: usize) {
  let usable = mine.references.iter().filter(|r| {
    let source = r.source.trim();
    !source.is_empty() && !source.eq_ignore_ascii_case(UNKNOWN)
  });
  for (i, reference) in usable.take(slots).enumerate() {
    let slot = i + 1;
    row.set(source(slot), &reference.source);
    row.set(source_id(slot), reference.source_id.clone());
    row.set(source_link(slot), reference.link.clone());
  }
}

// ─── Facilities and impoundments ─────────────────────────────────────────────

/// The facility-level columns of `facility`, nothing else.
fn facility_fields(facility: &TailingsFacility) -> Row {
  let mut row = Row::new();
  row.set(MINE_STATUS, facility.status.clone());
  row.set(LATITUDE, facility.latitude);
  row.set(LONGITUDE, facility.longitude);
  row.set(HAZARD_CLASS, facility.hazard_class.clone());
  row.set(HAZARD_SYSTEM, facility.hazard_system.clone());
  row.set(NOAMI_STATUS, facility.noami_status.clone());
  row.set(NOAMI_SITE_CLASS, facility.noami_site_class.clone());
  row.set(PRP_RATING, facility.prp_rating.clone());
  row.set(REHAB_PLAN, facility.rehab_plan.clone());
  row.set(EWS, facility.ews.clone());
  row.set(EWS_RATING, facility.ews_rating.clone());
  row
}

fn impoundment_fields(impoundment: &Impoundment) -> Row {
  let mut row = Row::new();
  row.set(TAILINGS_AREA, impoundment.area);
  row.set(TAILINGS_AREA_FROM_IMAGES, impoundment.area_from_images);
  row.set(TAILINGS_AREA_NOTES, impoundment.area_notes.clone());
  row.set(TAILINGS_VOLUME, impoundment.volume);
  row.set(TAILINGS_CAPACITY, impoundment.capacity);
  row.set(CURRENT_MAX_HEIGHT, impoundment.max_height);
  row.set(TAILINGS_STORAGE_METHOD, impoundment.storage_method.clone());
  row.set(RAISE_TYPE, impoundment.raise_type.clone());
  row.set(ACID_GENERATING, impoundment.acid_generating);
  row.set(TREATMENT, impoundment.treatment.clone());
  row.set(RATING_INDEX, impoundment.rating_index.clone());
  row.set(STABILITY_CONCERNS, impoundment.stability_concerns.clone());
  row
}

/// The owning mine first, then every further mine the facility serves.
fn parent_ids(mine: &Mine, facility: &TailingsFacility) -> String {
  std::iter::once(mine.site_id)
    .chain(facility.associated_mines.iter().copied())
    .map(|id| id.to_string())
    .collect::<Vec<_>>()
    .join("; ")
}

fn named_facility_row(mine: &Mine, facility: &TailingsFacility, base: &Row) -> Row {
  let mut row = facility_fields(facility);
  row.set(SITE_NAME, &facility.name);
  row.set(SITE_TYPE, SITE_TYPE_TSF);
  row.set(CMTI_ID, id_text(facility.site_id));
  row.set(PARENT, &mine.name);
  row.set(PARENT_ID, parent_ids(mine, facility));
  if let Some(longitude) = facility.longitude {
    row.set(UTM_ZONE, lon_to_utm_zone(longitude));
  }
  row.fill_from(base, INHERITED_FROM_MINE);
  row
}

/// Merge the default impoundment of `facility` into `target`, then build a
/// row for each named impoundment.
fn impoundment_rows(facility: &TailingsFacility, target: &mut Row, base: &Row) -> Vec<Row> {
  if let Some(default) = facility.default_impoundment() {
    target.merge_absent(&impoundment_fields(default));
  }

  facility
    .impoundments
    .iter()
    .filter(|i| !i.is_default())
    .map(|impoundment| {
      let mut row = impoundment_fields(impoundment);
      row.set(SITE_NAME, &impoundment.name);
      row.set(SITE_TYPE, SITE_TYPE_IMPOUNDMENT);
      row.set(CMTI_ID, id_text(impoundment.site_id));
      row.set(PARENT, &facility.name);
      row.set(PARENT_ID, id_text(facility.site_id));
      row.fill_from(target, INHERITED_FROM_MINE);
      row.fill_from(target, INHERITED_FROM_FACILITY);
      row.fill_from(base, INHERITED_FROM_MINE);
      row
    })
    .collect()
}
