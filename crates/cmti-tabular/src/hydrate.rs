//! Row → graph.
//!
//! A [`Hydrator`] turns one normalised worksheet row into a mine (with its
//! default facility and impoundment) or into a named facility or impoundment
//! waiting to be attached to a parent that already exists.
//!
//! The hydrator borrows the identifier issuer mutably for its whole life, so
//! identifier allocation is serialised through whoever owns it. A deferred
//! hydrator only computes identifiers; the caller advances the issuer with
//! [`Hydrator::commit`] once the site is stored.

use std::collections::HashMap;

use cmti_core::{
  commodity::{CommodityRecord, CommodityTables, Provenance},
  facility::{Impoundment, TailingsFacility},
  identifier::{IdIssuer, SiteId},
  jurisdiction::Jurisdiction,
  mine::{Location, Mine, MineDetails, Orebody},
  owner::{Owner, OwnerAssociation},
  store::SiteKind,
};
use serde::{Deserialize, Serialize};

use crate::{
  columns::*,
  error::{Error, Result},
  row::Row,
  slots,
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// How owner names map onto owner entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerPolicy {
  /// Every mention creates a fresh owner.
  #[default]
  PerMention,
  /// Mentions with the same trimmed, case-folded name share one owner for
  /// the lifetime of the hydrator.
  ResolveByName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrateOptions {
  pub owner_policy:    OwnerPolicy,
  pub commodity_slots: usize,
  pub source_slots:    usize,
}

impl Default for HydrateOptions {
  fn default() -> Self {
    Self {
      owner_policy:    OwnerPolicy::default(),
      commodity_slots: COMMODITY_SLOTS,
      source_slots:    SOURCE_SLOTS,
    }
  }
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// What a row hydrated into.
#[derive(Debug, Clone, PartialEq)]
pub enum Hydrated {
  Mine(Mine),
  /// A named facility for the mine identified by `parent`. Any further
  /// mines it serves are in the facility's `associated_mines`.
  Facility {
    parent:   SiteId,
    facility: TailingsFacility,
  },
  /// A named impoundment for the facility identified by `parent`.
  Impoundment {
    parent:      SiteId,
    impoundment: Impoundment,
  },
}

impl Hydrated {
  /// The site's own identifier.
  pub fn site_id(&self) -> Option<SiteId> {
    match self {
      Hydrated::Mine(mine) => Some(mine.site_id),
      Hydrated::Facility { facility, .. } => facility.site_id,
      Hydrated::Impoundment { impoundment, .. } => impoundment.site_id,
    }
  }

  pub fn kind(&self) -> SiteKind {
    match self {
      Hydrated::Mine(_) => SiteKind::Mine,
      Hydrated::Facility { .. } => SiteKind::Tsf,
      Hydrated::Impoundment { .. } => SiteKind::Impoundment,
    }
  }
}

/// A hydrated site plus the steps that failed along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Hydration {
  pub site:     Hydrated,
  pub warnings: Vec<String>,
}

// ─── Field mapping ───────────────────────────────────────────────────────────

fn int32(row: &Row, column: &str) -> Option<i32> {
  row.int(column).and_then(|v| i32::try_from(v).ok())
}

fn location(row: &Row) -> Location {
  Location {
    latitude:        row.float(LATITUDE),
    longitude:       row.float(LONGITUDE),
    datum:           row.text(DATUM),
    utm_zone:        int32(row, UTM_ZONE),
    easting:         row.int(EASTING),
    northing:        row.int(NORTHING),
    nts_area:        row.text(NTS_AREA),
    mining_district: row.text(MINING_DISTRICT),
  }
}

fn details(row: &Row) -> MineDetails {
  MineDetails {
    last_revised:         row.date(LAST_REVISED),
    mine_type:            row.text(MINE_TYPE),
    mining_method:        row.text(MINING_METHOD),
    mine_status:          row.text(MINE_STATUS),
    development_stage:    row.text(DEV_STAGE),
    development_comments: row.text(DS_COMMENTS),
    site_access:          row.text(SITE_ACCESS),
    site_access_comments: row.text(SA_COMMENTS),
    shaft_depth:          row.float(SHAFT_DEPTH),
    construction_year:    row.year(CONSTRUCTION_YEAR),
    year_opened:          row.year(YEAR_OPENED),
    year_closed:          row.year(YEAR_CLOSED),
    reserves_resources:   row.float(RESERVES_RESOURCES),
    sedar:                row.text(SEDAR),
    processing_method:    row.text(PROCESSING_METHOD),
    ore_processed:        row.float(ORE_PROCESSED),
    ore_processed_unit:   row.text(ORE_PROCESSED_UNIT),
    notes:                row.text(NOTES),
  }
}

/// Every orebody slot with at least one field set.
fn orebodies(row: &Row) -> Vec<Orebody> {
  (1..=OREBODY_SLOTS)
    .map(|slot| {
      let [ore_type, ore_class, minerals] = orebody(slot);
      Orebody {
        ore_type:  row.text(&ore_type),
        ore_class: row.text(&ore_class),
        minerals:  row.text(&minerals),
      }
    })
    .filter(|orebody| *orebody != Orebody::default())
    .collect()
}

fn facility_fields(row: &Row, tsf: &mut TailingsFacility) {
  tsf.status = row.text(MINE_STATUS);
  tsf.latitude = row.float(LATITUDE);
  tsf.longitude = row.float(LONGITUDE);
  tsf.hazard_class = row.text(HAZARD_CLASS);
  tsf.hazard_system = row.text(HAZARD_SYSTEM);
  tsf.noami_status = row.text(NOAMI_STATUS);
  tsf.noami_site_class = row.text(NOAMI_SITE_CLASS);
  tsf.prp_rating = row.text(PRP_RATING);
  tsf.rehab_plan = row.text(REHAB_PLAN);
  tsf.ews = row.text(EWS);
  tsf.ews_rating = row.text(EWS_RATING);
}

fn impoundment_fields(row: &Row, imp: &mut Impoundment) {
  imp.area = row.float(TAILINGS_AREA);
  imp.area_from_images = row.float(TAILINGS_AREA_FROM_IMAGES);
  imp.area_notes = row.text(TAILINGS_AREA_NOTES);
  imp.volume = row.float(TAILINGS_VOLUME);
  imp.capacity = row.float(TAILINGS_CAPACITY);
  imp.max_height = row.float(CURRENT_MAX_HEIGHT);
  imp.storage_method = row.text(TAILINGS_STORAGE_METHOD);
  imp.raise_type = row.text(RAISE_TYPE);
  imp.acid_generating = row.bool(ACID_GENERATING);
  imp.treatment = row.text(TREATMENT);
  imp.rating_index = row.text(RATING_INDEX);
  imp.stability_concerns = row.text(STABILITY_CONCERNS);
}

/// Split a comma-separated name list, dropping blanks, the `"Unknown"`
/// sentinel and repeats.
fn split_names(value: Option<String>) -> Vec<String> {
  let mut names: Vec<String> = Vec::new();
  for name in value.iter().flat_map(|v| v.split(',')).map(str::trim) {
    if name.is_empty() || name.eq_ignore_ascii_case(UNKNOWN) {
      continue;
    }
    if !names.iter().any(|n| n == name) {
      names.push(name.to_owned());
    }
  }
  names
}

fn parent_id(row: &Row, kind: SiteKind) -> Result<SiteId> {
  row
    .text(PARENT_ID)
    .and_then(|id| id.parse().ok())
    .ok_or(Error::MissingParentId { kind })
}

/// A facility's parents: `Parent_ID` may list several mines separated by
/// `;` or `,`. The first is the owner; repeats are dropped.
fn parent_ids(row: &Row) -> Result<(SiteId, Vec<SiteId>)> {
  let missing = || Error::MissingParentId {
    kind: SiteKind::Tsf,
  };
  let text = row.text(PARENT_ID).ok_or_else(missing)?;

  let mut ids: Vec<SiteId> = Vec::new();
  for part in text.split([';', ',']).map(str::trim).filter(|p| !p.is_empty()) {
    let id = part.parse::<SiteId>().map_err(|_| missing())?;
    if !ids.contains(&id) {
      ids.push(id);
    }
  }
  let mut ids = ids.into_iter();
  let owner = ids.next().ok_or_else(missing)?;
  Ok((owner, ids.collect()))
}

/// The jurisdiction a row is filed under: `Province_Territory` when set,
/// else the prefix of the row's own identifier, else `fallback`.
fn row_jurisdiction(
  row: &Row,
  existing: Option<SiteId>,
  fallback: Option<Jurisdiction>,
) -> Result<Jurisdiction> {
  let stated = row
    .text(PROVINCE_TERRITORY)
    .map(|text| Jurisdiction::parse(&text))
    .transpose()?;
  match (stated, existing) {
    (Some(stated), Some(id)) if id.jurisdiction() != stated => {
      Err(Error::JurisdictionMismatch { id, stated })
    }
    (Some(stated), _) => Ok(stated),
    (None, Some(id)) => Ok(id.jurisdiction()),
    (None, None) => fallback.ok_or(Error::MissingJurisdiction),
  }
}

/// Log a failed step and keep going.
fn record_step(
  warnings: &mut Vec<String>,
  site: &str,
  step: &str,
  result: cmti_core::Result<()>,
) {
  if let Err(err) = result {
    tracing::warn!(site, step, error = %err, "hydration step failed");
    warnings.push(format!("{step}: {err}"));
  }
}

// ─── Hydrator ────────────────────────────────────────────────────────────────

pub struct Hydrator<'a> {
  issuer:   &'a mut IdIssuer,
  tables:   &'a CommodityTables,
  options:  HydrateOptions,
  owners:   HashMap<String, Owner>,
  deferred: bool,
}

impl<'a> Hydrator<'a> {
  pub fn new(issuer: &'a mut IdIssuer, tables: &'a CommodityTables) -> Self {
    Self::with_options(issuer, tables, HydrateOptions::default())
  }

  pub fn with_options(
    issuer: &'a mut IdIssuer,
    tables: &'a CommodityTables,
    options: HydrateOptions,
  ) -> Self {
    Self {
      issuer,
      tables,
      options,
      owners: HashMap::new(),
      deferred: false,
    }
  }

  /// Leave the issuer untouched while hydrating. New identifiers are the
  /// issuer's upcoming ones and stay available until passed to
  /// [`Hydrator::commit`].
  pub fn deferred(mut self) -> Self {
    self.deferred = true;
    self
  }

  /// Advance the issuer past `id`, typically once its site is stored.
  pub fn commit(&mut self, id: SiteId) -> Result<()> {
    self.issuer.seed_from_ids([&id])?;
    Ok(())
  }

  pub fn options(&self) -> &HydrateOptions { &self.options }

  /// Hydrate a row, reading its kind from `Site_Type`. An empty site type
  /// means a mine.
  pub fn hydrate_row(&mut self, row: &Row) -> Result<Hydration> {
    let kind = match row.text(SITE_TYPE) {
      None => SiteKind::Mine,
      Some(label) => label
        .parse::<SiteKind>()
        .map_err(|_| Error::UnknownSiteType(label))?,
    };
    self.hydrate(row, kind)
  }

  /// Hydrate a row as a site of the given kind.
  ///
  /// Only problems with the site itself (no name, no usable jurisdiction or
  /// parent, issuer failures) are errors. A failing sub-step is logged and
  /// reported through [`Hydration::warnings`].
  pub fn hydrate(&mut self, row: &Row, kind: SiteKind) -> Result<Hydration> {
    match kind {
      SiteKind::Mine => self.mine(row),
      SiteKind::Tsf => self.facility(row),
      SiteKind::Impoundment => self.impoundment(row),
    }
  }

  fn mine(&mut self, row: &Row) -> Result<Hydration> {
    let name = row.text(SITE_NAME).ok_or(Error::MissingName)?;
    let mut warnings = Vec::new();

    let existing = self.existing_id(row, &mut warnings);
    let jurisdiction = row_jurisdiction(row, existing, None)?;
    let site_id = self.assign_id(existing, jurisdiction)?;

    let mut mine = Mine::new(site_id, name, jurisdiction);
    mine.location = location(row);
    mine.details = details(row);

    let result = self.commodities(row, &mut mine);
    record_step(&mut warnings, &mine.name, "commodities", result);

    for alias in split_names(row.text(SITE_ALIASES)) {
      mine.add_alias(alias);
    }

    self.owners(row, &mut mine);

    mine
      .references
      .extend(slots::reference_entries(row, self.options.source_slots));

    mine.orebodies.extend(orebodies(row));

    let result = default_facility(row, &mut mine);
    record_step(&mut warnings, &mine.name, "default facility", result);

    tracing::debug!(site_id = %mine.site_id, name = %mine.name, "hydrated mine");
    Ok(Hydration {
      site: Hydrated::Mine(mine),
      warnings,
    })
  }

  fn facility(&mut self, row: &Row) -> Result<Hydration> {
    let (parent, others) = parent_ids(row)?;
    let name = row.text(SITE_NAME).ok_or(Error::MissingName)?;
    let mut warnings = Vec::new();
    let site_id = self.child_id(row, parent, &mut warnings)?;

    let mut tsf = TailingsFacility::named(name, Some(site_id));
    facility_fields(row, &mut tsf);
    for mine in others {
      tsf.associate_mine(parent, mine);
    }

    let mut impoundment = Impoundment::default_for(&tsf.name);
    impoundment_fields(row, &mut impoundment);
    let result = tsf.attach_impoundment(impoundment);
    record_step(&mut warnings, &tsf.name, "default impoundment", result);

    Ok(Hydration {
      site: Hydrated::Facility {
        parent,
        facility: tsf,
      },
      warnings,
    })
  }

  fn impoundment(&mut self, row: &Row) -> Result<Hydration> {
    let parent = parent_id(row, SiteKind::Impoundment)?;
    let name = row.text(SITE_NAME).ok_or(Error::MissingName)?;
    let mut warnings = Vec::new();
    let site_id = self.child_id(row, parent, &mut warnings)?;

    let mut impoundment = Impoundment::named(name, Some(site_id));
    impoundment_fields(row, &mut impoundment);

    Ok(Hydration {
      site: Hydrated::Impoundment {
        parent,
        impoundment,
      },
      warnings,
    })
  }

  // ─── Identifiers ──────────────────────────────────────────────────────────

  /// The row's own identifier, if it has a well-formed one. A malformed
  /// identifier is reported and treated as absent.
  fn existing_id(&self, row: &Row, warnings: &mut Vec<String>) -> Option<SiteId> {
    let raw = row.text(CMTI_ID)?;
    match raw.parse::<SiteId>() {
      Ok(id) => Some(id),
      Err(err) => {
        tracing::warn!(id = %raw, error = %err, "ignoring malformed identifier");
        warnings.push(format!("identifier: {err}"));
        None
      }
    }
  }

  /// Keep an existing identifier (ratcheting the issuer past it), or issue
  /// a fresh one in `jurisdiction`. A deferred hydrator does neither to the
  /// issuer.
  fn assign_id(
    &mut self,
    existing: Option<SiteId>,
    jurisdiction: Jurisdiction,
  ) -> Result<SiteId> {
    match existing {
      Some(id) if self.deferred => Ok(id),
      Some(id) => {
        self.issuer.seed_from_ids([&id])?;
        Ok(id)
      }
      None if self.deferred => Ok(self.issuer.upcoming(jurisdiction)?),
      None => {
        let id = self.issuer.next(jurisdiction)?;
        tracing::debug!(%id, "issued site identifier");
        Ok(id)
      }
    }
  }

  /// Identifier for a facility or impoundment row. New identifiers are
  /// issued in the row's own jurisdiction, or the parent's when it has none.
  fn child_id(
    &mut self,
    row: &Row,
    parent: SiteId,
    warnings: &mut Vec<String>,
  ) -> Result<SiteId> {
    let existing = self.existing_id(row, warnings);
    let jurisdiction = row_jurisdiction(row, existing, Some(parent.jurisdiction()))?;
    self.assign_id(existing, jurisdiction)
  }

  // ─── Steps ────────────────────────────────────────────────────────────────

  fn commodities(&self, row: &Row, mine: &mut Mine) -> cmti_core::Result<()> {
    let provenance = slots::reference_entries(row, self.options.source_slots)
      .into_iter()
      .next()
      .map(|r| r.source);

    for entry in slots::commodity_entries(row, self.tables, self.options.commodity_slots) {
      let unit = quantity_unit(&entry.symbol);
      let mut record = CommodityRecord::new(entry.symbol);
      let q = entry.quantities;
      record.grade = q.grade;
      record.produced = q.produced;
      record.produced_unit = q.produced.map(|_| unit.to_owned());
      record.contained = q.contained;
      record.contained_unit = q.contained.map(|_| unit.to_owned());
      if let Some(source) = provenance.as_ref().filter(|_| !q.is_empty()) {
        record.provenance = Some(Provenance {
          source:     source.clone(),
          year_start: mine
            .details
            .year_opened
            .or(mine.details.construction_year),
          year_end:   mine.details.year_closed,
        });
      }
      self.tables.classify(&mut record);
      mine.add_commodity(record)?;
    }
    Ok(())
  }

  fn owner(&mut self, name: &str) -> Owner {
    match self.options.owner_policy {
      OwnerPolicy::PerMention => Owner::new(name),
      OwnerPolicy::ResolveByName => self
        .owners
        .entry(name.trim().to_lowercase())
        .or_insert_with(|| Owner::new(name))
        .clone(),
    }
  }

  fn owners(&mut self, row: &Row, mine: &mut Mine) {
    if let Some(current) = row
      .text(OWNER_OPERATOR)
      .filter(|o| !o.eq_ignore_ascii_case(UNKNOWN))
    {
      let owner = self.owner(&current);
      mine.owners.push(OwnerAssociation::current(owner));
    }
    for name in split_names(row.text(PAST_OWNERS)) {
      let owner = self.owner(&name);
      mine.owners.push(OwnerAssociation::past(owner));
    }
  }
}

/// Synthesise the mine's default facility and impoundment from the row.
fn default_facility(row: &Row, mine: &mut Mine) -> cmti_core::Result<()> {
  let mut tsf = TailingsFacility::default_for(&mine.name, mine.site_id);
  facility_fields(row, &mut tsf);

  let mut impoundment = Impoundment::default_for(&mine.name);
  impoundment_fields(row, &mut impoundment);
  tsf.attach_impoundment(impoundment)?;

  mine.attach_facility(tsf)
}
