//! Batch ingest and export against a [`MineStore`].
//!
//! Ingest runs every row through adapt → normalise → hydrate → persist and
//! reports one [`RowOutcome`] per input row. A bad row never stops the batch;
//! only an issuer misconfiguration does.

use std::{collections::HashSet, fmt};

use chrono::NaiveDate;
use cmti_core::{
  commodity::CommodityTables,
  facility::Designation,
  identifier::{IdIssuer, SiteId},
  store::{FacilityRef, MineStore, SiteKind},
};
use serde::{Deserialize, Serialize};

use crate::{
  columns::{CMTI_ID, SITE_TYPE},
  dehydrate::dehydrate_with,
  error::{Error, Result},
  hydrate::{HydrateOptions, Hydrated, Hydrator},
  normalize::{CellIssue, Normalizer},
  row::Row,
  schema::Schema,
  source::SourceKind,
};

fn store_error<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
  Error::Store(Box::new(err))
}

/// Everything an ingest run reads but does not own.
#[derive(Debug, Clone, Copy)]
pub struct IngestContext<'a> {
  pub tables:  &'a CommodityTables,
  pub options: HydrateOptions,
  /// Stands in for missing dates.
  pub as_of:   NaiveDate,
}

// ─── Reporting ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowStatus {
  /// A new mine graph was written.
  Inserted { id: SiteId },
  /// A named facility or impoundment was attached to `parent`.
  Attached { parent: SiteId, name: String },
  /// A stored facility was linked to further mines. Its stored attributes
  /// are left as they were.
  Associated { id: SiteId, mines: Vec<SiteId> },
  /// Required columns were missing; the row never reached hydration.
  Rejected { reason: String },
  /// The parent the row refers to does not exist.
  Skipped { reason: String },
  /// Hydration or the store refused the row.
  Failed { reason: String },
}

impl RowStatus {
  /// Whether the row's site is now in the store.
  fn is_stored(&self) -> bool {
    matches!(
      self,
      RowStatus::Inserted { .. } | RowStatus::Attached { .. } | RowStatus::Associated { .. }
    )
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowOutcome {
  /// Position of the row in the input.
  pub index:    usize,
  #[serde(flatten)]
  pub status:   RowStatus,
  /// Hydration steps that failed without failing the row.
  pub warnings: Vec<String>,
}

impl RowOutcome {
  fn new(index: usize, status: RowStatus) -> Self {
    Self {
      index,
      status,
      warnings: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
  pub inserted:   usize,
  pub attached:   usize,
  pub associated: usize,
  pub rejected:   usize,
  pub skipped:    usize,
  pub failed:     usize,
}

impl fmt::Display for BatchSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} inserted, {} attached, {} associated, {} rejected, {} skipped, {} failed",
      self.inserted,
      self.attached,
      self.associated,
      self.rejected,
      self.skipped,
      self.failed
    )
  }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
  /// One outcome per input row, in input order.
  pub outcomes: Vec<RowOutcome>,
  /// Cells replaced by their column default during normalisation.
  pub issues:   Vec<CellIssue>,
}

impl BatchReport {
  pub fn summary(&self) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for outcome in &self.outcomes {
      match outcome.status {
        RowStatus::Inserted { .. } => summary.inserted += 1,
        RowStatus::Attached { .. } => summary.attached += 1,
        RowStatus::Associated { .. } => summary.associated += 1,
        RowStatus::Rejected { .. } => summary.rejected += 1,
        RowStatus::Skipped { .. } => summary.skipped += 1,
        RowStatus::Failed { .. } => summary.failed += 1,
      }
    }
    summary
  }
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Ratchet `issuer` past every identifier already in `store`.
pub async fn seed_issuer<S: MineStore>(store: &S, issuer: &mut IdIssuer) -> Result<()> {
  let ids = store.site_ids().await.map_err(store_error)?;
  issuer.seed_from_ids(&ids)?;
  tracing::debug!(count = ids.len(), "seeded identifier issuer from store");
  Ok(())
}

/// Ingest `rows` laid out as `source` into `store`.
///
/// New identifiers are only taken from `issuer` once their row is stored, so
/// rows that fail or are skipped leave no gaps.
///
/// Returns `Err` only for failures that make the rest of the batch
/// meaningless: an issuer asked for a jurisdiction it does not cover.
pub async fn ingest<S: MineStore>(
  store: &S,
  issuer: &mut IdIssuer,
  source: SourceKind,
  rows: impl IntoIterator<Item = Row>,
  ctx: &IngestContext<'_>,
) -> Result<BatchReport> {
  let normalizer = Normalizer::new(Schema::worksheet(), ctx.as_of);
  let batch = normalizer
    .normalize_batch(rows.into_iter().map(|row| source.adapt(&row, ctx.tables)));

  let mut outcomes: Vec<RowOutcome> = batch
    .rejected
    .into_iter()
    .map(|(index, missing)| {
      RowOutcome::new(index, RowStatus::Rejected {
        reason: format!("missing required columns: {}", missing.join(", ")),
      })
    })
    .collect();

  let mut hydrator = Hydrator::with_options(issuer, ctx.tables, ctx.options).deferred();
  for (index, row) in batch.rows {
    let hydration = match hydrator.hydrate_row(&row) {
      Ok(hydration) => hydration,
      Err(err) if err.is_fatal() => return Err(err),
      Err(err) => {
        tracing::warn!(row = index, error = %err, "row failed to hydrate");
        outcomes.push(RowOutcome::new(index, RowStatus::Failed {
          reason: err.to_string(),
        }));
        continue;
      }
    };

    let site_id = hydration.site.site_id();
    let status = persist(store, hydration.site).await;
    if let Some(id) = site_id.filter(|_| status.is_stored()) {
      hydrator.commit(id)?;
    }
    match &status {
      RowStatus::Skipped { reason } => {
        tracing::warn!(row = index, %reason, "row skipped");
      }
      RowStatus::Failed { reason } => {
        tracing::warn!(row = index, %reason, "row failed to persist");
      }
      _ => {}
    }
    outcomes.push(RowOutcome {
      index,
      status,
      warnings: hydration.warnings,
    });
  }

  outcomes.sort_by_key(|o| o.index);
  let report = BatchReport {
    outcomes,
    issues: batch.issues,
  };
  tracing::info!(
    %source,
    summary = %report.summary(),
    issues = report.issues.len(),
    "ingest finished"
  );
  Ok(report)
}

async fn persist<S: MineStore>(store: &S, site: Hydrated) -> RowStatus {
  let failed = |err: S::Error| RowStatus::Failed {
    reason: store_error(err).to_string(),
  };
  let skipped = |kind: SiteKind, parent: SiteId| RowStatus::Skipped {
    reason: Error::MissingParent {
      kind,
      id: parent.to_string(),
    }
    .to_string(),
  };

  match site {
    Hydrated::Mine(mine) => {
      let id = mine.site_id;
      match store.insert_mine(mine).await {
        Ok(()) => RowStatus::Inserted { id },
        Err(err) => failed(err),
      }
    }
    Hydrated::Facility { parent, facility } => {
      let mines: Vec<SiteId> = std::iter::once(parent)
        .chain(facility.associated_mines.iter().copied())
        .collect();
      for &mine in &mines {
        match store.get_mine(mine).await {
          Ok(Some(_)) => {}
          Ok(None) => return skipped(SiteKind::Tsf, mine),
          Err(err) => return failed(err),
        }
      }

      let recorded = match facility.site_id {
        Some(id) => match store.find_facility(id).await {
          Ok(found) => found
            .filter(|f| f.designation == Designation::Named)
            .map(|f| (id, f)),
          Err(err) => return failed(err),
        },
        None => None,
      };
      match recorded {
        Some((id, recorded)) => associate(store, id, &recorded, &mines).await,
        None => {
          let name = facility.name.clone();
          match store.attach_facility(parent, facility).await {
            Ok(()) => RowStatus::Attached { parent, name },
            Err(err) => failed(err),
          }
        }
      }
    }
    Hydrated::Impoundment {
      parent,
      impoundment,
    } => match store.find_facility(parent).await {
      Ok(Some(facility)) => {
        let name = impoundment.name.clone();
        match store
          .attach_impoundment(facility.facility_id, impoundment)
          .await
        {
          Ok(()) => RowStatus::Attached { parent, name },
          Err(err) => failed(err),
        }
      }
      Ok(None) => skipped(SiteKind::Impoundment, parent),
      Err(err) => failed(err),
    },
  }
}

/// Link the stored facility `id` to every mine in `mines` it does not serve
/// yet. A row that adds no link fails.
async fn associate<S: MineStore>(
  store: &S,
  id: SiteId,
  recorded: &FacilityRef,
  mines: &[SiteId],
) -> RowStatus {
  let fresh: Vec<SiteId> = mines
    .iter()
    .copied()
    .filter(|&mine| !recorded.serves(mine))
    .collect();
  if fresh.is_empty() {
    return RowStatus::Failed {
      reason: Error::AlreadyRecorded(id).to_string(),
    };
  }
  for &mine in &fresh {
    if let Err(err) = store.associate_facility(mine, recorded.facility_id).await {
      return RowStatus::Failed {
        reason: store_error(err).to_string(),
      };
    }
    tracing::debug!(facility = %id, %mine, "associated facility with mine");
  }
  RowStatus::Associated { id, mines: fresh }
}

/// Flatten every stored mine, ordered by identifier.
pub async fn export<S: MineStore>(store: &S, options: &HydrateOptions) -> Result<Vec<Row>> {
  let mines = store.list_mines().await.map_err(store_error)?;
  let rows: Vec<Row> = mines
    .iter()
    .flat_map(|mine| dehydrate_with(mine, options.commodity_slots, options.source_slots))
    .collect();
  tracing::info!(mines = mines.len(), rows = rows.len(), "export finished");
  Ok(rows)
}

/// What an export does to rows already at its destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportMode {
  Append,
  #[default]
  Overwrite,
}

/// Combine freshly exported rows with the rows already at the destination.
///
/// Appending skips every exported mine whose identifier is already present,
/// along with the facility and impoundment rows that follow it.
pub fn apply_export(existing: Vec<Row>, exported: Vec<Row>, mode: ExportMode) -> Vec<Row> {
  match mode {
    ExportMode::Overwrite => exported,
    ExportMode::Append => {
      let present: HashSet<String> =
        existing.iter().filter_map(|row| row.text(CMTI_ID)).collect();
      let mut keep = true;
      let fresh: Vec<Row> = exported
        .into_iter()
        .filter(|row| {
          if is_mine_row(row) {
            keep = row.text(CMTI_ID).is_none_or(|id| !present.contains(&id));
          }
          keep
        })
        .collect();

      let mut rows = existing;
      rows.extend(fresh);
      rows
    }
  }
}

fn is_mine_row(row: &Row) -> bool {
  row
    .text(SITE_TYPE)
    .is_none_or(|label| matches!(label.parse(), Ok(SiteKind::Mine)))
}

#[cfg(test)]
mod tests {
  use cmti_core::jurisdiction::Jurisdiction;
  use cmti_store_sqlite::SqliteStore;

  use super::*;
  use crate::{columns::*, row::Cell};

  async fn store() -> SqliteStore {
    SqliteStore::open_in_memory().await.expect("in-memory store")
  }

  fn as_of() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 6, 1).unwrap() }

  fn site(name: &str, kind: &str, extra: &[(&str, Cell)]) -> Row {
    let mut row: Row = [
      (SITE_NAME, Cell::from(name)),
      (SITE_TYPE, Cell::from(kind)),
      (LATITUDE, Cell::Float(48.0)),
      (LONGITUDE, Cell::Float(-81.0)),
      (PROVINCE_TERRITORY, Cell::from("ON")),
    ]
    .into_iter()
    .collect();
    for (column, value) in extra {
      row.set(*column, value.clone());
    }
    row
  }

  fn status(report: &BatchReport, index: usize) -> &RowStatus {
    &report.outcomes[index].status
  }

  fn id(text: &str) -> SiteId { text.parse().unwrap() }

  #[tokio::test]
  async fn ingest_reports_every_row_and_exports_the_graph() {
    let store = store().await;
    let tables = CommodityTables::default();
    let ctx = IngestContext {
      tables:  &tables,
      options: HydrateOptions::default(),
      as_of:   as_of(),
    };
    let mut missing_coords = site("No Coordinates", "Mine", &[]);
    missing_coords.remove(LATITUDE);

    let rows = vec![
      site("Big Mine", "Mine", &[(CMTI_ID, "ON000010".into())]),
      site("Small Mine", "Mine", &[]),
      site("East Pond", "TSF", &[
        (CMTI_ID, "ON000020".into()),
        (PARENT_ID, "ON000010".into()),
        (HAZARD_CLASS, "High".into()),
      ]),
      site("Cell 1", "Impoundment", &[(PARENT_ID, "ON000020".into())]),
      missing_coords,
      site("Orphan Pond", "TSF", &[(PARENT_ID, "ON000999".into())]),
      site("Big Mine Again", "Mine", &[(CMTI_ID, "ON000010".into())]),
    ];

    let mut issuer = IdIssuer::canadian();
    let report = ingest(&store, &mut issuer, SourceKind::Worksheet, rows, &ctx)
      .await
      .unwrap();

    assert_eq!(report.outcomes.len(), 7);
    assert!(report.outcomes.iter().enumerate().all(|(i, o)| o.index == i));
    assert!(matches!(status(&report, 0), RowStatus::Inserted { id } if id.to_string() == "ON000010"));
    assert!(matches!(status(&report, 1), RowStatus::Inserted { id } if id.to_string() == "ON000011"));
    assert!(matches!(status(&report, 2), RowStatus::Attached { name, .. } if name == "East Pond"));
    assert!(matches!(status(&report, 3), RowStatus::Attached { name, .. } if name == "Cell 1"));
    assert!(matches!(status(&report, 4), RowStatus::Rejected { .. }));
    assert!(matches!(status(&report, 5), RowStatus::Skipped { .. }));
    assert!(matches!(status(&report, 6), RowStatus::Failed { .. }));

    let summary = report.summary();
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.attached, 2);
    assert_eq!(summary.failed, 1);

    let exported = export(&store, &ctx.options).await.unwrap();
    let names: Vec<_> = exported.iter().filter_map(|r| r.text(SITE_NAME)).collect();
    assert_eq!(names, ["Big Mine", "East Pond", "Cell 1", "Small Mine"]);
    assert_eq!(exported[2].text(HAZARD_CLASS).as_deref(), Some("High"));
    assert_eq!(exported[2].text(PARENT).as_deref(), Some("East Pond"));
  }

  #[tokio::test]
  async fn unknown_jurisdiction_aborts_the_batch() {
    let store = store().await;
    let tables = CommodityTables::default();
    let ctx = IngestContext {
      tables:  &tables,
      options: HydrateOptions::default(),
      as_of:   as_of(),
    };
    let rows = vec![
      site("Fine", "Mine", &[]),
      site("Elsewhere", "Mine", &[(PROVINCE_TERRITORY, "BC".into())]),
    ];

    let mut issuer = IdIssuer::new([Jurisdiction::Ontario]);
    let err = ingest(&store, &mut issuer, SourceKind::Worksheet, rows, &ctx)
      .await
      .unwrap_err();
    assert!(err.is_fatal());
  }

  #[tokio::test]
  async fn dirty_jurisdiction_fails_only_its_row() {
    let store = store().await;
    let tables = CommodityTables::default();
    let ctx = IngestContext {
      tables:  &tables,
      options: HydrateOptions::default(),
      as_of:   as_of(),
    };
    let rows = vec![
      site("Nowhere", "Mine", &[(PROVINCE_TERRITORY, "Atlantis".into())]),
      site("Somewhere", "Mine", &[]),
    ];

    let mut issuer = IdIssuer::canadian();
    let report = ingest(&store, &mut issuer, SourceKind::Worksheet, rows, &ctx)
      .await
      .unwrap();
    assert!(matches!(status(&report, 0), RowStatus::Failed { .. }));
    assert!(matches!(status(&report, 1), RowStatus::Inserted { .. }));
  }

  #[tokio::test]
  async fn a_fresh_issuer_is_seeded_from_the_store() {
    let store = store().await;
    let tables = CommodityTables::default();
    let ctx = IngestContext {
      tables:  &tables,
      options: HydrateOptions::default(),
      as_of:   as_of(),
    };
    let rows = vec![site("Big Mine", "Mine", &[(CMTI_ID, "ON000042".into())])];
    ingest(&store, &mut IdIssuer::canadian(), SourceKind::Worksheet, rows, &ctx)
      .await
      .unwrap();

    let mut issuer = IdIssuer::canadian();
    seed_issuer(&store, &mut issuer).await.unwrap();
    assert_eq!(issuer.next(Jurisdiction::Ontario).unwrap().to_string(), "ON000043");
  }

  #[tokio::test]
  async fn source_rows_are_adapted_before_hydration() {
    let store = store().await;
    let tables = CommodityTables::default();
    let ctx = IngestContext {
      tables:  &tables,
      options: HydrateOptions::default(),
      as_of:   as_of(),
    };
    let raw: Row = [
      ("NAME1", Cell::from("Britannia")),
      ("LATITUDE", Cell::Float(49.6)),
      ("LONGITUDE", Cell::Float(-123.2)),
      ("OBJECTID", Cell::Int(5)),
    ]
    .into_iter()
    .collect();

    let mut issuer = IdIssuer::canadian();
    let report = ingest(&store, &mut issuer, SourceKind::Bcahm, vec![raw], &ctx)
      .await
      .unwrap();
    assert!(matches!(status(&report, 0), RowStatus::Inserted { id } if id.to_string() == "BC000001"));

    let mine = store
      .get_mine("BC000001".parse().unwrap())
      .await
      .unwrap()
      .unwrap();
    assert_eq!(mine.details.mine_status.as_deref(), Some("Inactive"));
    assert_eq!(mine.references[0].source, "BCAHM");
  }

  #[tokio::test]
  async fn reimporting_a_batch_adds_nothing() {
    let store = store().await;
    let tables = CommodityTables::default();
    let ctx = IngestContext {
      tables:  &tables,
      options: HydrateOptions::default(),
      as_of:   as_of(),
    };
    let rows = || {
      vec![
        site("Big Mine", "Mine", &[(CMTI_ID, "ON000010".into())]),
        site("East Pond", "TSF", &[
          (CMTI_ID, "ON000020".into()),
          (PARENT_ID, "ON000010".into()),
        ]),
        site("Cell 1", "Impoundment", &[
          (CMTI_ID, "ON000030".into()),
          (PARENT_ID, "ON000020".into()),
        ]),
      ]
    };

    let mut issuer = IdIssuer::canadian();
    let first = ingest(&store, &mut issuer, SourceKind::Worksheet, rows(), &ctx)
      .await
      .unwrap();
    assert_eq!(first.summary().inserted, 1);
    assert_eq!(first.summary().attached, 2);

    let second = ingest(&store, &mut issuer, SourceKind::Worksheet, rows(), &ctx)
      .await
      .unwrap();
    let summary = second.summary();
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.attached, 0);
    assert_eq!(summary.failed, 3);
    assert!(matches!(
      status(&second, 1),
      RowStatus::Failed { reason } if reason.contains("already recorded")
    ));

    let mine = store.get_mine(id("ON000010")).await.unwrap().unwrap();
    assert_eq!(mine.facilities.len(), 2);

    let exported = export(&store, &ctx.options).await.unwrap();
    let names: Vec<_> = exported.iter().filter_map(|r| r.text(SITE_NAME)).collect();
    assert_eq!(names, ["Big Mine", "East Pond", "Cell 1"]);
  }

  #[tokio::test]
  async fn skipped_rows_do_not_use_up_identifiers() {
    let store = store().await;
    let tables = CommodityTables::default();
    let ctx = IngestContext {
      tables:  &tables,
      options: HydrateOptions::default(),
      as_of:   as_of(),
    };
    let rows = vec![
      site("Orphan Pond", "TSF", &[(PARENT_ID, "ON000999".into())]),
      site("New Mine", "Mine", &[]),
    ];

    let mut issuer = IdIssuer::canadian();
    let report = ingest(&store, &mut issuer, SourceKind::Worksheet, rows, &ctx)
      .await
      .unwrap();
    assert!(matches!(status(&report, 0), RowStatus::Skipped { .. }));
    assert!(matches!(status(&report, 1), RowStatus::Inserted { id } if id.to_string() == "ON000001"));
    assert_eq!(issuer.current(Jurisdiction::Ontario).unwrap(), 1);
  }

  #[tokio::test]
  async fn shared_facility_is_linked_to_every_parent() {
    let store = store().await;
    let tables = CommodityTables::default();
    let ctx = IngestContext {
      tables:  &tables,
      options: HydrateOptions::default(),
      as_of:   as_of(),
    };
    let shared = |parents: &str| {
      site("Shared Pond", "TSF", &[
        (CMTI_ID, "ON000010".into()),
        (PARENT_ID, parents.into()),
      ])
    };
    let rows = vec![
      site("Mine A", "Mine", &[(CMTI_ID, "ON000001".into())]),
      site("Mine B", "Mine", &[(CMTI_ID, "ON000002".into())]),
      site("Mine C", "Mine", &[(CMTI_ID, "ON000003".into())]),
      shared("ON000001; ON000002"),
    ];

    let mut issuer = IdIssuer::canadian();
    let report = ingest(&store, &mut issuer, SourceKind::Worksheet, rows, &ctx)
      .await
      .unwrap();
    assert!(matches!(status(&report, 3), RowStatus::Attached { parent, .. } if *parent == id("ON000001")));

    let rows = vec![shared("ON000003, ON000001"), shared("ON000001; ON000404")];
    let report = ingest(&store, &mut issuer, SourceKind::Worksheet, rows, &ctx)
      .await
      .unwrap();
    assert_eq!(
      status(&report, 0),
      &RowStatus::Associated {
        id:    id("ON000010"),
        mines: vec![id("ON000003")],
      }
    );
    assert!(matches!(status(&report, 1), RowStatus::Skipped { reason } if reason.contains("ON000404")));
    assert_eq!(report.summary().associated, 1);

    let found = store.find_facility(id("ON000010")).await.unwrap().unwrap();
    assert_eq!(found.mine_id, id("ON000001"));
    assert_eq!(found.associated_mines, [id("ON000002"), id("ON000003")]);

    let exported = export(&store, &ctx.options).await.unwrap();
    let pond = exported
      .iter()
      .find(|r| r.text(SITE_NAME).as_deref() == Some("Shared Pond"))
      .unwrap();
    assert_eq!(
      pond.text(PARENT_ID).as_deref(),
      Some("ON000001; ON000002; ON000003")
    );
  }

  #[test]
  fn export_modes() {
    let row = |name: &str, kind: &str, cmti_id: &str| -> Row {
      [(SITE_NAME, name), (SITE_TYPE, kind), (CMTI_ID, cmti_id)]
        .into_iter()
        .collect()
    };
    let old = vec![row("Old", "Mine", "ON000001")];
    let new = vec![
      row("Old Again", "Mine", "ON000001"),
      row("Old Pond", "TSF", "ON000005"),
      row("New", "Mine", "ON000002"),
      row("New Cell", "Impoundment", "ON000006"),
    ];
    assert_eq!(apply_export(old.clone(), new.clone(), ExportMode::Overwrite), new);

    let appended = apply_export(old, new, ExportMode::Append);
    let names: Vec<_> = appended.iter().filter_map(|r| r.text(SITE_NAME)).collect();
    assert_eq!(names, ["Old", "New", "New Cell"]);
  }
}
