//! Tabular side of the mine inventory.
//!
//! Converts between wide worksheet rows and [`cmti_core`] entity graphs:
//! source rows are adapted to the worksheet layout, normalised column by
//! column, hydrated into mines, facilities and impoundments, and persisted
//! through any [`cmti_core::store::MineStore`]. Stored mines flatten back
//! into rows for export.
//!
//! Everything except [`batch`] is synchronous and free of I/O.
//!
//! # Quick start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use cmti_core::{commodity::CommodityTables, identifier::IdIssuer};
//! use cmti_tabular::{Hydrated, Hydrator, Normalizer, Row, Schema, dehydrate};
//!
//! let raw: Row = serde_json::from_str(
//!   r#"{"Site_Name": "Big Mine", "Site_Type": "Mine", "Province_Territory": "ON",
//!       "Latitude": 48.5, "Longitude": -81.3, "Tailings_Area": "50 ha"}"#,
//! )
//! .unwrap();
//!
//! let as_of = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let (row, _issues) = Normalizer::new(Schema::worksheet(), as_of).normalize_row(0, raw);
//!
//! let tables = CommodityTables::default();
//! let mut issuer = IdIssuer::canadian();
//! let hydration = Hydrator::new(&mut issuer, &tables).hydrate_row(&row).unwrap();
//! if let Hydrated::Mine(mine) = hydration.site {
//!   assert_eq!(dehydrate(&mine).len(), 1);
//! }
//! ```

pub mod batch;
pub mod columns;
pub mod dehydrate;
pub mod error;
pub mod hydrate;
pub mod normalize;
pub mod row;
pub mod schema;
pub mod slots;
pub mod source;
pub mod units;

pub use batch::{
  BatchReport, BatchSummary, ExportMode, IngestContext, RowOutcome, RowStatus,
  apply_export, export, ingest, seed_issuer,
};
pub use dehydrate::{dehydrate, dehydrate_with};
pub use error::{Error, Result};
pub use hydrate::{HydrateOptions, Hydrated, Hydration, Hydrator, OwnerPolicy};
pub use normalize::{CellIssue, Normalizer};
pub use row::{Cell, Row};
pub use schema::{ColumnSpec, ColumnType, Schema};
pub use source::SourceKind;
